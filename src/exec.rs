use crate::exception::Exception;
use crate::interpreter::Interpreter;
use crate::parser::parse;
use failure::Error;
use std::any::Any;
use std::io::Write;
use std::thread;

/// Large enough that `RecursionError` fires long before the native stack
/// runs out, even in debug builds.
const STACK_SIZE: usize = 256 * 1024 * 1024;

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return (*message).to_owned();
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_owned()
}

/// Runs `f` on the interpreter thread and waits for it. A panic on that
/// thread comes back as an error.
pub fn spawn<F, T>(f: F) -> Result<T, Error>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let handle = thread::Builder::new()
        .name("snek".to_owned())
        .stack_size(STACK_SIZE)
        .spawn(f)?;

    handle
        .join()
        .map_err(|panic| format_err!("internal error: {}", panic_message(&*panic)))
}

/// An exception nobody caught, on its way out to the CLI.
#[derive(Debug, Fail)]
#[fail(display = "{}", _0)]
struct Uncaught(String);

impl From<Exception> for Uncaught {
    fn from(exc: Exception) -> Uncaught {
        Uncaught(exc.message)
    }
}

/// Parses and runs `code` with `sys.argv` bound to `argv`. Program output
/// goes to `out`; an uncaught exception comes back as the error.
pub fn exec(code: &str, argv: &[String], out: &mut dyn Write) -> Result<(), Error> {
    let program = parse(code).map_err(Uncaught::from)?;
    debug!("parsed {} statement(s)", program.body.len());

    let mut interp = Interpreter::new(argv, out);
    let result = interp.run(&program);
    interp.flush();

    if let Err(exc) = &result {
        debug!("uncaught {}: {}", exc.kind.name(), exc.message);
    }
    result.map_err(Uncaught::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Output of `code`, with an uncaught error appended the way the CLI
    /// prints it.
    fn run(code: &str) -> String {
        let code = code.to_owned();
        spawn(move || {
            let mut out = Vec::new();
            let result = exec(&code, &["snek".to_owned(), "x".to_owned()], &mut out);
            let mut text = String::from_utf8(out).unwrap();
            if let Err(err) = result {
                text.push_str(&format!("Error: {}\n", err));
            }
            text
        })
        .unwrap()
    }

    #[test]
    fn printing() {
        assert_eq!(run("print(1+1)"), "2\n");
        assert_eq!(run("print('a', 1, None, sep='-', end='!')"), "a-1-None!");
        assert_eq!(run("print()"), "\n");
        assert_eq!(run(""), "");
        assert_eq!(run("print([1, 'a', (2,), {'k': 1.5}])"), "[1, 'a', (2,), {'k': 1.5}]\n");
        assert_eq!(run("print(repr('it\\'s'))"), "\"it's\"\n");
    }

    #[test]
    fn errors_stop_execution() {
        assert_eq!(run("print(1)\n1/0\nprint(2)"), "1\nError: division by zero\n");
        assert_eq!(run("x"), "Error: name 'x' is not defined\n");
        assert_eq!(run("[][0]"), "Error: list index out of range\n");
        assert_eq!(run("{}['k']"), "Error: 'k'\n");
        assert_eq!(
            run("1 + 'a'"),
            "Error: unsupported operand type(s) for +: 'int' and 'str'\n"
        );
        assert_eq!(run("raise ValueError('bad')"), "Error: bad\n");
        assert_eq!(run("import os"), "Error: No module named 'os'\n");
        assert_eq!(run("assert 1 == 2, 'nope'"), "Error: nope\n");
    }

    #[test]
    fn syntax_errors_run_nothing() {
        assert!(run("print(1)\nprint((").starts_with("Error: invalid syntax (<string>, line "));
        assert!(run("if True:\nprint(1)").starts_with("Error: expected an indented block"));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run("print(7 // 2, -7 // 2, 7 % -3, 2 ** 10, 2 ** -1)"), "3 -4 -2 1024 0.5\n");
        assert_eq!(run("print(1 / 4, 0.1 + 0.2, 10 / 5)"), "0.25 0.30000000000000004 2.0\n");
        assert_eq!(run("print(True + True, 3 * 'ab', [0] * 3)"), "2 ababab [0, 0, 0]\n");
        assert_eq!(run("print(1 < 2 < 3, 1 < 2 > 3, 'b' in 'abc', 4 not in [1])"), "True False True True\n");
        assert_eq!(run("print(1 or 2, 0 and 1, None or 'x')"), "1 0 x\n");
        assert_eq!(run("1.0 // 0"), "Error: float floor division by zero\n");
    }

    #[test]
    fn control_flow() {
        let code = "
total = 0
for i in range(10):
    if i % 2:
        continue
    if i > 6:
        break
    total += i
else:
    total = -1
print(total)
n = 3
while n:
    n -= 1
else:
    print('done', n)
";
        assert_eq!(run(code), "12\ndone 0\n");
    }

    #[test]
    fn functions() {
        let code = "
def greet(name, greeting='Hello'):
    return f'{greeting}, {name}!'

print(greet('snek'))
print(greet(greeting='Hi', name='you'))
square = lambda x: x * x
print(list(map(square, [1, 2, 3])))

def fact(n):
    return 1 if n <= 1 else n * fact(n - 1)

print(fact(20))
";
        assert_eq!(run(code), "Hello, snek!\nHi, you!\n[1, 4, 9]\n2432902008176640000\n");
        assert_eq!(
            run("def f(a, b):\n    pass\nf(1)"),
            "Error: f() missing 1 required positional argument: 'b'\n"
        );
        assert_eq!(
            run("def f():\n    pass\nf(1)"),
            "Error: f() takes 0 positional arguments but 1 was given\n"
        );
    }

    #[test]
    fn scoping() {
        let code = "
x = 1
def read():
    return x
def shadow():
    x = 2
    return x
def bump():
    global x
    x += 10
print(read(), shadow(), x)
bump()
print(x)
";
        assert_eq!(run(code), "1 2 1\n11\n");
        assert_eq!(
            run("x = 1\ndef f():\n    print(x)\n    x = 2\nf()"),
            "Error: cannot access local variable 'x' where it is not associated with a value\n"
        );
        assert_eq!(run("y = [i * 2 for i in range(3)]\nprint(y)\ni"), "[0, 2, 4]\nError: name 'i' is not defined\n");
    }

    #[test]
    fn recursion_limit() {
        assert_eq!(
            run("def f(n):\n    return f(n + 1)\nf(0)"),
            "Error: maximum recursion depth exceeded\n"
        );
        let code = "
def depth(n):
    return 0 if n == 0 else 1 + depth(n - 1)
print(depth(900))
";
        assert_eq!(run(code), "900\n");
    }

    #[test]
    fn exceptions() {
        let code = "
def check(x):
    try:
        return 10 / x
    except ZeroDivisionError as e:
        print('caught', e)
        return None
    finally:
        print('finally')

print(check(2))
print(check(0))
try:
    {}['missing']
except LookupError as e:
    print(type(e).__name__, e)
try:
    try:
        raise ValueError('inner')
    except ValueError:
        raise
except Exception as e:
    print('reraised', e)
try:
    pass
except Exception:
    print('unreachable')
else:
    print('else')
";
        assert_eq!(
            run(code),
            "finally\n5.0\ncaught division by zero\nfinally\nNone\nKeyError 'missing'\nreraised inner\nelse\n"
        );
    }

    #[test]
    fn builtins_and_methods() {
        let code = "
words = 'the quick brown fox'.split()
print(len(words), sorted(words, key=len, reverse=True)[0])
print(', '.join(w.upper() for w in words))
d = {'a': 1}
d['b'] = 2
d.update(c=3)
print(d, d.get('z', 0), list(d.keys()))
nums = [3, 1, 2]
nums.sort()
nums.append(4)
print(nums, nums.pop(), sum(nums), max(nums), min(nums, default=0))
print(list(enumerate('ab')), list(zip([1, 2], 'xy')))
print(int('42') + 1, float('1.5'), str(3), bool([]), abs(-3), round(2.5), divmod(7, 2))
print(isinstance(True, int), type(1.0), hex(255), chr(65), ord('a'))
";
        assert_eq!(
            run(code),
            "4 quick\n\
             THE, QUICK, BROWN, FOX\n\
             {'a': 1, 'b': 2, 'c': 3} 0 ['a', 'b', 'c']\n\
             [1, 2, 3] 4 6 3 1\n\
             [(0, 'a'), (1, 'b')] [(1, 'x'), (2, 'y')]\n\
             43 1.5 3 False 3 2 (3, 1)\n\
             True <class 'float'> 0xff A 97\n"
        );
    }

    #[test]
    fn formatting() {
        assert_eq!(run("x = 3.14159\nprint(f'{x:.2f}|{x!r}|{42:>5}|{1234567:,}')"), "3.14|3.14159|   42|1,234,567\n");
        assert_eq!(run("print('%s=%d' % ('n', 5), '{} {}'.format(1, 'a'))"), "n=5 1 a\n");
        assert_eq!(run("print(format(0.5, '%'), format(255, 'x'))"), "50.000000% ff\n");
    }

    #[test]
    fn modules() {
        assert_eq!(run("import sys\nprint(sys.argv)"), "['snek', 'x']\n");
        assert_eq!(
            run("import math as m\nprint(m.sqrt(16), m.floor(-1.5), m.ceil(1.2), m.pi)"),
            "4.0 -2 2 3.141592653589793\n"
        );
        assert_eq!(run("import math\nmath.sqrt(-1)"), "Error: math domain error\n");
    }

    #[test]
    fn exception_arguments() {
        let code = "
print(ValueError(1, 2).args, ValueError(1).args[0] + 1, repr(KeyError('k')))
try:
    {}['a']
except KeyError as e:
    print(e.args, repr(e))
try:
    assert 1 > 2, [3]
except AssertionError as e:
    print(e.args[0][0])
print(repr(ValueError()), str(ValueError('x', 2)))
";
        assert_eq!(
            run(code),
            "(1, 2) 2 KeyError('k')\n('a',) KeyError('a')\n3\nValueError() ('x', 2)\n"
        );
    }

    #[test]
    fn augmented_assignment_mutates_lists() {
        assert_eq!(run("x = [1]\ny = x\nx *= 2\nprint(y, x)"), "[1, 1] [1, 1]\n");
        assert_eq!(run("x = [1, 2]\ny = x\nx *= 0\nprint(y)"), "[]\n");
        assert_eq!(run("t = (1,)\nu = t\nt *= 2\nprint(u, t)"), "(1,) (1, 1)\n");
        assert_eq!(
            run("x = [1]\nx *= 'a'"),
            "Error: can't multiply sequence by non-int of type 'str'\n"
        );
    }

    #[test]
    fn methods_of_classes() {
        assert_eq!(
            run("print(sorted(['b', 'A', 'c'], key=str.lower), str.upper('x'))"),
            "['A', 'b', 'c'] X\n"
        );
        assert_eq!(run("l = []\nlist.append(l, 3)\nprint(l, dict.get({}, 1, 2))"), "[3] 2\n");
        assert_eq!(
            run("str.lower(1)"),
            "Error: descriptor 'lower' for 'str' objects doesn't apply to a 'int' object\n"
        );
        assert_eq!(run("str.lower()"), "Error: unbound method str.lower() needs an argument\n");
        assert_eq!(run("int.lower"), "Error: type object 'int' has no attribute 'lower'\n");
    }

    #[test]
    fn pathological_input_is_reported() {
        let nested = |n: usize| format!("print({}1{})", "(".repeat(n), ")".repeat(n));
        assert_eq!(run(&nested(50)), "1\n");
        assert_eq!(
            run(&format!("x = {}1{}", "(".repeat(201), ")".repeat(201))),
            "Error: too many nested parentheses (<string>, line 1)\n"
        );
        assert_eq!(
            run(&format!("print({}1)", "-".repeat(50000))),
            "Error: maximum recursion depth exceeded during compilation\n"
        );
        assert_eq!(
            run("a = [1]\na.append(a)\nb = [1]\nb.append(b)\nprint(a == b)"),
            "Error: maximum recursion depth exceeded in comparison\n"
        );
        assert_eq!(
            run("a = []\nfor _ in range(5000):\n    a = [a]\nprint(a)"),
            "Error: maximum recursion depth exceeded while getting the repr of an object\n"
        );
        assert_eq!(run("a = [1]\na.append(a)\nprint(a)"), "[1, [...]]\n");
    }

    #[test]
    fn numeric_edges() {
        assert_eq!(run("print(1e308 * 10, 1e308 + 1e308, -1e308 * 10)"), "inf inf -inf\n");
        assert_eq!(run("2.0 ** 10000"), "Error: (34, 'Numerical result out of range')\n");
        assert_eq!(
            run("print(len(range(-9223372036854775807, 9223372036854775807)))"),
            "Error: Python int too large to convert to C ssize_t\n"
        );
        assert_eq!(
            run("r = range(-9223372036854775807, 9223372036854775807)\nprint(r[-1], r[0])"),
            "9223372036854775806 -9223372036854775807\n"
        );
        assert_eq!(run("print(1e15 + 0.3)"), "1000000000000000.2\n");
        assert_eq!(run("print('%c' % (2 ** 32 + 65))"), "Error: %c arg not in range(0x110000)\n");
        assert_eq!(run("min([])"), "Error: min() arg is an empty sequence\n");
        assert_eq!(
            run("x = 01"),
            "Error: leading zeros in decimal integer literals are not permitted; \
             use an 0o prefix for octal integers (<string>, line 1)\n"
        );
    }

    #[test]
    fn panics_become_errors() {
        let result = spawn(|| -> u32 { panic!("boom") });
        assert_eq!(result.unwrap_err().to_string(), "internal error: boom");
    }
}
