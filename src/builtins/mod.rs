use crate::exception::{Exception, ExceptionKind};
use crate::interpreter::Interpreter;
use crate::value::{Builtin, BuiltinFn, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

mod convert;
mod io;
mod numeric;
mod seq;

pub type Result<I> = std::result::Result<I, Exception>;

const FUNCTIONS: &[(&str, BuiltinFn)] = &[
    ("print", io::print),
    ("repr", io::repr),
    ("format", io::format),
    ("len", seq::len),
    ("sorted", seq::sorted),
    ("reversed", seq::reversed),
    ("enumerate", seq::enumerate),
    ("zip", seq::zip),
    ("map", seq::map),
    ("filter", seq::filter),
    ("min", seq::min),
    ("max", seq::max),
    ("sum", seq::sum),
    ("any", seq::any),
    ("all", seq::all),
    ("abs", numeric::abs),
    ("round", numeric::round),
    ("divmod", numeric::divmod),
    ("pow", numeric::pow),
    ("chr", convert::chr),
    ("ord", convert::ord),
    ("hex", convert::hex),
    ("oct", convert::oct),
    ("bin", convert::bin),
    ("isinstance", convert::isinstance),
    ("callable", convert::callable),
];

/// Builtins that are also classes: `type(1) is int`.
const CLASSES: &[(&str, BuiltinFn)] = &[
    ("int", convert::int),
    ("float", convert::float),
    ("str", convert::str),
    ("bool", convert::bool),
    ("list", convert::list),
    ("tuple", convert::tuple),
    ("dict", convert::dict),
    ("range", convert::range),
    ("type", convert::type_),
];

lazy_static! {
    static ref BUILTINS: BTreeMap<&'static str, Builtin> = {
        let mut builtins = BTreeMap::new();
        for &(name, func) in FUNCTIONS {
            builtins.insert(name, Builtin { name, func, class: false });
        }
        for &(name, func) in CLASSES {
            builtins.insert(name, Builtin { name, func, class: true });
        }
        builtins
    };
}

/// Resolves a name nobody has assigned to.
pub fn lookup(name: &str) -> Option<Value> {
    match BUILTINS.get(name) {
        Some(builtin) => Some(Value::Builtin(builtin)),
        None => ExceptionKind::from_name(name).map(Value::ExceptionClass),
    }
}

/// `type(value)`
pub fn class_of(value: &Value) -> Value {
    if let Value::Exception(exc) = value {
        return Value::ExceptionClass(exc.kind);
    }

    match BUILTINS.get(value.type_name()) {
        Some(builtin) if builtin.class => Value::Builtin(builtin),
        _ => Value::Type(value.type_name()),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Checks the number of positional arguments.
pub fn check_args(name: &str, args: &[Value], min: usize, max: usize) -> Result<()> {
    let given = args.len();
    if given >= min && given <= max {
        return Ok(());
    }

    let short = name.rsplit('.').next().unwrap_or(name);
    let message = match (min, max) {
        (0, 0) => format!("{}() takes no arguments ({} given)", name, given),
        (1, 1) => format!("{}() takes exactly one argument ({} given)", name, given),
        _ if min == max => format!(
            "{} expected {} argument{}, got {}",
            short,
            min,
            plural(min),
            given
        ),
        _ if given < min => format!(
            "{} expected at least {} argument{}, got {}",
            short,
            min,
            plural(min),
            given
        ),
        _ => format!(
            "{} expected at most {} argument{}, got {}",
            short,
            max,
            plural(max),
            given
        ),
    };
    Err(Exception::type_error(message))
}

pub fn no_kwargs(name: &str, kwargs: &[(String, Value)]) -> Result<()> {
    match kwargs.first() {
        None => Ok(()),
        Some((key, _)) => Err(Exception::type_error(format!(
            "{}() got an unexpected keyword argument '{}'",
            name, key
        ))),
    }
}

/// Removes `name=...` from `kwargs`.
pub fn take_kwarg(kwargs: &mut Vec<(String, Value)>, name: &str) -> Option<Value> {
    let index = kwargs.iter().position(|(key, _)| key == name)?;
    Some(kwargs.remove(index).1)
}

/// Stable sort shared by `sorted()` and `list.sort()`.
pub fn sort_values(
    interp: &mut Interpreter,
    items: Vec<Value>,
    key: Option<&Value>,
    reverse: bool,
) -> Result<Vec<Value>> {
    let keys = match key {
        Some(Value::None) | None => items.clone(),
        Some(func) => items
            .iter()
            .map(|item| interp.call(func, vec![item.clone()], vec![]))
            .collect::<Result<Vec<_>>>()?,
    };

    let mut pairs: Vec<(Value, Value)> = keys.into_iter().zip(items).collect();
    let mut error = None;
    pairs.sort_by(|(a, _), (b, _)| {
        if error.is_some() {
            return Ordering::Equal;
        }

        let ordering = match a.py_cmp(b, "<") {
            Ok(ordering) => ordering.unwrap_or(Ordering::Equal),
            Err(err) => {
                error = Some(err);
                Ordering::Equal
            }
        };

        if reverse {
            ordering.reverse()
        } else {
            ordering
        }
    });

    match error {
        Some(err) => Err(err),
        None => Ok(pairs.into_iter().map(|(_, item)| item).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn names() {
        assert!(matches!(lookup("print"), Some(Value::Builtin(b)) if !b.class));
        assert!(matches!(lookup("int"), Some(Value::Builtin(b)) if b.class));
        assert!(matches!(
            lookup("ValueError"),
            Some(Value::ExceptionClass(ExceptionKind::ValueError))
        ));
        assert!(lookup("undefined_thing").is_none());
    }

    #[test]
    fn classes() {
        assert_eq!(class_of(&Value::Int(1)).repr(), "<class 'int'>");
        assert_eq!(class_of(&Value::None).repr(), "<class 'NoneType'>");
        assert_eq!(
            class_of(&class_of(&Value::from("x"))).repr(),
            "<class 'type'>"
        );
        assert!(class_of(&Value::Int(1)).is(&lookup("int").unwrap()));
    }

    #[test]
    fn arity_messages() {
        let two = [Value::Int(1), Value::Int(2)];
        assert_eq!(
            check_args("len", &two, 1, 1).unwrap_err().message,
            "len() takes exactly one argument (2 given)"
        );
        assert_eq!(
            check_args("range", &[], 1, 3).unwrap_err().message,
            "range expected at least 1 argument, got 0"
        );
        assert_eq!(
            check_args("list.pop", &two, 0, 1).unwrap_err().message,
            "pop expected at most 1 argument, got 2"
        );
        assert!(check_args("divmod", &two, 2, 2).is_ok());
    }
}
