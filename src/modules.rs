//! Importable modules: `sys` and `math`.
use crate::builtins::{check_args, no_kwargs};
use crate::exception::{Exception, ExceptionKind};
use crate::interpreter::Interpreter;
use crate::value::{Builtin, Module, Value};
use phf::phf_map;
use std::collections::BTreeMap;
use std::f64::consts;

type Result<I> = std::result::Result<I, Exception>;

static MATH_CONSTANTS: phf::Map<&'static str, f64> = phf_map! {
    "pi" => consts::PI,
    "e" => consts::E,
    "tau" => 2.0 * consts::PI,
    "inf" => std::f64::INFINITY,
    "nan" => std::f64::NAN,
};

static MATH_FUNCTIONS: phf::Map<&'static str, Builtin> = phf_map! {
    "sqrt" => Builtin { name: "sqrt", func: sqrt, class: false },
    "floor" => Builtin { name: "floor", func: floor, class: false },
    "ceil" => Builtin { name: "ceil", func: ceil, class: false },
    "trunc" => Builtin { name: "trunc", func: trunc, class: false },
    "fabs" => Builtin { name: "fabs", func: fabs, class: false },
    "exp" => Builtin { name: "exp", func: exp, class: false },
    "log" => Builtin { name: "log", func: log, class: false },
    "sin" => Builtin { name: "sin", func: sin, class: false },
    "cos" => Builtin { name: "cos", func: cos, class: false },
    "tan" => Builtin { name: "tan", func: tan, class: false },
    "gcd" => Builtin { name: "gcd", func: gcd, class: false },
    "isnan" => Builtin { name: "isnan", func: isnan, class: false },
    "isinf" => Builtin { name: "isinf", func: isinf, class: false },
};

/// Builds a fresh module, or `None` if there is no such module.
pub fn load(name: &str, argv: &Value) -> Option<Module> {
    match name {
        "sys" => {
            let mut attrs = BTreeMap::new();
            attrs.insert("argv", argv.clone());
            Some(Module { name: "sys", attrs })
        }
        "math" => {
            let mut attrs = BTreeMap::new();
            for (name, value) in MATH_CONSTANTS.entries() {
                attrs.insert(*name, Value::Float(*value));
            }
            for (name, builtin) in MATH_FUNCTIONS.entries() {
                attrs.insert(*name, Value::Builtin(builtin));
            }
            Some(Module { name: "math", attrs })
        }
        _ => None,
    }
}

fn domain_error() -> Exception {
    Exception::value_error("math domain error")
}

/// The single float argument of a math function.
fn real(name: &str, args: &[Value], kwargs: &[(String, Value)]) -> Result<f64> {
    no_kwargs(name, kwargs)?;
    check_args(name, args, 1, 1)?;
    args[0].as_float().ok_or_else(|| {
        Exception::type_error(format!(
            "must be real number, not {}",
            args[0].type_name()
        ))
    })
}

/// Float result to int, for `floor()` and friends.
fn integral(value: &Value, rounded: f64) -> Result<Value> {
    if let Some(n) = value.as_int() {
        return Ok(Value::Int(n));
    }
    if rounded.is_nan() {
        return Err(Exception::value_error("cannot convert float NaN to integer"));
    }
    if rounded.is_infinite() {
        return Err(Exception::new(
            ExceptionKind::OverflowError,
            "cannot convert float infinity to integer",
        ));
    }
    if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return Err(Exception::overflow());
    }
    Ok(Value::Int(rounded as i64))
}

fn sqrt(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value> {
    let x = real("sqrt", &args, &kwargs)?;
    if x < 0.0 {
        return Err(domain_error());
    }
    Ok(Value::Float(x.sqrt()))
}

fn floor(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value> {
    let x = real("floor", &args, &kwargs)?;
    integral(&args[0], x.floor())
}

fn ceil(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value> {
    let x = real("ceil", &args, &kwargs)?;
    integral(&args[0], x.ceil())
}

fn trunc(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value> {
    let x = real("trunc", &args, &kwargs)?;
    integral(&args[0], x.trunc())
}

fn fabs(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value> {
    Ok(Value::Float(real("fabs", &args, &kwargs)?.abs()))
}

fn exp(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value> {
    let x = real("exp", &args, &kwargs)?;
    let y = x.exp();
    if y.is_infinite() && x.is_finite() {
        return Err(Exception::new(ExceptionKind::OverflowError, "math range error"));
    }
    Ok(Value::Float(y))
}

/// `log(x[, base])`
fn log(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value> {
    no_kwargs("log", &kwargs)?;
    check_args("log", &args, 1, 2)?;
    let x = real("log", &args[..1], &[])?;
    if x <= 0.0 {
        return Err(domain_error());
    }

    match args.get(1) {
        None => Ok(Value::Float(x.ln())),
        Some(_) => {
            let base = real("log", &args[1..], &[])?;
            if base <= 0.0 {
                return Err(domain_error());
            }
            if base == 1.0 {
                return Err(Exception::zero_division("float division by zero"));
            }
            Ok(Value::Float(x.ln() / base.ln()))
        }
    }
}

fn trig(name: &str, args: &[Value], kwargs: &[(String, Value)], f: fn(f64) -> f64) -> Result<Value> {
    let x = real(name, args, kwargs)?;
    if x.is_infinite() {
        return Err(domain_error());
    }
    Ok(Value::Float(f(x)))
}

fn sin(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value> {
    trig("sin", &args, &kwargs, f64::sin)
}

fn cos(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value> {
    trig("cos", &args, &kwargs, f64::cos)
}

fn tan(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value> {
    trig("tan", &args, &kwargs, f64::tan)
}

/// `gcd(*integers)`
fn gcd(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value> {
    no_kwargs("gcd", &kwargs)?;
    let mut result: u64 = 0;
    for arg in &args {
        let n = arg.as_int().ok_or_else(|| {
            Exception::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                arg.type_name()
            ))
        })?;
        let (mut a, mut b) = (result, n.unsigned_abs());
        while b != 0 {
            let rem = a % b;
            a = b;
            b = rem;
        }
        result = a;
    }

    if result > i64::MAX as u64 {
        return Err(Exception::overflow());
    }
    Ok(Value::Int(result as i64))
}

fn isnan(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value> {
    Ok(Value::Bool(real("isnan", &args, &kwargs)?.is_nan()))
}

fn isinf(_interp: &mut Interpreter, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value> {
    Ok(Value::Bool(real("isinf", &args, &kwargs)?.is_infinite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sys_argv() {
        let argv = Value::list(vec![Value::from("snek"), Value::from("print(1)")]);
        let sys = load("sys", &argv).unwrap();
        assert_eq!(sys.attrs["argv"].repr(), "['snek', 'print(1)']");
        assert!(sys.attrs["argv"].is(&argv));
    }

    #[test]
    fn math_contents() {
        let math = load("math", &Value::None).unwrap();
        assert_eq!(math.attrs["pi"].repr(), "3.141592653589793");
        assert_eq!(math.attrs["inf"].repr(), "inf");
        assert!(matches!(math.attrs["sqrt"], Value::Builtin(b) if b.name == "sqrt"));
        assert!(load("os", &Value::None).is_none());
    }

    #[test]
    fn integral_results() {
        assert_eq!(integral(&Value::Float(2.5), 2.0).unwrap().repr(), "2");
        assert_eq!(integral(&Value::Int(7), 7.0).unwrap().repr(), "7");
        assert_eq!(
            integral(&Value::Float(std::f64::INFINITY), std::f64::INFINITY)
                .unwrap_err()
                .message,
            "cannot convert float infinity to integer"
        );
    }
}
