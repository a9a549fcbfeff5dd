//! Type conversions and introspection.
use super::{check_args, class_of, no_kwargs, take_kwarg, Result};
use crate::exception::{Exception, ExceptionKind};
use crate::interpreter::Interpreter;
use crate::methods;
use crate::value::{str_repr, Dict, Value};
use std::convert::TryFrom;

fn integer(value: &Value) -> Result<i64> {
    value.as_int().ok_or_else(|| {
        Exception::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

/// Float to int, truncating toward zero.
pub fn truncate(n: f64) -> Result<i64> {
    if n.is_nan() {
        return Err(Exception::value_error("cannot convert float NaN to integer"));
    }
    if n.is_infinite() {
        return Err(Exception::new(
            ExceptionKind::OverflowError,
            "cannot convert float infinity to integer",
        ));
    }

    let n = n.trunc();
    if n < i64::MIN as f64 || n >= i64::MAX as f64 {
        return Err(Exception::overflow());
    }
    Ok(n as i64)
}

/// Drops `_` digit separators, which must sit between two digits.
fn strip_underscores(s: &str) -> Option<String> {
    if s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return None;
    }
    Some(s.replace('_', ""))
}

fn parse_int(text: &str, base: u32) -> Option<i64> {
    let s = text.trim();
    let (negative, s) = match s.chars().next() {
        Some('-') => (true, &s[1..]),
        Some('+') => (false, &s[1..]),
        _ => (false, s),
    };

    let lower = s.to_ascii_lowercase();
    let prefixed = |prefix: &str, radix: u32| {
        (base == 0 || base == radix) && lower.starts_with(prefix)
    };
    let after_prefix = || s[2..].strip_prefix('_').unwrap_or(&s[2..]);
    let (base, digits) = if prefixed("0x", 16) {
        (16, after_prefix())
    } else if prefixed("0o", 8) {
        (8, after_prefix())
    } else if prefixed("0b", 2) {
        (2, after_prefix())
    } else if base == 0 {
        // `int('010', 0)` is ambiguous and rejected.
        if s.len() > 1 && s.starts_with('0') && s.chars().any(|c| c != '0' && c != '_') {
            return None;
        }
        (10, s)
    } else {
        (base, s)
    };

    let digits = strip_underscores(digits)?;
    if digits.is_empty() || digits.starts_with(|c: char| c == '+' || c == '-') {
        return None;
    }

    let magnitude = u64::from_str_radix(&digits, base).ok()?;
    if negative {
        if magnitude == i64::MIN.unsigned_abs() {
            Some(i64::MIN)
        } else {
            i64::try_from(magnitude).ok().map(|n| -n)
        }
    } else {
        i64::try_from(magnitude).ok()
    }
}

/// `int(x=0)`, `int(text, base=10)`
pub fn int(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    mut kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    let base = take_kwarg(&mut kwargs, "base");
    no_kwargs("int", &kwargs)?;
    check_args("int", &args, 0, 2)?;
    let base = match args.get(1).or_else(|| base.as_ref()) {
        Some(base) => Some(integer(base)?),
        None => None,
    };

    let value = match args.get(0) {
        Some(value) => value,
        None if base.is_some() => {
            return Err(Exception::type_error("int() missing string argument"))
        }
        None => return Ok(Value::Int(0)),
    };

    if let Some(base) = base {
        if base != 0 && !(2..=36).contains(&base) {
            return Err(Exception::value_error(
                "int() base must be >= 2 and <= 36, or 0",
            ));
        }
        if !matches!(value, Value::Str(_)) {
            return Err(Exception::type_error(
                "int() can't convert non-string with explicit base",
            ));
        }
    }

    match value {
        Value::Bool(_) | Value::Int(_) => Ok(Value::Int(integer(value)?)),
        Value::Float(n) => Ok(Value::Int(truncate(*n)?)),
        Value::Str(text) => {
            let base = base.unwrap_or(10);
            parse_int(text, base as u32).map(Value::Int).ok_or_else(|| {
                Exception::value_error(format!(
                    "invalid literal for int() with base {}: {}",
                    base,
                    str_repr(text)
                ))
            })
        }
        other => Err(Exception::type_error(format!(
            "int() argument must be a string, a bytes-like object or a real number, not '{}'",
            other.type_name()
        ))),
    }
}

fn parse_float(text: &str) -> Option<f64> {
    let s = strip_underscores(text.trim())?;
    let lower = s.to_ascii_lowercase();
    // At most one sign.
    let unsigned = lower
        .strip_prefix(|c: char| c == '+' || c == '-')
        .unwrap_or(&lower);
    if unsigned.is_empty() || unsigned.starts_with(|c: char| c == '+' || c == '-') {
        return None;
    }
    s.parse::<f64>().ok()
}

/// `float(x=0.0)`
pub fn float(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("float", &kwargs)?;
    check_args("float", &args, 0, 1)?;
    match args.get(0) {
        None => Ok(Value::Float(0.0)),
        Some(Value::Str(text)) => parse_float(text).map(Value::Float).ok_or_else(|| {
            Exception::value_error(format!(
                "could not convert string to float: {}",
                str_repr(text)
            ))
        }),
        Some(value) => value.as_float().map(Value::Float).ok_or_else(|| {
            Exception::type_error(format!(
                "float() argument must be a string or a real number, not '{}'",
                value.type_name()
            ))
        }),
    }
}

pub fn str(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("str", &kwargs)?;
    check_args("str", &args, 0, 1)?;
    Ok(match args.get(0) {
        Some(value @ Value::Str(_)) => value.clone(),
        Some(value) => Value::from(value.try_str()?),
        None => Value::from(""),
    })
}

pub fn bool(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("bool", &kwargs)?;
    check_args("bool", &args, 0, 1)?;
    Ok(Value::Bool(args.get(0).map_or(false, Value::truthy)))
}

pub fn list(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("list", &kwargs)?;
    check_args("list", &args, 0, 1)?;
    match args.get(0) {
        Some(iterable) => Ok(Value::list(iterable.to_vec()?)),
        None => Ok(Value::list(vec![])),
    }
}

pub fn tuple(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("tuple", &kwargs)?;
    check_args("tuple", &args, 0, 1)?;
    match args.get(0) {
        Some(value @ Value::Tuple(_)) => Ok(value.clone()),
        Some(iterable) => Ok(Value::tuple(iterable.to_vec()?)),
        None => Ok(Value::tuple(vec![])),
    }
}

/// `dict(mapping_or_pairs, **kwargs)`
pub fn dict(
    interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    check_args("dict", &args, 0, 1)?;
    let dict = Value::dict(Dict::new());
    methods::call(interp, &dict, "update", args, kwargs)?;
    Ok(dict)
}

/// `range(stop)`, `range(start, stop[, step])`
pub fn range(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("range", &kwargs)?;
    check_args("range", &args, 1, 3)?;
    let ints = args.iter().map(integer).collect::<Result<Vec<_>>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => unreachable!(),
    };

    if step == 0 {
        return Err(Exception::value_error("range() arg 3 must not be zero"));
    }
    Ok(Value::Range { start, stop, step })
}

pub fn chr(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("chr", &kwargs)?;
    check_args("chr", &args, 1, 1)?;
    let code = integer(&args[0])?;
    let c = u32::try_from(code)
        .ok()
        .and_then(std::char::from_u32)
        .ok_or_else(|| Exception::value_error("chr() arg not in range(0x110000)"))?;
    Ok(Value::from(c.to_string()))
}

pub fn ord(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("ord", &kwargs)?;
    check_args("ord", &args, 1, 1)?;
    let text = match &args[0] {
        Value::Str(text) => text,
        other => {
            return Err(Exception::type_error(format!(
                "ord() expected string of length 1, but {} found",
                other.type_name()
            )))
        }
    };

    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Int(c as i64)),
        _ => Err(Exception::type_error(format!(
            "ord() expected a character, but string of length {} found",
            text.chars().count()
        ))),
    }
}

fn radix(name: &str, args: &[Value], kwargs: &[(String, Value)], prefix: &str) -> Result<Value> {
    no_kwargs(name, kwargs)?;
    check_args(name, args, 1, 1)?;
    let n = integer(&args[0])?;
    let sign = if n < 0 { "-" } else { "" };
    let magnitude = n.unsigned_abs();
    let digits = match prefix {
        "0x" => format!("{:x}", magnitude),
        "0o" => format!("{:o}", magnitude),
        _ => format!("{:b}", magnitude),
    };
    Ok(Value::from(format!("{}{}{}", sign, prefix, digits)))
}

pub fn hex(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    radix("hex", &args, &kwargs, "0x")
}

pub fn oct(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    radix("oct", &args, &kwargs, "0o")
}

pub fn bin(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    radix("bin", &args, &kwargs, "0b")
}

pub fn type_(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("type", &kwargs)?;
    if args.len() != 1 {
        return Err(Exception::type_error("type() takes 1 argument"));
    }
    Ok(class_of(&args[0]))
}

fn instance_of(value: &Value, class: &Value) -> Result<bool> {
    match class {
        Value::Tuple(classes) => {
            for class in classes.iter() {
                if instance_of(value, class)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::Builtin(builtin) if builtin.class => {
            // bool is a subclass of int.
            if builtin.name == "int" && matches!(value, Value::Bool(_)) {
                return Ok(true);
            }
            Ok(class_of(value).is(class))
        }
        Value::ExceptionClass(kind) => Ok(match value {
            Value::Exception(exc) => exc.kind.is_subclass_of(*kind),
            _ => false,
        }),
        Value::Type(name) => Ok(value.type_name() == *name),
        _ => Err(Exception::type_error(
            "isinstance() arg 2 must be a type, a tuple of types, or a union",
        )),
    }
}

pub fn isinstance(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("isinstance", &kwargs)?;
    check_args("isinstance", &args, 2, 2)?;
    Ok(Value::Bool(instance_of(&args[0], &args[1])?))
}

pub fn callable(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("callable", &kwargs)?;
    check_args("callable", &args, 1, 1)?;
    Ok(Value::Bool(matches!(
        args[0],
        Value::Function(_)
            | Value::Builtin(_)
            | Value::Method(_)
            | Value::ExceptionClass(_)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn int_literals() {
        assert_eq!(parse_int(" 42 ", 10), Some(42));
        assert_eq!(parse_int("-1_000", 10), Some(-1000));
        assert_eq!(parse_int("ff", 16), Some(255));
        assert_eq!(parse_int("0xff", 16), Some(255));
        assert_eq!(parse_int("0b101", 0), Some(5));
        assert_eq!(parse_int("010", 0), None);
        assert_eq!(parse_int("0", 0), Some(0));
        assert_eq!(parse_int("1__0", 10), None);
        assert_eq!(parse_int("12a", 10), None);
        assert_eq!(parse_int("", 10), None);
        assert_eq!(parse_int("--1", 10), None);
        assert_eq!(parse_int("-9223372036854775808", 10), Some(i64::MIN));
        assert_eq!(parse_int("9223372036854775808", 10), None);
    }

    #[test]
    fn float_literals() {
        assert_eq!(parse_float(" 1.5 "), Some(1.5));
        assert_eq!(parse_float("1e3"), Some(1000.0));
        assert_eq!(parse_float("-inf"), Some(std::f64::NEG_INFINITY));
        assert!(parse_float("nan").map_or(false, f64::is_nan));
        assert_eq!(parse_float("abc"), None);
        assert_eq!(parse_float("+-1"), None);
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate(-2.7).unwrap(), -2);
        assert_eq!(
            truncate(std::f64::INFINITY).unwrap_err().message,
            "cannot convert float infinity to integer"
        );
        assert_eq!(truncate(std::f64::NAN).unwrap_err().kind, ExceptionKind::ValueError);
    }

    #[test]
    fn instances() {
        let int = crate::builtins::lookup("int").unwrap();
        assert!(instance_of(&Value::Bool(true), &int).unwrap());
        assert!(!instance_of(&Value::from("1"), &int).unwrap());
        let exc = Value::Exception(std::rc::Rc::new(Exception::value_error("x")));
        assert!(instance_of(&exc, &Value::ExceptionClass(ExceptionKind::Exception)).unwrap());
        assert!(instance_of(&Value::Int(1), &Value::Int(1)).is_err());
    }
}
