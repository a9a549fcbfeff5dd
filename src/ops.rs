//! Operators on values.
use crate::ast::{BinOp, CmpOp, UnaryOp};
use crate::exception::{Exception, ExceptionKind};
use crate::value::{find, range_len, Value};
use std::cmp::Ordering;

fn unsupported(op: BinOp, lhs: &Value, rhs: &Value) -> Exception {
    Exception::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        lhs.type_name(),
        rhs.type_name()
    ))
}

/// Floored division and modulo on floats, matching `divmod()`.
pub fn float_divmod(a: f64, b: f64) -> (f64, f64) {
    let mut rem = a % b;
    let mut div = (a - rem) / b;
    if rem != 0.0 {
        if (b < 0.0) != (rem < 0.0) {
            rem += b;
            div -= 1.0;
        }
    } else {
        rem = 0.0_f64.copysign(b);
    }

    let floordiv = if div != 0.0 {
        let mut floor = div.floor();
        if div - floor > 0.5 {
            floor += 1.0;
        }
        floor
    } else {
        0.0_f64.copysign(a / b)
    };

    (floordiv, rem)
}

pub fn int_floordiv(a: i64, b: i64) -> Result<i64, Exception> {
    if b == 0 {
        return Err(Exception::zero_division(
            "integer division or modulo by zero",
        ));
    }
    let q = a.checked_div(b).ok_or_else(Exception::overflow)?;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

pub fn int_mod(a: i64, b: i64) -> Result<i64, Exception> {
    if b == 0 {
        return Err(Exception::zero_division(
            "integer division or modulo by zero",
        ));
    }
    let r = a.checked_rem(b).unwrap_or(0);
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

/// Only `**` reports a finite float overflowing; `+`, `-`, `*` and `/`
/// give `inf`.
fn float_result(n: f64, lhs: f64, rhs: f64) -> Result<Value, Exception> {
    if n.is_infinite() && lhs.is_finite() && rhs.is_finite() {
        return Err(Exception::new(
            ExceptionKind::OverflowError,
            "(34, 'Numerical result out of range')",
        ));
    }
    Ok(Value::Float(n))
}

pub fn power(lhs: &Value, rhs: &Value) -> Result<Value, Exception> {
    if let (Some(base), Some(exp)) = (lhs.as_int(), rhs.as_int()) {
        if exp >= 0 {
            let result = match base {
                0 | 1 => Some(if exp == 0 { 1 } else { base }),
                -1 => Some(if exp % 2 == 0 { 1 } else { -1 }),
                _ if exp > u32::MAX as i64 => None,
                _ => base.checked_pow(exp as u32),
            };
            return result.map(Value::Int).ok_or_else(Exception::overflow);
        }
    }

    match (lhs.as_float(), rhs.as_float()) {
        (Some(base), Some(exp)) => {
            if base == 0.0 && exp < 0.0 {
                return Err(Exception::zero_division(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            if base < 0.0 && exp.fract() != 0.0 {
                return Err(Exception::value_error("math domain error"));
            }
            float_result(base.powf(exp), base, exp)
        }
        _ => Err(unsupported(BinOp::Pow, lhs, rhs)),
    }
}

pub fn repeat(items: &[Value], times: i64) -> Result<Vec<Value>, Exception> {
    let times = times.max(0) as usize;
    items
        .len()
        .checked_mul(times)
        .ok_or_else(Exception::overflow)?;
    let mut repeated = Vec::with_capacity(items.len() * times);
    for _ in 0..times {
        repeated.extend(items.iter().cloned());
    }
    Ok(repeated)
}

pub fn binary(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, Exception> {
    if let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) {
        return match op {
            BinOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(Exception::overflow),
            BinOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(Exception::overflow),
            BinOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(Exception::overflow),
            BinOp::Div => {
                if b == 0 {
                    Err(Exception::zero_division("division by zero"))
                } else {
                    Ok(Value::Float(a as f64 / b as f64))
                }
            }
            BinOp::FloorDiv => int_floordiv(a, b).map(Value::Int),
            BinOp::Mod => int_mod(a, b).map(Value::Int),
            BinOp::Pow => power(lhs, rhs),
        };
    }

    if let (Some(a), Some(b)) = (lhs.as_float(), rhs.as_float()) {
        return match op {
            BinOp::Add => Ok(Value::Float(a + b)),
            BinOp::Sub => Ok(Value::Float(a - b)),
            BinOp::Mul => Ok(Value::Float(a * b)),
            BinOp::Div => {
                if b == 0.0 {
                    Err(Exception::zero_division("float division by zero"))
                } else {
                    Ok(Value::Float(a / b))
                }
            }
            BinOp::FloorDiv => {
                if b == 0.0 {
                    Err(Exception::zero_division("float floor division by zero"))
                } else {
                    Ok(Value::Float(float_divmod(a, b).0))
                }
            }
            BinOp::Mod => {
                if b == 0.0 {
                    Err(Exception::zero_division("float modulo"))
                } else {
                    Ok(Value::Float(float_divmod(a, b).1))
                }
            }
            BinOp::Pow => power(lhs, rhs),
        };
    }

    match (op, lhs, rhs) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(a);
            s.push_str(b);
            Ok(Value::from(s))
        }
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            let mut items = a.to_vec();
            items.extend(b.iter().cloned());
            Ok(Value::tuple(items))
        }
        (BinOp::Add, Value::Str(_), _)
        | (BinOp::Add, Value::List(_), _)
        | (BinOp::Add, Value::Tuple(_), _) => Err(Exception::type_error(format!(
            "can only concatenate {} (not \"{}\") to {}",
            lhs.type_name(),
            rhs.type_name(),
            lhs.type_name()
        ))),
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if n.as_int().is_some() => {
            let times = n.as_int().unwrap_or(0).max(0) as usize;
            s.len().checked_mul(times).ok_or_else(Exception::overflow)?;
            Ok(Value::from(s.repeat(times)))
        }
        (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items))
            if n.as_int().is_some() =>
        {
            let items = items.borrow().clone();
            Ok(Value::list(repeat(&items, n.as_int().unwrap_or(0))?))
        }
        (BinOp::Mul, Value::Tuple(items), n) | (BinOp::Mul, n, Value::Tuple(items))
            if n.as_int().is_some() =>
        {
            Ok(Value::tuple(repeat(items, n.as_int().unwrap_or(0))?))
        }
        (BinOp::Mod, Value::Str(template), args) => {
            crate::format::percent_format(template, args).map(Value::from)
        }
        (BinOp::Mul, Value::Str(_), other)
        | (BinOp::Mul, Value::List(_), other)
        | (BinOp::Mul, Value::Tuple(_), other)
        | (BinOp::Mul, other, Value::Str(_))
        | (BinOp::Mul, other, Value::List(_))
        | (BinOp::Mul, other, Value::Tuple(_)) => Err(Exception::type_error(format!(
            "can't multiply sequence by non-int of type '{}'",
            other.type_name()
        ))),
        _ => Err(unsupported(op, lhs, rhs)),
    }
}

pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, Exception> {
    match (op, operand) {
        (UnaryOp::Not, _) => Ok(Value::Bool(!operand.truthy())),
        (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Pos, Value::Float(n)) => Ok(Value::Float(*n)),
        (UnaryOp::Neg, _) if operand.as_int().is_some() => operand
            .as_int()
            .and_then(i64::checked_neg)
            .map(Value::Int)
            .ok_or_else(Exception::overflow),
        (UnaryOp::Pos, _) if operand.as_int().is_some() => {
            Ok(Value::Int(operand.as_int().unwrap_or(0)))
        }
        _ => Err(Exception::type_error(format!(
            "bad operand type for unary {}: '{}'",
            if op == UnaryOp::Neg { "-" } else { "+" },
            operand.type_name()
        ))),
    }
}

/// `item in container`
pub fn contains(container: &Value, item: &Value) -> Result<bool, Exception> {
    match container {
        Value::Str(s) => match item {
            Value::Str(sub) => Ok(s.contains(&**sub)),
            _ => Err(Exception::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                item.type_name()
            ))),
        },
        Value::List(items) => Ok(find(&items.borrow(), item)?.is_some()),
        Value::Tuple(items) => Ok(find(items, item)?.is_some()),
        Value::Dict(dict) => {
            item.check_hashable()?;
            Ok(dict.borrow().contains(item))
        }
        Value::Range { start, stop, step } => match item.as_int() {
            Some(n) => {
                let in_bounds = if *step > 0 {
                    *start <= n && n < *stop
                } else {
                    *stop < n && n <= *start
                };
                Ok(in_bounds && (n as i128 - *start as i128) % *step as i128 == 0)
            }
            None => {
                for x in container.iter()? {
                    if x.py_eq(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        },
        _ => Err(Exception::type_error(format!(
            "argument of type '{}' is not iterable",
            container.type_name()
        ))),
    }
}

pub fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, Exception> {
    let ordering = |lhs: &Value, rhs: &Value| lhs.py_cmp(rhs, op.symbol());
    match op {
        CmpOp::Eq => lhs.py_eq(rhs),
        CmpOp::Ne => Ok(!lhs.py_eq(rhs)?),
        CmpOp::Lt => Ok(ordering(lhs, rhs)? == Some(Ordering::Less)),
        CmpOp::Le => Ok(matches!(
            ordering(lhs, rhs)?,
            Some(Ordering::Less) | Some(Ordering::Equal)
        )),
        CmpOp::Gt => Ok(ordering(lhs, rhs)? == Some(Ordering::Greater)),
        CmpOp::Ge => Ok(matches!(
            ordering(lhs, rhs)?,
            Some(Ordering::Greater) | Some(Ordering::Equal)
        )),
        CmpOp::In => contains(rhs, lhs),
        CmpOp::NotIn => Ok(!contains(rhs, lhs)?),
        CmpOp::Is => Ok(lhs.is(rhs)),
        CmpOp::IsNot => Ok(!lhs.is(rhs)),
    }
}

/// Resolves a possibly negative index against `len`.
fn normalize_index(index: &Value, len: usize, what: &str) -> Result<usize, Exception> {
    let i = index.as_int().ok_or_else(|| {
        Exception::type_error(format!(
            "{} indices must be integers or slices, not {}",
            what,
            index.type_name()
        ))
    })?;

    // A range can hold more than `i64::MAX` items.
    let len = len as i128;
    let resolved = if i < 0 { i as i128 + len } else { i as i128 };
    if resolved < 0 || resolved >= len {
        return Err(Exception::index_error(format!("{} index out of range", what)));
    }
    Ok(resolved as usize)
}

pub fn get_item(object: &Value, index: &Value) -> Result<Value, Exception> {
    match object {
        Value::List(items) => {
            let items = items.borrow();
            let i = normalize_index(index, items.len(), "list")?;
            Ok(items[i].clone())
        }
        Value::Tuple(items) => {
            let i = normalize_index(index, items.len(), "tuple")?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            if index.as_int().is_none() {
                return Err(Exception::type_error(format!(
                    "string indices must be integers, not '{}'",
                    index.type_name()
                )));
            }
            let len = s.chars().count();
            let i = normalize_index(index, len, "string")?;
            Ok(s.chars()
                .nth(i)
                .map(|c| Value::from(c.to_string()))
                .unwrap_or(Value::None))
        }
        Value::Dict(dict) => {
            index.check_hashable()?;
            dict.borrow()
                .get(index)
                .ok_or_else(|| Exception::key_error(index))
        }
        Value::Range { start, stop, step } => {
            let len = range_len(*start, *stop, *step);
            let i = normalize_index(index, len, "range object")?;
            // Any index below the length lands between start and stop.
            Ok(Value::Int((*start as i128 + i as i128 * *step as i128) as i64))
        }
        _ => Err(Exception::type_error(format!(
            "'{}' object is not subscriptable",
            object.type_name()
        ))),
    }
}

pub fn set_item(object: &Value, index: &Value, value: Value) -> Result<(), Exception> {
    match object {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let len = items.len();
            let i = normalize_index(index, len, "list")
                .map_err(|err| match err.kind {
                    ExceptionKind::IndexError => {
                        Exception::index_error("list assignment index out of range")
                    }
                    _ => err,
                })?;
            items[i] = value;
            Ok(())
        }
        Value::Dict(dict) => dict.borrow_mut().insert(index.clone(), value),
        _ => Err(Exception::type_error(format!(
            "'{}' object does not support item assignment",
            object.type_name()
        ))),
    }
}

pub fn del_item(object: &Value, index: &Value) -> Result<(), Exception> {
    match object {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let len = items.len();
            let i = normalize_index(index, len, "list")
                .map_err(|err| match err.kind {
                    ExceptionKind::IndexError => {
                        Exception::index_error("list assignment index out of range")
                    }
                    _ => err,
                })?;
            items.remove(i);
            Ok(())
        }
        Value::Dict(dict) => {
            index.check_hashable()?;
            match dict.borrow_mut().remove(index) {
                Some(_) => Ok(()),
                None => Err(Exception::key_error(index)),
            }
        }
        _ => Err(Exception::type_error(format!(
            "'{}' object doesn't support item deletion",
            object.type_name()
        ))),
    }
}

fn slice_bound(bound: Option<&Value>) -> Result<Option<i64>, Exception> {
    match bound {
        None | Some(Value::None) => Ok(None),
        Some(value) => value.as_int().map(Some).ok_or_else(|| {
            Exception::type_error(
                "slice indices must be integers or None or have an __index__ method",
            )
        }),
    }
}

/// The indices `seq[lower:upper:step]` selects from a sequence of `len`.
pub fn slice_indices(
    len: usize,
    lower: Option<&Value>,
    upper: Option<&Value>,
    step: Option<&Value>,
) -> Result<Vec<usize>, Exception> {
    let step = slice_bound(step)?.unwrap_or(1);
    if step == 0 {
        return Err(Exception::value_error("slice step cannot be zero"));
    }

    let len = len as i64;
    let clamp = |bound: i64| -> i64 {
        if bound < 0 {
            let bound = bound + len;
            if bound < 0 {
                if step < 0 {
                    -1
                } else {
                    0
                }
            } else {
                bound
            }
        } else if bound >= len {
            if step < 0 {
                len - 1
            } else {
                len
            }
        } else {
            bound
        }
    };

    let (default_lower, default_upper) = if step > 0 { (0, len) } else { (len - 1, -1) };
    let lower = slice_bound(lower)?.map(clamp).unwrap_or(default_lower);
    let upper = slice_bound(upper)?.map(clamp).unwrap_or(default_upper);

    let mut indices = Vec::new();
    let mut i = lower;
    while (step > 0 && i < upper) || (step < 0 && i > upper) {
        indices.push(i as usize);
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(indices)
}

pub fn get_slice(
    object: &Value,
    lower: Option<&Value>,
    upper: Option<&Value>,
    step: Option<&Value>,
) -> Result<Value, Exception> {
    match object {
        Value::List(items) => {
            let items = items.borrow();
            let indices = slice_indices(items.len(), lower, upper, step)?;
            Ok(Value::list(indices.into_iter().map(|i| items[i].clone()).collect()))
        }
        Value::Tuple(items) => {
            let indices = slice_indices(items.len(), lower, upper, step)?;
            Ok(Value::tuple(indices.into_iter().map(|i| items[i].clone()).collect()))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let indices = slice_indices(chars.len(), lower, upper, step)?;
            Ok(Value::from(indices.into_iter().map(|i| chars[i]).collect::<String>()))
        }
        Value::Range { .. } => {
            let items = object.to_vec()?;
            let indices = slice_indices(items.len(), lower, upper, step)?;
            Ok(Value::list(indices.into_iter().map(|i| items[i].clone()).collect()))
        }
        _ => Err(Exception::type_error(format!(
            "'{}' object is not subscriptable",
            object.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int(n: i64) -> Value {
        Value::Int(n)
    }

    fn message(result: Result<Value, Exception>) -> String {
        result.unwrap_err().message
    }

    #[test]
    fn floor_semantics() {
        assert_eq!(int_floordiv(7, 2).unwrap(), 3);
        assert_eq!(int_floordiv(-7, 2).unwrap(), -4);
        assert_eq!(int_floordiv(7, -2).unwrap(), -4);
        assert_eq!(int_mod(-7, 2).unwrap(), 1);
        assert_eq!(int_mod(7, -2).unwrap(), -1);
        assert_eq!(float_divmod(-7.0, 2.0), (-4.0, 1.0));
        assert_eq!(float_divmod(7.5, -2.0), (-4.0, -0.5));
    }

    #[test]
    fn division_errors() {
        assert_eq!(message(binary(BinOp::Div, &int(1), &int(0))), "division by zero");
        assert_eq!(
            message(binary(BinOp::Div, &Value::Float(1.0), &int(0))),
            "float division by zero"
        );
        assert_eq!(
            message(binary(BinOp::FloorDiv, &int(1), &int(0))),
            "integer division or modulo by zero"
        );
        assert_eq!(
            message(binary(BinOp::Mod, &int(1), &int(0))),
            "integer division or modulo by zero"
        );
        assert_eq!(
            message(binary(BinOp::FloorDiv, &Value::Float(1.0), &Value::Float(0.0))),
            "float floor division by zero"
        );
        assert_eq!(
            message(binary(BinOp::Mod, &Value::Float(1.0), &Value::Float(0.0))),
            "float modulo"
        );
    }

    #[test]
    fn arithmetic() {
        assert_eq!(binary(BinOp::Div, &int(7), &int(2)).unwrap().repr(), "3.5");
        assert_eq!(binary(BinOp::Pow, &int(2), &int(10)).unwrap().repr(), "1024");
        assert_eq!(binary(BinOp::Pow, &int(2), &int(-1)).unwrap().repr(), "0.5");
        assert_eq!(binary(BinOp::Add, &Value::Bool(true), &int(1)).unwrap().repr(), "2");
        assert_eq!(message(binary(BinOp::Mul, &int(i64::MAX), &int(2))), "integer overflow");
        let big = Value::Float(1e308);
        assert_eq!(binary(BinOp::Mul, &big, &int(10)).unwrap().repr(), "inf");
        assert_eq!(binary(BinOp::Add, &big, &big).unwrap().repr(), "inf");
        assert_eq!(binary(BinOp::Sub, &Value::Float(-1e308), &big).unwrap().repr(), "-inf");
        assert_eq!(binary(BinOp::Div, &big, &Value::Float(1e-10)).unwrap().repr(), "inf");
        assert_eq!(
            message(binary(BinOp::Pow, &big, &int(2))),
            "(34, 'Numerical result out of range')"
        );
        assert_eq!(
            message(binary(BinOp::Pow, &Value::Float(0.0), &int(-1))),
            "0.0 cannot be raised to a negative power"
        );
        assert_eq!(
            binary(BinOp::Mul, &Value::from("ab"), &int(3)).unwrap().repr(),
            "'ababab'"
        );
        assert_eq!(
            binary(BinOp::Mul, &int(2), &Value::list(vec![int(1)])).unwrap().repr(),
            "[1, 1]"
        );
        assert_eq!(
            message(binary(BinOp::Add, &Value::from("a"), &int(1))),
            "can only concatenate str (not \"int\") to str"
        );
        assert_eq!(
            message(binary(BinOp::Sub, &Value::from("a"), &int(1))),
            "unsupported operand type(s) for -: 'str' and 'int'"
        );
    }

    #[test]
    fn indexing() {
        let list = Value::list(vec![int(1), int(2), int(3)]);
        assert_eq!(get_item(&list, &int(-1)).unwrap().repr(), "3");
        assert_eq!(
            get_item(&list, &int(3)).unwrap_err().message,
            "list index out of range"
        );
        assert_eq!(
            get_item(&Value::from("héllo"), &int(1)).unwrap().repr(),
            "'é'"
        );
        assert_eq!(
            get_item(&int(1), &int(0)).unwrap_err().message,
            "'int' object is not subscriptable"
        );
        let huge = Value::Range {
            start: i64::MIN,
            stop: i64::MAX,
            step: 1,
        };
        assert_eq!(get_item(&huge, &int(-1)).unwrap().repr(), (i64::MAX - 1).to_string());
        assert_eq!(get_item(&huge, &int(i64::MAX)).unwrap().repr(), "-1");
        assert_eq!(get_item(&huge, &int(i64::MIN)).unwrap().repr(), "-1");
        let stepped = Value::Range {
            start: i64::MAX,
            stop: i64::MIN,
            step: -3,
        };
        assert_eq!(get_item(&stepped, &int(1)).unwrap().repr(), (i64::MAX - 3).to_string());
        assert_eq!(
            get_item(&stepped, &int(i64::MIN)).unwrap_err().message,
            "range object index out of range"
        );
        set_item(&list, &int(0), int(9)).unwrap();
        del_item(&list, &int(1)).unwrap();
        assert_eq!(list.repr(), "[9, 3]");
    }

    #[test]
    fn slicing() {
        let list = Value::list((0..6).map(int).collect());
        let slice = |lower: Value, upper: Value, step: Value| {
            get_slice(&list, Some(&lower), Some(&upper), Some(&step))
                .unwrap()
                .repr()
        };
        assert_eq!(slice(int(1), int(4), Value::None), "[1, 2, 3]");
        assert_eq!(slice(Value::None, Value::None, int(-1)), "[5, 4, 3, 2, 1, 0]");
        assert_eq!(slice(int(-2), Value::None, Value::None), "[4, 5]");
        assert_eq!(slice(Value::None, Value::None, int(2)), "[0, 2, 4]");
        assert_eq!(slice(int(10), int(20), Value::None), "[]");
        assert_eq!(slice(int(4), int(1), int(-2)), "[4, 2]");
        assert_eq!(
            get_slice(&Value::from("hello"), None, None, Some(&int(-1)))
                .unwrap()
                .repr(),
            "'olleh'"
        );
    }

    #[test]
    fn membership() {
        assert!(contains(&Value::from("hello"), &Value::from("ell")).unwrap());
        assert!(contains(&Value::list(vec![int(1)]), &Value::Float(1.0)).unwrap());
        let range = Value::Range {
            start: 0,
            stop: 10,
            step: 3,
        };
        assert!(contains(&range, &int(9)).unwrap());
        assert!(!contains(&range, &int(10)).unwrap());
        assert_eq!(
            contains(&int(1), &int(1)).unwrap_err().message,
            "argument of type 'int' is not iterable"
        );
    }
}
