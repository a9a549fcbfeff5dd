use super::convert::truncate;
use super::{check_args, no_kwargs, Result};
use crate::ast::BinOp;
use crate::exception::Exception;
use crate::interpreter::Interpreter;
use crate::ops;
use crate::value::Value;

pub fn abs(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("abs", &kwargs)?;
    check_args("abs", &args, 1, 1)?;
    match &args[0] {
        Value::Float(n) => Ok(Value::Float(n.abs())),
        value => match value.as_int() {
            Some(n) => n.checked_abs().map(Value::Int).ok_or_else(Exception::overflow),
            None => Err(Exception::type_error(format!(
                "bad operand type for abs(): '{}'",
                value.type_name()
            ))),
        },
    }
}

/// Rounds half-way cases to the even neighbour.
pub fn round_half_even(x: f64) -> f64 {
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        x.round()
    }
}

fn round_int(n: i64, ndigits: i64) -> Result<i64> {
    if ndigits >= 0 {
        return Ok(n);
    }

    let scale = match 10i64.checked_pow((-ndigits).min(u32::MAX as i64) as u32) {
        Some(scale) => scale,
        None => return Ok(0),
    };
    let quotient = n.div_euclid(scale);
    let remainder = n.rem_euclid(scale);
    let quotient = match (2 * (remainder as i128)).cmp(&(scale as i128)) {
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal if quotient % 2 != 0 => quotient + 1,
        _ => quotient,
    };
    quotient.checked_mul(scale).ok_or_else(Exception::overflow)
}

fn round_float(x: f64, ndigits: i64) -> f64 {
    if !x.is_finite() {
        return x;
    }

    if ndigits >= 0 {
        // Decimal formatting rounds the exact binary value, which is what
        // `round(2.675, 2) == 2.67` expects.
        let precision = ndigits.min(320) as usize;
        return format!("{:.*}", precision, x).parse().unwrap_or(x);
    }

    let scale = 10f64.powi((-ndigits).min(400) as i32);
    if scale.is_infinite() {
        return 0.0_f64.copysign(x);
    }
    round_half_even(x / scale) * scale
}

/// `round(number, ndigits=None)`
pub fn round(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("round", &kwargs)?;
    check_args("round", &args, 1, 2)?;
    let ndigits = match args.get(1) {
        None | Some(Value::None) => None,
        Some(value) => Some(value.as_int().ok_or_else(|| {
            Exception::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                value.type_name()
            ))
        })?),
    };

    match (&args[0], ndigits) {
        (Value::Float(x), None) => Ok(Value::Int(truncate(round_half_even(*x))?)),
        (Value::Float(x), Some(ndigits)) => Ok(Value::Float(round_float(*x, ndigits))),
        (value, ndigits) => match value.as_int() {
            Some(n) => Ok(Value::Int(round_int(n, ndigits.unwrap_or(0))?)),
            None => Err(Exception::type_error(format!(
                "type {} doesn't define __round__ method",
                value.type_name()
            ))),
        },
    }
}

pub fn divmod(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("divmod", &kwargs)?;
    check_args("divmod", &args, 2, 2)?;
    let quotient = ops::binary(BinOp::FloorDiv, &args[0], &args[1])?;
    let remainder = ops::binary(BinOp::Mod, &args[0], &args[1])?;
    Ok(Value::tuple(vec![quotient, remainder]))
}

fn modular_pow(base: i64, exp: i64, modulus: i64) -> Result<i64> {
    if modulus == 0 {
        return Err(Exception::value_error("pow() 3rd argument cannot be 0"));
    }
    if exp < 0 {
        return Err(Exception::value_error(
            "base is not invertible for the given modulus",
        ));
    }

    let m = (modulus as i128).abs();
    let mut result: i128 = 1 % m;
    let mut base = (base as i128).rem_euclid(m);
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base % m;
        }
        base = base * base % m;
        exp >>= 1;
    }

    // The result takes the sign of the modulus.
    ops::int_mod(result as i64, modulus)
}

/// `pow(base, exp, mod=None)`
pub fn pow(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("pow", &kwargs)?;
    check_args("pow", &args, 2, 3)?;
    match args.get(2) {
        None | Some(Value::None) => ops::power(&args[0], &args[1]),
        Some(modulus) => match (args[0].as_int(), args[1].as_int(), modulus.as_int()) {
            (Some(base), Some(exp), Some(modulus)) => {
                Ok(Value::Int(modular_pow(base, exp, modulus)?))
            }
            _ => Err(Exception::type_error(
                "pow() 3rd argument not allowed unless all arguments are integers",
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bankers_rounding() {
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(3.5), 4.0);
        assert_eq!(round_half_even(-0.5), -0.0);
        assert_eq!(round_half_even(1.4), 1.0);
        assert_eq!(round_float(2.675, 2), 2.67);
        assert_eq!(round_float(1234.5, -2), 1200.0);
        assert_eq!(round_int(1250, -2).unwrap(), 1200);
        assert_eq!(round_int(1350, -2).unwrap(), 1400);
        assert_eq!(round_int(-1351, -2).unwrap(), -1400);
        assert_eq!(round_int(7, 3).unwrap(), 7);
    }

    #[test]
    fn modular_exponent() {
        assert_eq!(modular_pow(2, 10, 1000).unwrap(), 24);
        assert_eq!(modular_pow(2, 3, -5).unwrap(), -2);
        assert_eq!(modular_pow(5, 0, 1).unwrap(), 0);
        assert!(modular_pow(2, 3, 0).is_err());
    }
}
