use super::{check_args, no_kwargs, sort_values, take_kwarg, Result};
use crate::ast::BinOp;
use crate::exception::{Exception, ExceptionKind};
use crate::interpreter::Interpreter;
use crate::ops;
use crate::value::Value;
use std::cmp::Ordering;
use std::convert::TryFrom;

pub fn len(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("len", &kwargs)?;
    check_args("len", &args, 1, 1)?;
    match args[0].len() {
        Some(len) => i64::try_from(len).map(Value::Int).map_err(|_| {
            Exception::new(
                ExceptionKind::OverflowError,
                "Python int too large to convert to C ssize_t",
            )
        }),
        None => Err(Exception::type_error(format!(
            "object of type '{}' has no len()",
            args[0].type_name()
        ))),
    }
}

/// `sorted(iterable, key=None, reverse=False)`
pub fn sorted(
    interp: &mut Interpreter,
    args: Vec<Value>,
    mut kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    let key = take_kwarg(&mut kwargs, "key");
    let reverse = take_kwarg(&mut kwargs, "reverse").map_or(false, |r| r.truthy());
    no_kwargs("sorted", &kwargs)?;
    check_args("sorted", &args, 1, 1)?;
    let items = args[0].to_vec()?;
    Ok(Value::list(sort_values(interp, items, key.as_ref(), reverse)?))
}

pub fn reversed(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("reversed", &kwargs)?;
    check_args("reversed", &args, 1, 1)?;
    match &args[0] {
        Value::List(_) | Value::Tuple(_) | Value::Str(_) | Value::Dict(_) | Value::Range { .. } => {
            let mut items = args[0].to_vec()?;
            items.reverse();
            Ok(Value::list(items))
        }
        other => Err(Exception::type_error(format!(
            "'{}' object is not reversible",
            other.type_name()
        ))),
    }
}

/// `enumerate(iterable, start=0)`
pub fn enumerate(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    mut kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    let start = take_kwarg(&mut kwargs, "start");
    no_kwargs("enumerate", &kwargs)?;
    check_args("enumerate", &args, 1, 2)?;
    let start = match args.get(1).or_else(|| start.as_ref()) {
        Some(start) => start.as_int().ok_or_else(|| {
            Exception::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                start.type_name()
            ))
        })?,
        None => 0,
    };

    let mut pairs = Vec::new();
    for (i, item) in args[0].iter()?.enumerate() {
        let index = start.checked_add(i as i64).ok_or_else(Exception::overflow)?;
        pairs.push(Value::tuple(vec![Value::Int(index), item]));
    }
    Ok(Value::list(pairs))
}

pub fn zip(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("zip", &kwargs)?;
    let columns = args
        .iter()
        .map(Value::to_vec)
        .collect::<Result<Vec<_>>>()?;
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    let zipped = (0..rows)
        .map(|row| Value::tuple(columns.iter().map(|column| column[row].clone()).collect()))
        .collect();
    Ok(Value::list(zipped))
}

/// `map(func, *iterables)`, eagerly.
pub fn map(
    interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("map", &kwargs)?;
    check_args("map", &args, 2, usize::MAX)?;
    let columns = args[1..]
        .iter()
        .map(Value::to_vec)
        .collect::<Result<Vec<_>>>()?;
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    let mut mapped = Vec::with_capacity(rows);
    for row in 0..rows {
        let call_args = columns.iter().map(|column| column[row].clone()).collect();
        mapped.push(interp.call(&args[0], call_args, vec![])?);
    }
    Ok(Value::list(mapped))
}

/// `filter(func_or_none, iterable)`, eagerly.
pub fn filter(
    interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("filter", &kwargs)?;
    check_args("filter", &args, 2, 2)?;
    let mut kept = Vec::new();
    for item in args[1].iter()? {
        let keep = match &args[0] {
            Value::None => item.truthy(),
            func => interp.call(func, vec![item.clone()], vec![])?.truthy(),
        };
        if keep {
            kept.push(item);
        }
    }
    Ok(Value::list(kept))
}

/// `min()` and `max()`: the first item that no other item beats.
fn extreme(
    interp: &mut Interpreter,
    name: &str,
    args: Vec<Value>,
    mut kwargs: Vec<(String, Value)>,
    wanted: Ordering,
) -> Result<Value> {
    let key = take_kwarg(&mut kwargs, "key").filter(|key| !matches!(key, Value::None));
    let default = take_kwarg(&mut kwargs, "default");
    no_kwargs(name, &kwargs)?;
    check_args(name, &args, 1, usize::MAX)?;

    let items = if args.len() == 1 {
        args[0].to_vec()?
    } else {
        if default.is_some() {
            return Err(Exception::type_error(format!(
                "Cannot specify a default for {}() with multiple positional arguments",
                name
            )));
        }
        args
    };

    let op = if wanted == Ordering::Less { "<" } else { ">" };
    let mut best: Option<(Value, Value)> = None;
    for item in items {
        let rank = match &key {
            Some(key) => interp.call(key, vec![item.clone()], vec![])?,
            None => item.clone(),
        };
        let better = match &best {
            None => true,
            Some((best_rank, _)) => rank.py_cmp(best_rank, op)? == Some(wanted),
        };
        if better {
            best = Some((rank, item));
        }
    }

    match (best, default) {
        (Some((_, item)), _) => Ok(item),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(Exception::value_error(format!(
            "{}() arg is an empty sequence",
            name
        ))),
    }
}

pub fn min(
    interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    extreme(interp, "min", args, kwargs, Ordering::Less)
}

pub fn max(
    interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    extreme(interp, "max", args, kwargs, Ordering::Greater)
}

/// `sum(iterable, start=0)`
pub fn sum(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    mut kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    let start = take_kwarg(&mut kwargs, "start");
    no_kwargs("sum", &kwargs)?;
    check_args("sum", &args, 1, 2)?;
    let mut total = args.get(1).cloned().or(start).unwrap_or(Value::Int(0));
    if let Value::Str(_) = total {
        return Err(Exception::type_error(
            "sum() can't sum strings [use ''.join(seq) instead]",
        ));
    }

    for item in args[0].iter()? {
        total = ops::binary(BinOp::Add, &total, &item)?;
    }
    Ok(total)
}

pub fn any(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("any", &kwargs)?;
    check_args("any", &args, 1, 1)?;
    let found = args[0].iter()?.any(|item| item.truthy());
    Ok(Value::Bool(found))
}

pub fn all(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("all", &kwargs)?;
    check_args("all", &args, 1, 1)?;
    let every = args[0].iter()?.all(|item| item.truthy());
    Ok(Value::Bool(every))
}
