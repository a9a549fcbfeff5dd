use super::{check_args, no_kwargs, take_kwarg, Result};
use crate::exception::Exception;
use crate::format::format_value;
use crate::interpreter::Interpreter;
use crate::value::Value;

fn separator(value: Option<Value>, name: &str, default: &str) -> Result<String> {
    match value {
        None | Some(Value::None) => Ok(default.to_owned()),
        Some(Value::Str(s)) => Ok(s.to_string()),
        Some(other) => Err(Exception::type_error(format!(
            "{} must be None or a string, not {}",
            name,
            other.type_name()
        ))),
    }
}

/// `print(*objects, sep=' ', end='\n')`
pub fn print(
    interp: &mut Interpreter,
    args: Vec<Value>,
    mut kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    let sep = separator(take_kwarg(&mut kwargs, "sep"), "sep", " ")?;
    let end = separator(take_kwarg(&mut kwargs, "end"), "end", "\n")?;
    // Output is flushed when the program finishes anyway.
    take_kwarg(&mut kwargs, "flush");
    if let Some((key, _)) = kwargs.first() {
        return Err(Exception::type_error(format!(
            "'{}' is an invalid keyword argument for print()",
            key
        )));
    }

    let mut line = args
        .iter()
        .map(Value::try_str)
        .collect::<Result<Vec<_>>>()?
        .join(&sep);
    line.push_str(&end);
    interp.write(&line);
    Ok(Value::None)
}

pub fn repr(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("repr", &kwargs)?;
    check_args("repr", &args, 1, 1)?;
    Ok(Value::from(args[0].try_repr()?))
}

/// `format(value, spec='')`
pub fn format(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    no_kwargs("format", &kwargs)?;
    check_args("format", &args, 1, 2)?;
    let spec = match args.get(1) {
        None => "",
        Some(Value::Str(spec)) => spec,
        Some(other) => {
            return Err(Exception::type_error(format!(
                "format() argument 2 must be str, not {}",
                other.type_name()
            )))
        }
    };
    Ok(Value::from(format_value(&args[0], spec)?))
}
