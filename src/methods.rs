//! Attributes and methods of the built-in types.
use crate::builtins::{check_args, no_kwargs, sort_values, take_kwarg};
use crate::exception::{Exception, ExceptionKind};
use crate::format::format_value;
use crate::interpreter::Interpreter;
use crate::value::{find, BoundMethod, Dict, Value};
use phf::phf_set;
use std::cell::RefCell;
use std::rc::Rc;

type Result<I> = std::result::Result<I, Exception>;

static STR_METHODS: phf::Set<&'static str> = phf_set! {
    "upper", "lower", "strip", "lstrip", "rstrip", "split", "splitlines", "join",
    "replace", "startswith", "endswith", "find", "rfind", "index", "count",
    "isdigit", "isalpha", "isalnum", "isspace", "title", "capitalize", "zfill",
    "ljust", "rjust", "center", "format",
};

static LIST_METHODS: phf::Set<&'static str> = phf_set! {
    "append", "extend", "pop", "insert", "remove", "index", "count", "sort",
    "reverse", "copy", "clear",
};

static DICT_METHODS: phf::Set<&'static str> = phf_set! {
    "get", "keys", "values", "items", "pop", "update", "copy", "clear", "setdefault",
};

fn no_attribute(object: &Value, name: &str) -> Exception {
    Exception::new(
        ExceptionKind::AttributeError,
        format!("'{}' object has no attribute '{}'", object.type_name(), name),
    )
}

fn class_methods(class: &str) -> Option<&'static phf::Set<&'static str>> {
    match class {
        "str" => Some(&STR_METHODS),
        "list" => Some(&LIST_METHODS),
        "dict" => Some(&DICT_METHODS),
        _ => None,
    }
}

/// `object.name`
pub fn get_attr(object: &Value, name: &str) -> Result<Value> {
    let methods = match object {
        Value::Module(module) => {
            return module.attrs.get(name).cloned().ok_or_else(|| {
                Exception::new(
                    ExceptionKind::AttributeError,
                    format!("module '{}' has no attribute '{}'", module.name, name),
                )
            });
        }
        Value::Function(func) if name == "__name__" => {
            return Ok(Value::from(func.def.name.as_str()));
        }
        Value::Builtin(builtin) if name == "__name__" => return Ok(Value::from(builtin.name)),
        Value::ExceptionClass(kind) if name == "__name__" => return Ok(Value::from(kind.name())),
        Value::Exception(exc) if name == "args" => {
            return Ok(Value::tuple(exc.args()));
        }
        // `str.lower` and friends, called with the receiver as the first argument.
        Value::Builtin(class) if class.class => match class_methods(class.name) {
            Some(methods) if methods.contains(name) => methods,
            _ => {
                return Err(Exception::new(
                    ExceptionKind::AttributeError,
                    format!("type object '{}' has no attribute '{}'", class.name, name),
                ))
            }
        },
        Value::Str(_) => &STR_METHODS,
        Value::List(_) => &LIST_METHODS,
        Value::Dict(_) => &DICT_METHODS,
        _ => return Err(no_attribute(object, name)),
    };

    if !methods.contains(name) {
        return Err(no_attribute(object, name));
    }

    Ok(Value::Method(Rc::new(BoundMethod {
        receiver: object.clone(),
        name: name.to_owned(),
    })))
}

pub fn call(
    interp: &mut Interpreter,
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    trace!("call method: {}.{}", receiver.type_name(), name);
    match receiver {
        Value::Str(s) => str_method(s, name, args, kwargs),
        Value::List(items) => list_method(interp, items, name, args, kwargs),
        Value::Dict(dict) => dict_method(dict, name, args, kwargs),
        Value::Builtin(class) => {
            let mut args = args.into_iter();
            let receiver = args.next().ok_or_else(|| {
                Exception::type_error(format!(
                    "unbound method {}.{}() needs an argument",
                    class.name, name
                ))
            })?;
            if receiver.type_name() != class.name {
                return Err(Exception::type_error(format!(
                    "descriptor '{}' for '{}' objects doesn't apply to a '{}' object",
                    name,
                    class.name,
                    receiver.type_name()
                )));
            }
            call(interp, &receiver, name, args.collect(), kwargs)
        }
        _ => Err(no_attribute(receiver, name)),
    }
}

fn expect_str<'v>(value: &'v Value, what: &str) -> Result<&'v str> {
    match value {
        Value::Str(s) => Ok(&**s),
        _ => Err(Exception::type_error(format!(
            "{} must be str, not {}",
            what,
            value.type_name()
        ))),
    }
}

fn expect_int(value: &Value, what: &str) -> Result<i64> {
    value.as_int().ok_or_else(|| {
        Exception::type_error(format!(
            "'{}' object cannot be interpreted as an integer{}",
            value.type_name(),
            what
        ))
    })
}

/// Byte offset to character offset.
fn char_index(s: &str, byte: usize) -> i64 {
    s[..byte].chars().count() as i64
}

fn strip_chars<'s>(s: &'s str, chars: Option<&Value>, left: bool, right: bool) -> Result<&'s str> {
    let set: Option<Vec<char>> = match chars {
        None | Some(Value::None) => None,
        Some(value) => Some(expect_str(value, "strip arg")?.chars().collect()),
    };

    let matches = |c: char| match &set {
        Some(set) => set.contains(&c),
        None => c.is_whitespace(),
    };

    let mut s = s;
    if left {
        s = s.trim_start_matches(matches);
    }
    if right {
        s = s.trim_end_matches(matches);
    }
    Ok(s)
}

fn split(s: &str, sep: Option<&Value>, maxsplit: i64) -> Result<Vec<Value>> {
    let limit = if maxsplit < 0 {
        usize::MAX
    } else {
        maxsplit as usize + 1
    };

    let parts: Vec<&str> = match sep {
        None | Some(Value::None) => {
            let mut parts = Vec::new();
            let mut rest = s.trim_start();
            while !rest.is_empty() {
                if parts.len() + 1 == limit {
                    parts.push(rest);
                    break;
                }
                match rest.find(char::is_whitespace) {
                    Some(end) => {
                        parts.push(&rest[..end]);
                        rest = rest[end..].trim_start();
                    }
                    None => {
                        parts.push(rest);
                        break;
                    }
                }
            }
            parts
        }
        Some(sep) => {
            let sep = expect_str(sep, "sep")?;
            if sep.is_empty() {
                return Err(Exception::value_error("empty separator"));
            }
            s.splitn(limit, sep).collect()
        }
    };

    Ok(parts.into_iter().map(Value::from).collect())
}

fn justify(s: &str, args: &[Value], align: char) -> Result<Value> {
    let width = expect_int(&args[0], "")?.max(0) as usize;
    let fill = match args.get(1) {
        Some(fill) => {
            let fill = expect_str(fill, "fill character")?;
            let mut chars = fill.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(Exception::type_error(
                        "The fill character must be exactly one character long",
                    ))
                }
            }
        }
        None => ' ',
    };

    let len = s.chars().count();
    if len >= width {
        return Ok(Value::from(s));
    }

    let padding = width - len;
    let (left, right) = match align {
        '<' => (0, padding),
        '>' => (padding, 0),
        _ => {
            // The odd padding character goes left when the width is odd.
            let left = padding / 2 + (padding & width & 1);
            (left, padding - left)
        }
    };

    let fill = fill.to_string();
    Ok(Value::from(format!(
        "{}{}{}",
        fill.repeat(left),
        s,
        fill.repeat(right)
    )))
}

/// `template.format(*args, **kwargs)`
fn str_format(template: &str, args: &[Value], kwargs: &[(String, Value)]) -> Result<String> {
    let chars: Vec<char> = template.chars().collect();
    let mut s = String::new();
    let mut next_auto = 0;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => {
                s.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                s.push('}');
                i += 2;
            }
            '}' => {
                return Err(Exception::value_error(
                    "Single '}' encountered in format string",
                ))
            }
            '{' => {
                let end = chars[i..]
                    .iter()
                    .position(|&c| c == '}')
                    .map(|offset| i + offset)
                    .ok_or_else(|| {
                        Exception::value_error("Single '{' encountered in format string")
                    })?;
                let field: String = chars[i + 1..end].iter().collect();
                let (field, spec) = match field.find(':') {
                    Some(colon) => (field[..colon].to_owned(), field[colon + 1..].to_owned()),
                    None => (field.clone(), String::new()),
                };
                let (name, conversion) = match field.find('!') {
                    Some(bang) => (field[..bang].to_owned(), field[bang + 1..].chars().next()),
                    None => (field, None),
                };

                let value = if name.is_empty() {
                    let value = args.get(next_auto).cloned().ok_or_else(|| {
                        Exception::index_error(format!(
                            "Replacement index {} out of range for positional args tuple",
                            next_auto
                        ))
                    })?;
                    next_auto += 1;
                    value
                } else if let Ok(index) = name.parse::<usize>() {
                    args.get(index).cloned().ok_or_else(|| {
                        Exception::index_error(format!(
                            "Replacement index {} out of range for positional args tuple",
                            index
                        ))
                    })?
                } else {
                    kwargs
                        .iter()
                        .find(|(key, _)| *key == name)
                        .map(|(_, value)| value.clone())
                        .ok_or_else(|| Exception::key_error(&Value::from(name.as_str())))?
                };

                let value = match conversion {
                    Some('r') | Some('a') => Value::from(value.try_repr()?),
                    Some('s') => Value::from(value.try_str()?),
                    Some(other) => {
                        return Err(Exception::value_error(format!(
                            "Unknown conversion specifier {}",
                            other
                        )))
                    }
                    None => value,
                };

                s.push_str(&format_value(&value, &spec)?);
                i = end + 1;
            }
            c => {
                s.push(c);
                i += 1;
            }
        }
    }
    Ok(s)
}

fn str_method(
    s: &str,
    name: &str,
    mut args: Vec<Value>,
    mut kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    let qualified = format!("str.{}", name);
    if name != "format" && name != "split" {
        no_kwargs(&qualified, &kwargs)?;
    }

    match name {
        "upper" => {
            check_args(&qualified, &args, 0, 0)?;
            Ok(Value::from(s.to_uppercase()))
        }
        "lower" => {
            check_args(&qualified, &args, 0, 0)?;
            Ok(Value::from(s.to_lowercase()))
        }
        "strip" | "lstrip" | "rstrip" => {
            check_args(&qualified, &args, 0, 1)?;
            let stripped = strip_chars(s, args.get(0), name != "rstrip", name != "lstrip")?;
            Ok(Value::from(stripped))
        }
        "split" => {
            let sep = take_kwarg(&mut kwargs, "sep").or_else(|| {
                if args.is_empty() {
                    None
                } else {
                    Some(args.remove(0))
                }
            });
            let maxsplit = take_kwarg(&mut kwargs, "maxsplit").or_else(|| args.pop());
            no_kwargs(&qualified, &kwargs)?;
            check_args(&qualified, &args, 0, 0)?;
            let maxsplit = match maxsplit {
                Some(n) => expect_int(&n, "")?,
                None => -1,
            };
            Ok(Value::list(split(s, sep.as_ref(), maxsplit)?))
        }
        "splitlines" => {
            check_args(&qualified, &args, 0, 0)?;
            Ok(Value::list(s.lines().map(Value::from).collect()))
        }
        "join" => {
            check_args(&qualified, &args, 1, 1)?;
            let mut parts = Vec::new();
            for (i, item) in args[0].iter()?.enumerate() {
                match item {
                    Value::Str(part) => parts.push(part),
                    other => {
                        return Err(Exception::type_error(format!(
                            "sequence item {}: expected str instance, {} found",
                            i,
                            other.type_name()
                        )))
                    }
                }
            }
            let parts: Vec<&str> = parts.iter().map(|p| &**p).collect();
            Ok(Value::from(parts.join(s)))
        }
        "replace" => {
            check_args(&qualified, &args, 2, 3)?;
            let old = expect_str(&args[0], "replace() argument 1")?;
            let new = expect_str(&args[1], "replace() argument 2")?;
            match args.get(2).map(|n| expect_int(n, "")).transpose()? {
                Some(count) if count >= 0 => Ok(Value::from(s.replacen(old, new, count as usize))),
                _ => Ok(Value::from(s.replace(old, new))),
            }
        }
        "startswith" | "endswith" => {
            check_args(&qualified, &args, 1, 1)?;
            let candidates = match &args[0] {
                Value::Tuple(items) => items.to_vec(),
                other => vec![other.clone()],
            };
            for candidate in &candidates {
                let candidate = expect_str(candidate, &format!("{} first arg", name))?;
                let hit = if name == "startswith" {
                    s.starts_with(candidate)
                } else {
                    s.ends_with(candidate)
                };
                if hit {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        "find" | "rfind" | "index" => {
            check_args(&qualified, &args, 1, 1)?;
            let sub = expect_str(&args[0], "must be str")?;
            let found = if name == "rfind" {
                s.rfind(sub)
            } else {
                s.find(sub)
            };
            match found {
                Some(byte) => Ok(Value::Int(char_index(s, byte))),
                None if name == "index" => Err(Exception::value_error("substring not found")),
                None => Ok(Value::Int(-1)),
            }
        }
        "count" => {
            check_args(&qualified, &args, 1, 1)?;
            let sub = expect_str(&args[0], "must be str")?;
            if sub.is_empty() {
                return Ok(Value::Int(s.chars().count() as i64 + 1));
            }
            Ok(Value::Int(s.matches(sub).count() as i64))
        }
        "isdigit" | "isalpha" | "isalnum" | "isspace" => {
            check_args(&qualified, &args, 0, 0)?;
            let test: fn(char) -> bool = match name {
                "isdigit" => |c: char| c.is_numeric(),
                "isalpha" => |c: char| c.is_alphabetic(),
                "isalnum" => |c: char| c.is_alphanumeric(),
                _ => |c: char| c.is_whitespace(),
            };
            Ok(Value::Bool(!s.is_empty() && s.chars().all(test)))
        }
        "title" | "capitalize" => {
            check_args(&qualified, &args, 0, 0)?;
            let mut out = String::with_capacity(s.len());
            let mut start = true;
            for c in s.chars() {
                if start {
                    out.extend(c.to_uppercase());
                } else {
                    out.extend(c.to_lowercase());
                }
                start = if name == "title" {
                    !c.is_alphabetic()
                } else {
                    false
                };
            }
            Ok(Value::from(out))
        }
        "zfill" => {
            check_args(&qualified, &args, 1, 1)?;
            let width = expect_int(&args[0], "")?.max(0) as usize;
            let len = s.chars().count();
            if len >= width {
                return Ok(Value::from(s));
            }
            let (sign, digits) = match s.chars().next() {
                Some(c @ '+') | Some(c @ '-') => (c.to_string(), &s[1..]),
                _ => (String::new(), s),
            };
            Ok(Value::from(format!("{}{}{}", sign, "0".repeat(width - len), digits)))
        }
        "ljust" | "rjust" | "center" => {
            check_args(&qualified, &args, 1, 2)?;
            let align = match name {
                "ljust" => '<',
                "rjust" => '>',
                _ => '^',
            };
            justify(s, &args, align)
        }
        "format" => Ok(Value::from(str_format(s, &args, &kwargs)?)),
        _ => Err(no_attribute(&Value::from(s), name)),
    }
}

fn list_method(
    interp: &mut Interpreter,
    items: &Rc<RefCell<Vec<Value>>>,
    name: &str,
    mut args: Vec<Value>,
    mut kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    let qualified = format!("list.{}", name);
    if name != "sort" {
        no_kwargs(&qualified, &kwargs)?;
    }

    match name {
        "append" => {
            check_args(&qualified, &args, 1, 1)?;
            items.borrow_mut().push(args.remove(0));
            Ok(Value::None)
        }
        "extend" => {
            check_args(&qualified, &args, 1, 1)?;
            // Materialize first: `a.extend(a)` must not observe its own growth.
            let extra = args[0].to_vec()?;
            items.borrow_mut().extend(extra);
            Ok(Value::None)
        }
        "pop" => {
            check_args(&qualified, &args, 0, 1)?;
            let mut items = items.borrow_mut();
            if items.is_empty() {
                return Err(Exception::index_error("pop from empty list"));
            }
            let len = items.len() as i64;
            let index = match args.get(0) {
                Some(index) => expect_int(index, "")?,
                None => -1,
            };
            let resolved = if index < 0 { index + len } else { index };
            if resolved < 0 || resolved >= len {
                return Err(Exception::index_error("pop index out of range"));
            }
            Ok(items.remove(resolved as usize))
        }
        "insert" => {
            check_args(&qualified, &args, 2, 2)?;
            let value = args.remove(1);
            let index = expect_int(&args[0], "")?;
            let mut items = items.borrow_mut();
            let len = items.len() as i64;
            let resolved = if index < 0 { (index + len).max(0) } else { index.min(len) };
            items.insert(resolved as usize, value);
            Ok(Value::None)
        }
        "remove" => {
            check_args(&qualified, &args, 1, 1)?;
            let position = find(&items.borrow(), &args[0])?;
            match position {
                Some(i) => {
                    items.borrow_mut().remove(i);
                    Ok(Value::None)
                }
                None => Err(Exception::value_error("list.remove(x): x not in list")),
            }
        }
        "index" => {
            check_args(&qualified, &args, 1, 1)?;
            let items = items.borrow();
            match find(&items, &args[0])? {
                Some(i) => Ok(Value::Int(i as i64)),
                None => Err(Exception::value_error(format!(
                    "{} is not in list",
                    args[0].repr()
                ))),
            }
        }
        "count" => {
            check_args(&qualified, &args, 1, 1)?;
            let mut count = 0;
            for x in items.borrow().iter() {
                if x.is(&args[0]) || x.py_eq(&args[0])? {
                    count += 1;
                }
            }
            Ok(Value::Int(count))
        }
        "sort" => {
            check_args(&qualified, &args, 0, 0)?;
            let key = take_kwarg(&mut kwargs, "key");
            let reverse = take_kwarg(&mut kwargs, "reverse").map_or(false, |r| r.truthy());
            no_kwargs(&qualified, &kwargs)?;
            let snapshot = items.borrow().clone();
            let sorted = sort_values(interp, snapshot, key.as_ref(), reverse)?;
            *items.borrow_mut() = sorted;
            Ok(Value::None)
        }
        "reverse" => {
            check_args(&qualified, &args, 0, 0)?;
            items.borrow_mut().reverse();
            Ok(Value::None)
        }
        "copy" => {
            check_args(&qualified, &args, 0, 0)?;
            Ok(Value::list(items.borrow().clone()))
        }
        "clear" => {
            check_args(&qualified, &args, 0, 0)?;
            items.borrow_mut().clear();
            Ok(Value::None)
        }
        _ => Err(Exception::new(
            ExceptionKind::AttributeError,
            format!("'list' object has no attribute '{}'", name),
        )),
    }
}

fn dict_method(
    dict: &Rc<RefCell<Dict>>,
    name: &str,
    mut args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value> {
    let qualified = format!("dict.{}", name);
    if name != "update" {
        no_kwargs(&qualified, &kwargs)?;
    }

    match name {
        "get" => {
            check_args(&qualified, &args, 1, 2)?;
            args[0].check_hashable()?;
            let default = args.get(1).cloned().unwrap_or(Value::None);
            Ok(dict.borrow().get(&args[0]).unwrap_or(default))
        }
        "keys" => {
            check_args(&qualified, &args, 0, 0)?;
            Ok(Value::list(dict.borrow().keys()))
        }
        "values" => {
            check_args(&qualified, &args, 0, 0)?;
            Ok(Value::list(dict.borrow().values()))
        }
        "items" => {
            check_args(&qualified, &args, 0, 0)?;
            Ok(Value::list(dict.borrow().items()))
        }
        "pop" => {
            check_args(&qualified, &args, 1, 2)?;
            args[0].check_hashable()?;
            let removed = dict.borrow_mut().remove(&args[0]);
            match (removed, args.get(1)) {
                (Some(value), _) => Ok(value),
                (None, Some(default)) => Ok(default.clone()),
                (None, None) => Err(Exception::key_error(&args[0])),
            }
        }
        "setdefault" => {
            check_args(&qualified, &args, 1, 2)?;
            let default = args.get(1).cloned().unwrap_or(Value::None);
            let mut dict = dict.borrow_mut();
            match dict.get(&args[0]) {
                Some(value) => Ok(value),
                None => {
                    dict.insert(args.remove(0), default.clone())?;
                    Ok(default)
                }
            }
        }
        "update" => {
            check_args(&qualified, &args, 0, 1)?;
            let mut pairs = Vec::new();
            if let Some(other) = args.get(0) {
                match other {
                    Value::Dict(other) => {
                        let other = other.borrow();
                        pairs.extend(other.keys().into_iter().zip(other.values()));
                    }
                    other => {
                        for (i, item) in other.iter()?.enumerate() {
                            let pair = item.to_vec()?;
                            if pair.len() != 2 {
                                return Err(Exception::value_error(format!(
                                    "dictionary update sequence element #{} has length {}; 2 is required",
                                    i,
                                    pair.len()
                                )));
                            }
                            let mut pair = pair.into_iter();
                            if let (Some(key), Some(value)) = (pair.next(), pair.next()) {
                                pairs.push((key, value));
                            }
                        }
                    }
                }
            }
            pairs.extend(kwargs.into_iter().map(|(key, value)| (Value::from(key), value)));

            let mut dict = dict.borrow_mut();
            for (key, value) in pairs {
                dict.insert(key, value)?;
            }
            Ok(Value::None)
        }
        "copy" => {
            check_args(&qualified, &args, 0, 0)?;
            Ok(Value::dict(dict.borrow().clone()))
        }
        "clear" => {
            check_args(&qualified, &args, 0, 0)?;
            dict.borrow_mut().clear();
            Ok(Value::None)
        }
        _ => Err(Exception::new(
            ExceptionKind::AttributeError,
            format!("'dict' object has no attribute '{}'", name),
        )),
    }
}
