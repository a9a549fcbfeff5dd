use crate::ast::FunctionDef;
use crate::exception::{Exception, ExceptionKind};
use crate::format::float_repr;
use crate::interpreter::Interpreter;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// How deep `==`, ordering and `repr` follow containers nested in
/// containers before giving up with `RecursionError`.
pub const MAX_DEPTH: usize = 1000;

fn too_deep(what: &str) -> Exception {
    Exception::new(
        ExceptionKind::RecursionError,
        format!("maximum recursion depth exceeded {}", what),
    )
}

pub type BuiltinFn =
    fn(&mut Interpreter, Vec<Value>, Vec<(String, Value)>) -> Result<Value, Exception>;

pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
    /// `int`, `str`, ... are classes: `type(1) is int`.
    pub class: bool,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

/// A user-defined function (`def` or `lambda`) with its evaluated defaults.
#[derive(Debug)]
pub struct Function {
    pub def: Rc<FunctionDef>,
    /// One slot per parameter.
    pub defaults: Vec<Option<Value>>,
}

/// `receiver.name` waiting to be called.
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub name: String,
}

#[derive(Debug)]
pub struct Module {
    pub name: &'static str,
    pub attrs: BTreeMap<&'static str, Value>,
}

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<Vec<Value>>),
    Dict(Rc<RefCell<Dict>>),
    Range { start: i64, stop: i64, step: i64 },
    Function(Rc<Function>),
    Builtin(&'static Builtin),
    Method(Rc<BoundMethod>),
    Module(Rc<Module>),
    ExceptionClass(ExceptionKind),
    Exception(Rc<Exception>),
    /// A type with no constructor, e.g. `type(None)`.
    Type(&'static str),
}

impl Value {
    pub fn str<S: Into<Rc<str>>>(s: S) -> Value {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::new(items))
    }

    pub fn dict(dict: Dict) -> Value {
        Value::Dict(Rc::new(RefCell::new(dict)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Range { .. } => "range",
            Value::Function(_) => "function",
            Value::Builtin(b) if b.class => "type",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Method(method) if matches!(method.receiver, Value::Builtin(_)) => {
                "method_descriptor"
            }
            Value::Method(_) => "builtin_function_or_method",
            Value::Module(_) => "module",
            Value::ExceptionClass(_) | Value::Type(_) => "type",
            Value::Exception(exc) => exc.kind.name(),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Tuple(items) => !items.is_empty(),
            Value::Dict(dict) => !dict.borrow().is_empty(),
            Value::Range { .. } => self.len().unwrap_or(0) > 0,
            _ => true,
        }
    }

    /// `int` view of a `bool` or an `int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.borrow().len()),
            Value::Tuple(items) => Some(items.len()),
            Value::Dict(dict) => Some(dict.borrow().len()),
            Value::Range { start, stop, step } => Some(range_len(*start, *stop, *step)),
            _ => None,
        }
    }

    pub fn iter(&self) -> Result<ValueIter, Exception> {
        match self {
            Value::List(items) => Ok(ValueIter::List {
                items: items.clone(),
                index: 0,
            }),
            Value::Tuple(items) => Ok(ValueIter::Values(items.to_vec().into_iter())),
            Value::Str(s) => Ok(ValueIter::Values(
                s.chars()
                    .map(|c| Value::str(c.to_string()))
                    .collect::<Vec<_>>()
                    .into_iter(),
            )),
            Value::Dict(dict) => Ok(ValueIter::Values(dict.borrow().keys().into_iter())),
            Value::Range { start, stop, step } => Ok(ValueIter::Range {
                next: *start,
                stop: *stop,
                step: *step,
            }),
            _ => Err(Exception::type_error(format!(
                "'{}' object is not iterable",
                self.type_name()
            ))),
        }
    }

    pub fn to_vec(&self) -> Result<Vec<Value>, Exception> {
        Ok(self.iter()?.collect())
    }

    /// Dict keys must be immutable all the way down.
    pub fn check_hashable(&self) -> Result<(), Exception> {
        self.check_hashable_at(0)
    }

    fn check_hashable_at(&self, depth: usize) -> Result<(), Exception> {
        match self {
            Value::List(_) | Value::Dict(_) => Err(Exception::type_error(format!(
                "unhashable type: '{}'",
                self.type_name()
            ))),
            Value::Tuple(_) if depth >= MAX_DEPTH => Err(too_deep("while hashing an object")),
            Value::Tuple(items) => items
                .iter()
                .try_for_each(|item| item.check_hashable_at(depth + 1)),
            _ => Ok(()),
        }
    }

    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
            (Value::ExceptionClass(a), Value::ExceptionClass(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            _ => false,
        }
    }

    /// `==`. Fails only on containers nested too deep, such as two lists
    /// that each contain themselves.
    pub fn py_eq(&self, other: &Value) -> Result<bool, Exception> {
        self.eq_at(other, 0)
    }

    fn eq_at(&self, other: &Value, depth: usize) -> Result<bool, Exception> {
        if self.is(other) {
            return Ok(!matches!(self, Value::Float(n) if n.is_nan()));
        }

        match (self, other) {
            (Value::List(_), Value::List(_))
            | (Value::Tuple(_), Value::Tuple(_))
            | (Value::Dict(_), Value::Dict(_))
                if depth >= MAX_DEPTH =>
            {
                Err(too_deep("in comparison"))
            }
            (Value::Str(a), Value::Str(b)) => Ok(a == b),
            (Value::List(a), Value::List(b)) => seq_eq(&a.borrow(), &b.borrow(), depth + 1),
            (Value::Tuple(a), Value::Tuple(b)) => seq_eq(a, b, depth + 1),
            (Value::Dict(a), Value::Dict(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (key, value) in &a.entries {
                    match b.get(key) {
                        Some(other) if value.is(&other) || value.eq_at(&other, depth + 1)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            (
                Value::Range { start, step, .. },
                Value::Range {
                    start: other_start,
                    step: other_step,
                    ..
                },
            ) => {
                let len = self.len();
                Ok(len == other.len()
                    && (len == Some(0)
                        || start == other_start && (len == Some(1) || step == other_step)))
            }
            (Value::Method(a), Value::Method(b)) => {
                Ok(a.name == b.name && a.receiver.is(&b.receiver))
            }
            _ => Ok(match (self.as_int(), other.as_int()) {
                (Some(a), Some(b)) => a == b,
                _ => match (self.as_float(), other.as_float()) {
                    (Some(a), Some(b)) => int_float_eq(self, other, a, b),
                    _ => false,
                },
            }),
        }
    }

    /// Ordering for `<` and friends. `Ok(None)` means the values are
    /// unordered (NaN), errors mean the types cannot be compared.
    pub fn py_cmp(&self, other: &Value, op: &str) -> Result<Option<Ordering>, Exception> {
        self.cmp_at(other, op, 0)
    }

    fn cmp_at(&self, other: &Value, op: &str, depth: usize) -> Result<Option<Ordering>, Exception> {
        match (self, other) {
            (Value::List(_), Value::List(_)) | (Value::Tuple(_), Value::Tuple(_))
                if depth >= MAX_DEPTH =>
            {
                Err(too_deep("in comparison"))
            }
            (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
            (Value::List(a), Value::List(b)) => {
                let (a, b) = (a.borrow().clone(), b.borrow().clone());
                seq_cmp(&a, &b, op, depth + 1)
            }
            (Value::Tuple(a), Value::Tuple(b)) => seq_cmp(a, b, op, depth + 1),
            _ => match (self.as_int(), other.as_int()) {
                (Some(a), Some(b)) => Ok(Some(a.cmp(&b))),
                _ => match (self.as_float(), other.as_float()) {
                    (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
                    _ => Err(Exception::type_error(format!(
                        "'{}' not supported between instances of '{}' and '{}'",
                        op,
                        self.type_name(),
                        other.type_name()
                    ))),
                },
            },
        }
    }

    /// `repr(value)` for messages. Containers nested too deep are cut
    /// short with `...`; `try_repr` reports them instead.
    pub fn repr(&self) -> String {
        let mut s = String::new();
        if self.write_repr(&mut s, &mut Vec::new()).is_err() {
            s.push_str("...");
        }
        s
    }

    /// `repr(value)` as a program sees it.
    pub fn try_repr(&self) -> Result<String, Exception> {
        let mut s = String::new();
        self.write_repr(&mut s, &mut Vec::new())?;
        Ok(s)
    }

    /// `str(value)` as a program sees it.
    pub fn try_str(&self) -> Result<String, Exception> {
        match self {
            Value::Str(_) | Value::Exception(_) => Ok(self.to_string()),
            _ => self.try_repr(),
        }
    }

    /// `seen` holds the containers currently being printed so that a list
    /// containing itself prints as `[...]`.
    fn write_repr(&self, s: &mut String, seen: &mut Vec<usize>) -> Result<(), Exception> {
        match self {
            Value::List(_) | Value::Tuple(_) | Value::Dict(_) if seen.len() >= MAX_DEPTH => {
                return Err(too_deep("while getting the repr of an object"));
            }
            Value::None => s.push_str("None"),
            Value::Bool(true) => s.push_str("True"),
            Value::Bool(false) => s.push_str("False"),
            Value::Int(n) => s.push_str(&n.to_string()),
            Value::Float(n) => s.push_str(&float_repr(*n)),
            Value::Str(text) => s.push_str(&str_repr(text)),
            Value::List(items) => {
                let id = Rc::as_ptr(items) as *const u8 as usize;
                if seen.contains(&id) {
                    s.push_str("[...]");
                    return Ok(());
                }
                seen.push(id);
                s.push('[');
                write_items(&items.borrow(), s, seen)?;
                s.push(']');
                seen.pop();
            }
            Value::Tuple(items) => {
                // Tuples cannot contain themselves but still count as a level.
                seen.push(Rc::as_ptr(items) as *const u8 as usize);
                s.push('(');
                write_items(items, s, seen)?;
                seen.pop();
                if items.len() == 1 {
                    s.push(',');
                }
                s.push(')');
            }
            Value::Dict(dict) => {
                let id = Rc::as_ptr(dict) as *const u8 as usize;
                if seen.contains(&id) {
                    s.push_str("{...}");
                    return Ok(());
                }
                seen.push(id);
                s.push('{');
                for (i, (key, value)) in dict.borrow().entries.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    key.write_repr(s, seen)?;
                    s.push_str(": ");
                    value.write_repr(s, seen)?;
                }
                s.push('}');
                seen.pop();
            }
            Value::Range { start, stop, step } => {
                if *step == 1 {
                    s.push_str(&format!("range({}, {})", start, stop));
                } else {
                    s.push_str(&format!("range({}, {}, {})", start, stop, step));
                }
            }
            Value::Function(func) => {
                s.push_str(&format!("<function {}>", func.def.name));
            }
            Value::Builtin(b) if b.class => s.push_str(&format!("<class '{}'>", b.name)),
            Value::Builtin(b) => s.push_str(&format!("<built-in function {}>", b.name)),
            Value::Method(method) => match &method.receiver {
                Value::Builtin(class) => s.push_str(&format!(
                    "<method '{}' of '{}' objects>",
                    method.name, class.name
                )),
                receiver => s.push_str(&format!(
                    "<built-in method {} of {} object>",
                    method.name,
                    receiver.type_name()
                )),
            },
            Value::Module(module) => s.push_str(&format!("<module '{}'>", module.name)),
            Value::ExceptionClass(kind) => s.push_str(&format!("<class '{}'>", kind.name())),
            Value::Type(name) => s.push_str(&format!("<class '{}'>", name)),
            Value::Exception(exc) => {
                s.push_str(exc.kind.name());
                s.push('(');
                write_items(&exc.args(), s, seen)?;
                s.push(')');
            }
        }
        Ok(())
    }
}

/// `str(value)`
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Exception(exc) => write!(f, "{}", exc.message),
            _ => write!(f, "{}", self.repr()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(s.into())
    }
}

fn write_items(items: &[Value], s: &mut String, seen: &mut Vec<usize>) -> Result<(), Exception> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            s.push_str(", ");
        }
        item.write_repr(s, seen)?;
    }
    Ok(())
}

fn int_float_eq(lhs: &Value, rhs: &Value, a: f64, b: f64) -> bool {
    // Compare exactly when one side is an int that does not fit in a float.
    match (lhs, rhs) {
        (Value::Int(n), Value::Float(f)) | (Value::Float(f), Value::Int(n)) => {
            f.fract() == 0.0 && *f >= -9.223_372_036_854_776e18 && *f < 9.223_372_036_854_776e18 && *f as i64 == *n
        }
        _ => a == b,
    }
}

/// The first position holding `item` (by identity, then `==`).
pub fn find(items: &[Value], item: &Value) -> Result<Option<usize>, Exception> {
    for (i, x) in items.iter().enumerate() {
        if x.is(item) || x.py_eq(item)? {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

fn seq_eq(a: &[Value], b: &[Value], depth: usize) -> Result<bool, Exception> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (x, y) in a.iter().zip(b) {
        if !(x.is(y) || x.eq_at(y, depth)?) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn seq_cmp(a: &[Value], b: &[Value], op: &str, depth: usize) -> Result<Option<Ordering>, Exception> {
    for (x, y) in a.iter().zip(b) {
        if !(x.is(y) || x.eq_at(y, depth)?) {
            return x.cmp_at(y, op, depth);
        }
    }
    Ok(Some(a.len().cmp(&b.len())))
}

/// The number of items in a range. Up to `2**64 - 1`, so it may not fit
/// an `int`.
pub fn range_len(start: i64, stop: i64, step: i64) -> usize {
    let (start, stop, step) = (start as i128, stop as i128, step as i128);
    let len = if step > 0 && start < stop {
        (stop - start + step - 1) / step
    } else if step < 0 && start > stop {
        (start - stop - step - 1) / -step
    } else {
        0
    };
    len as usize
}

/// Quotes like the host language: single quotes unless the text contains a
/// single quote and no double quote.
pub fn str_repr(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut s = String::with_capacity(text.len() + 2);
    s.push(quote);
    for ch in text.chars() {
        match ch {
            '\\' => s.push_str("\\\\"),
            '\n' => s.push_str("\\n"),
            '\r' => s.push_str("\\r"),
            '\t' => s.push_str("\\t"),
            c if c == quote => {
                s.push('\\');
                s.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => s.push_str(&format!("\\x{:02x}", c as u32)),
            c => s.push(c),
        }
    }
    s.push(quote);
    s
}

/// An insertion-ordered mapping. Keys are compared with `==`, so lookups
/// are linear; the dicts a command-line snippet builds are small.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
}

impl Dict {
    pub fn new() -> Dict {
        Dict::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &Value) -> Option<usize> {
        // Keys pass `check_hashable`, which bounds how deep they nest, so
        // comparing them cannot fail.
        self.entries
            .iter()
            .position(|(k, _)| k.is(key) || k.py_eq(key).unwrap_or(false))
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.position(key).map(|i| self.entries[i].1.clone())
    }

    pub fn contains(&self, key: &Value) -> bool {
        self.position(key).is_some()
    }

    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), Exception> {
        key.check_hashable()?;
        match self.position(&key) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((key, value)),
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> Vec<Value> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn items(&self) -> Vec<Value> {
        self.entries
            .iter()
            .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
            .collect()
    }
}

/// Iteration over a value. Lists are walked by index so that appending
/// while looping behaves like the host language.
pub enum ValueIter {
    List {
        items: Rc<RefCell<Vec<Value>>>,
        index: usize,
    },
    Values(std::vec::IntoIter<Value>),
    Range {
        next: i64,
        stop: i64,
        step: i64,
    },
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            ValueIter::List { items, index } => {
                let item = items.borrow().get(*index).cloned();
                *index += 1;
                item
            }
            ValueIter::Values(values) => values.next(),
            ValueIter::Range { next, stop, step } => {
                let done = if *step > 0 { *next >= *stop } else { *next <= *stop };
                if done {
                    return None;
                }
                let current = *next;
                match next.checked_add(*step) {
                    Some(n) => *next = n,
                    None => *next = *stop,
                }
                Some(Value::Int(current))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reprs() {
        assert_eq!(Value::None.repr(), "None");
        assert_eq!(Value::Float(1.0).repr(), "1.0");
        assert_eq!(Value::from("it's").repr(), "\"it's\"");
        assert_eq!(Value::from("a\nb").repr(), "'a\\nb'");
        assert_eq!(
            Value::list(vec![Value::Int(1), Value::from("x"), Value::None]).repr(),
            "[1, 'x', None]"
        );
        assert_eq!(Value::tuple(vec![Value::Int(1)]).repr(), "(1,)");
        assert_eq!(Value::tuple(vec![]).repr(), "()");
        assert_eq!(
            Value::Range {
                start: 0,
                stop: 5,
                step: 1
            }
            .repr(),
            "range(0, 5)"
        );

        let mut dict = Dict::new();
        dict.insert(Value::from("k"), Value::Bool(true)).unwrap();
        assert_eq!(Value::dict(dict).repr(), "{'k': True}");
    }

    #[test]
    fn recursive_list_repr() {
        assert_eq!(containing_itself().repr(), "[1, [...]]");
    }

    #[test]
    fn str_is_not_repr() {
        assert_eq!(Value::from("hi").to_string(), "hi");
        assert_eq!(Value::list(vec![Value::from("hi")]).to_string(), "['hi']");
    }

    #[test]
    fn equality() {
        let eq = |a: Value, b: Value| a.py_eq(&b).unwrap();
        assert!(eq(Value::Int(1), Value::Float(1.0)));
        assert!(eq(Value::Bool(true), Value::Int(1)));
        assert!(!eq(Value::Int(1), Value::from("1")));
        assert!(!eq(Value::Float(f64::NAN), Value::Float(f64::NAN)));
        assert!(eq(Value::list(vec![Value::Int(1)]), Value::list(vec![Value::Float(1.0)])));
        assert!(!eq(Value::list(vec![]), Value::tuple(vec![])));
        assert!(eq(Value::Int(i64::MAX), Value::Int(i64::MAX)));
        assert!(!eq(Value::Int(i64::MAX), Value::Float(9.223372036854775807e18)));

        let range = |start, stop, step| Value::Range { start, stop, step };
        assert!(eq(range(0, 3, 1), range(0, 3, 1)));
        assert!(eq(range(0, 0, 1), range(5, 2, 3)));
        assert!(eq(range(1, 2, 1), range(1, 9, 10)));
        assert!(!eq(range(0, 4, 2), range(0, 4, 1)));
        assert!(eq(range(i64::MIN, i64::MAX, 1), range(i64::MIN, i64::MAX, 1)));
    }

    fn containing_itself() -> Value {
        let list = Value::list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        list
    }

    fn nested(depth: usize, wrap: fn(Value) -> Value) -> Value {
        let mut value = Value::Int(0);
        for _ in 0..depth {
            value = wrap(value);
        }
        value
    }

    #[test]
    fn deep_comparisons() {
        crate::exec::spawn(|| {
            let (a, b) = (containing_itself(), containing_itself());
            assert!(a.py_eq(&a).unwrap());
            let err = a.py_eq(&b).unwrap_err();
            assert_eq!(err.kind, ExceptionKind::RecursionError);
            assert_eq!(err.message, "maximum recursion depth exceeded in comparison");
            assert_eq!(
                a.py_cmp(&b, "<").unwrap_err().kind,
                ExceptionKind::RecursionError
            );

            let list = |v| Value::list(vec![v]);
            assert!(nested(100, list).py_eq(&nested(100, list)).unwrap());
            assert!(nested(5000, list).py_eq(&nested(5000, list)).is_err());
        })
        .unwrap();
    }

    #[test]
    fn deep_reprs() {
        crate::exec::spawn(|| {
            let list = |v| Value::list(vec![v]);
            let tuple = |v| Value::tuple(vec![v]);
            assert_eq!(nested(2, list).try_repr().unwrap(), "[[0]]");
            assert_eq!(
                nested(5000, list).try_repr().unwrap_err().message,
                "maximum recursion depth exceeded while getting the repr of an object"
            );
            assert!(nested(5000, tuple).try_str().is_err());
            assert!(nested(5000, list).repr().ends_with("..."));
            assert_eq!(containing_itself().try_repr().unwrap(), "[1, [...]]");

            assert!(nested(10, tuple).check_hashable().is_ok());
            assert_eq!(
                nested(5000, tuple).check_hashable().unwrap_err().kind,
                ExceptionKind::RecursionError
            );
        })
        .unwrap();
    }

    #[test]
    fn huge_ranges() {
        assert_eq!(range_len(i64::MIN, i64::MAX, 1), u64::MAX as usize);
        assert_eq!(range_len(0, 10, 3), 4);
        assert_eq!(range_len(10, 0, -3), 4);
        assert_eq!(range_len(0, 10, -1), 0);
    }

    #[test]
    fn ordering() {
        assert_eq!(
            Value::Int(1).py_cmp(&Value::Float(1.5), "<").unwrap(),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::tuple(vec![Value::Int(1), Value::Int(2)])
                .py_cmp(&Value::tuple(vec![Value::Int(1)]), "<")
                .unwrap(),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Int(1).py_cmp(&Value::from("a"), "<").unwrap_err().message,
            "'<' not supported between instances of 'int' and 'str'"
        );
    }

    #[test]
    fn ranges() {
        assert_eq!(range_len(0, 10, 3), 4);
        assert_eq!(range_len(10, 0, -3), 4);
        assert_eq!(range_len(0, 0, 1), 0);
        assert_eq!(range_len(5, 0, 1), 0);
        let items: Vec<i64> = Value::Range {
            start: 10,
            stop: 0,
            step: -4,
        }
        .iter()
        .unwrap()
        .filter_map(|v| v.as_int())
        .collect();
        assert_eq!(items, vec![10, 6, 2]);
    }

    #[test]
    fn dict_keys() {
        let mut dict = Dict::new();
        dict.insert(Value::Int(1), Value::from("a")).unwrap();
        dict.insert(Value::Float(1.0), Value::from("b")).unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(&Value::Bool(true)).unwrap().to_string(), "b");
        assert_eq!(
            dict.insert(Value::list(vec![]), Value::None).unwrap_err().message,
            "unhashable type: 'list'"
        );
    }

    #[test]
    fn truthiness() {
        assert!(!Value::from("").truthy());
        assert!(Value::from("0").truthy());
        assert!(!Value::Float(0.0).truthy());
        assert!(!Value::list(vec![]).truthy());
        assert!(Value::tuple(vec![Value::None]).truthy());
    }
}
