use crate::value::Value;
use std::fmt;

/// Built-in exception classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    Exception,
    ArithmeticError,
    ZeroDivisionError,
    OverflowError,
    LookupError,
    IndexError,
    KeyError,
    NameError,
    UnboundLocalError,
    TypeError,
    ValueError,
    AttributeError,
    SyntaxError,
    IndentationError,
    RuntimeError,
    RecursionError,
    NotImplementedError,
    AssertionError,
    ImportError,
    ModuleNotFoundError,
}

pub static ALL_KINDS: &[ExceptionKind] = &[
    ExceptionKind::Exception,
    ExceptionKind::ArithmeticError,
    ExceptionKind::ZeroDivisionError,
    ExceptionKind::OverflowError,
    ExceptionKind::LookupError,
    ExceptionKind::IndexError,
    ExceptionKind::KeyError,
    ExceptionKind::NameError,
    ExceptionKind::UnboundLocalError,
    ExceptionKind::TypeError,
    ExceptionKind::ValueError,
    ExceptionKind::AttributeError,
    ExceptionKind::SyntaxError,
    ExceptionKind::IndentationError,
    ExceptionKind::RuntimeError,
    ExceptionKind::RecursionError,
    ExceptionKind::NotImplementedError,
    ExceptionKind::AssertionError,
    ExceptionKind::ImportError,
    ExceptionKind::ModuleNotFoundError,
];

impl ExceptionKind {
    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::Exception => "Exception",
            ExceptionKind::ArithmeticError => "ArithmeticError",
            ExceptionKind::ZeroDivisionError => "ZeroDivisionError",
            ExceptionKind::OverflowError => "OverflowError",
            ExceptionKind::LookupError => "LookupError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::KeyError => "KeyError",
            ExceptionKind::NameError => "NameError",
            ExceptionKind::UnboundLocalError => "UnboundLocalError",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::SyntaxError => "SyntaxError",
            ExceptionKind::IndentationError => "IndentationError",
            ExceptionKind::RuntimeError => "RuntimeError",
            ExceptionKind::RecursionError => "RecursionError",
            ExceptionKind::NotImplementedError => "NotImplementedError",
            ExceptionKind::AssertionError => "AssertionError",
            ExceptionKind::ImportError => "ImportError",
            ExceptionKind::ModuleNotFoundError => "ModuleNotFoundError",
        }
    }

    pub fn from_name(name: &str) -> Option<ExceptionKind> {
        ALL_KINDS.iter().copied().find(|kind| kind.name() == name)
    }

    /// The direct base class. `Exception` is the root.
    pub fn parent(self) -> Option<ExceptionKind> {
        match self {
            ExceptionKind::Exception => None,
            ExceptionKind::ZeroDivisionError | ExceptionKind::OverflowError => Some(ExceptionKind::ArithmeticError),
            ExceptionKind::IndexError | ExceptionKind::KeyError => Some(ExceptionKind::LookupError),
            ExceptionKind::UnboundLocalError => Some(ExceptionKind::NameError),
            ExceptionKind::IndentationError => Some(ExceptionKind::SyntaxError),
            ExceptionKind::RecursionError | ExceptionKind::NotImplementedError => Some(ExceptionKind::RuntimeError),
            ExceptionKind::ModuleNotFoundError => Some(ExceptionKind::ImportError),
            _ => Some(ExceptionKind::Exception),
        }
    }

    /// `issubclass(self, base)`.
    pub fn is_subclass_of(self, base: ExceptionKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == base {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

/// A raised exception. Its `Display` is what `str(e)` returns.
#[derive(Debug, Clone)]
pub struct Exception {
    pub kind: ExceptionKind,
    pub message: String,
    /// The constructor arguments of an exception the program created.
    /// `None` when the interpreter raised it: `message` is then the only
    /// argument.
    pub args: Option<Vec<Value>>,
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Exception {
    pub fn new<S: Into<String>>(kind: ExceptionKind, message: S) -> Exception {
        Exception {
            kind,
            message: message.into(),
            args: None,
        }
    }

    /// `ValueError(1, 2)`: the message is derived from the arguments the
    /// way `str()` of the exception shows them.
    pub fn with_args(kind: ExceptionKind, args: Vec<Value>) -> Result<Exception, Exception> {
        let message = match args.as_slice() {
            [] => String::new(),
            [key] if kind == ExceptionKind::KeyError => key.try_repr()?,
            [arg] => arg.try_str()?,
            _ => Value::tuple(args.clone()).try_repr()?,
        };
        Ok(Exception {
            kind,
            message,
            args: Some(args),
        })
    }

    /// `e.args`
    pub fn args(&self) -> Vec<Value> {
        match &self.args {
            Some(args) => args.clone(),
            None if self.message.is_empty() => vec![],
            None => vec![Value::from(self.message.as_str())],
        }
    }

    pub fn type_error<S: Into<String>>(message: S) -> Exception {
        Exception::new(ExceptionKind::TypeError, message)
    }

    pub fn value_error<S: Into<String>>(message: S) -> Exception {
        Exception::new(ExceptionKind::ValueError, message)
    }

    pub fn index_error<S: Into<String>>(message: S) -> Exception {
        Exception::new(ExceptionKind::IndexError, message)
    }

    pub fn zero_division<S: Into<String>>(message: S) -> Exception {
        Exception::new(ExceptionKind::ZeroDivisionError, message)
    }

    pub fn overflow() -> Exception {
        Exception::new(ExceptionKind::OverflowError, "integer overflow")
    }

    /// A missing key. Keys are hashable, so their repr cannot fail.
    pub fn key_error(key: &Value) -> Exception {
        Exception {
            kind: ExceptionKind::KeyError,
            message: key.repr(),
            args: Some(vec![key.clone()]),
        }
    }

    pub fn name_error(name: &str) -> Exception {
        Exception::new(ExceptionKind::NameError, format!("name '{}' is not defined", name))
    }

    pub fn syntax_error(message: &str, line: usize) -> Exception {
        Exception::new(ExceptionKind::SyntaxError, format!("{} (<string>, line {})", message, line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy() {
        assert!(ExceptionKind::ZeroDivisionError.is_subclass_of(ExceptionKind::ArithmeticError));
        assert!(ExceptionKind::ZeroDivisionError.is_subclass_of(ExceptionKind::Exception));
        assert!(ExceptionKind::KeyError.is_subclass_of(ExceptionKind::LookupError));
        assert!(!ExceptionKind::KeyError.is_subclass_of(ExceptionKind::IndexError));
        assert!(!ExceptionKind::Exception.is_subclass_of(ExceptionKind::ValueError));
        assert!(ExceptionKind::IndentationError.is_subclass_of(ExceptionKind::SyntaxError));
    }

    #[test]
    fn arguments() {
        let exc = Exception::with_args(ExceptionKind::ValueError, vec![Value::Int(1), Value::from("a")])
            .unwrap();
        assert_eq!(exc.message, "(1, 'a')");
        assert_eq!(Value::tuple(exc.args()).repr(), "(1, 'a')");

        let exc = Exception::with_args(ExceptionKind::KeyError, vec![Value::from("k")]).unwrap();
        assert_eq!(exc.to_string(), "'k'");
        assert_eq!(Value::tuple(exc.args()).repr(), "('k',)");

        let exc = Exception::with_args(ExceptionKind::ValueError, vec![Value::Int(7)]).unwrap();
        assert_eq!(exc.message, "7");
        assert_eq!(Value::tuple(exc.args()).repr(), "(7,)");

        assert_eq!(Value::tuple(Exception::value_error("bad").args()).repr(), "('bad',)");
        assert!(Exception::new(ExceptionKind::ValueError, "").args().is_empty());

        let exc = Exception::key_error(&Value::Int(3));
        assert_eq!(exc.message, "3");
        assert_eq!(Value::tuple(exc.args()).repr(), "(3,)");
    }

    #[test]
    fn names_round_trip() {
        for kind in ALL_KINDS {
            assert_eq!(ExceptionKind::from_name(kind.name()), Some(*kind));
        }
        assert_eq!(ExceptionKind::from_name("print"), None);
    }

    #[test]
    fn display_is_the_message() {
        let err = Exception::zero_division("division by zero");
        assert_eq!(err.to_string(), "division by zero");
    }
}
