use crate::ast::{FunctionDef, Program};
use crate::builtins;
use crate::exception::{Exception, ExceptionKind};
use crate::methods;
use crate::modules;
use crate::oops::OopsExt;
use crate::value::{Function, Value};
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

/// Calls nested deeper than this raise `RecursionError`.
pub const RECURSION_LIMIT: usize = 1000;

/// How a statement finished.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

#[derive(Default)]
struct Frame {
    /// `None` for the module level.
    def: Option<Rc<FunctionDef>>,
    locals: HashMap<String, Value>,
    /// Comprehension scopes, innermost last.
    comps: Vec<HashMap<String, Value>>,
}

pub struct Interpreter<'a> {
    globals: HashMap<String, Value>,
    top: Frame,
    frames: Vec<Frame>,
    /// Exceptions being handled by `except` blocks, for bare `raise`.
    pub(crate) handling: Vec<Exception>,
    modules: HashMap<&'static str, Value>,
    argv: Value,
    out: &'a mut dyn Write,
}

impl<'a> Interpreter<'a> {
    pub fn new(argv: &[String], out: &'a mut dyn Write) -> Interpreter<'a> {
        let mut globals = HashMap::new();
        globals.insert("__name__".to_owned(), Value::from("__main__"));

        Interpreter {
            globals,
            top: Frame::default(),
            frames: Vec::new(),
            handling: Vec::new(),
            modules: HashMap::new(),
            argv: Value::list(argv.iter().map(|arg| Value::from(arg.as_str())).collect()),
            out,
        }
    }

    pub fn run(&mut self, program: &Program) -> Result<(), Exception> {
        self.exec_block(&program.body)?;
        Ok(())
    }

    /// Writes program output. A closed stdout is not the program's problem.
    pub fn write(&mut self, text: &str) {
        self.out
            .write_all(text.as_bytes())
            .oops("write program output");
    }

    pub fn flush(&mut self) {
        self.out.flush().oops("flush program output");
    }

    fn frame(&self) -> &Frame {
        self.frames.last().unwrap_or(&self.top)
    }

    fn frame_mut(&mut self) -> &mut Frame {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => &mut self.top,
        }
    }

    pub fn lookup(&self, name: &str) -> Result<Value, Exception> {
        let frame = self.frame();
        for scope in frame.comps.iter().rev() {
            if let Some(value) = scope.get(name) {
                return Ok(value.clone());
            }
        }

        if let Some(def) = &frame.def {
            if def.locals.contains(name) {
                return frame.locals.get(name).cloned().ok_or_else(|| {
                    Exception::new(
                        ExceptionKind::UnboundLocalError,
                        format!(
                            "cannot access local variable '{}' where it is not associated with a value",
                            name
                        ),
                    )
                });
            }
        }

        if let Some(value) = self.globals.get(name) {
            return Ok(value.clone());
        }

        builtins::lookup(name).ok_or_else(|| Exception::name_error(name))
    }

    pub fn assign_name(&mut self, name: &str, value: Value) {
        let frame = self.frame_mut();
        if let Some(scope) = frame.comps.last_mut() {
            scope.insert(name.to_owned(), value);
            return;
        }

        if let Some(def) = &frame.def {
            if def.locals.contains(name) {
                frame.locals.insert(name.to_owned(), value);
                return;
            }
        }

        self.globals.insert(name.to_owned(), value);
    }

    pub fn delete_name(&mut self, name: &str) -> Result<(), Exception> {
        let frame = self.frame_mut();
        if let Some(def) = &frame.def {
            if def.locals.contains(name) {
                return match frame.locals.remove(name) {
                    Some(_) => Ok(()),
                    None => Err(Exception::new(
                        ExceptionKind::UnboundLocalError,
                        format!(
                            "cannot access local variable '{}' where it is not associated with a value",
                            name
                        ),
                    )),
                };
            }
        }

        match self.globals.remove(name) {
            Some(_) => Ok(()),
            None => Err(Exception::name_error(name)),
        }
    }

    pub fn push_comp_scope(&mut self) {
        self.frame_mut().comps.push(HashMap::new());
    }

    pub fn pop_comp_scope(&mut self) {
        self.frame_mut().comps.pop();
    }

    pub fn import(&mut self, name: &str) -> Result<Value, Exception> {
        if let Some(module) = self.modules.get(name) {
            return Ok(module.clone());
        }

        let module = modules::load(name, &self.argv).ok_or_else(|| {
            Exception::new(
                ExceptionKind::ModuleNotFoundError,
                format!("No module named '{}'", name),
            )
        })?;

        trace!("import: {}", name);
        let key = module.name;
        let module = Value::Module(Rc::new(module));
        self.modules.insert(key, module.clone());
        Ok(module)
    }

    pub fn call(
        &mut self,
        func: &Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, Exception> {
        match func {
            Value::Function(func) => self.call_function(func.clone(), args, kwargs),
            Value::Builtin(builtin) => (builtin.func)(self, args, kwargs),
            Value::Method(method) => {
                methods::call(self, &method.receiver, &method.name, args, kwargs)
            }
            Value::ExceptionClass(kind) => {
                if !kwargs.is_empty() {
                    return Err(Exception::type_error(format!(
                        "{}() takes no keyword arguments",
                        kind.name()
                    )));
                }
                Ok(Value::Exception(Rc::new(Exception::with_args(*kind, args)?)))
            }
            _ => Err(Exception::type_error(format!(
                "'{}' object is not callable",
                func.type_name()
            ))),
        }
    }

    fn call_function(
        &mut self,
        func: Rc<Function>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, Exception> {
        let def = func.def.clone();
        let locals = bind_arguments(&func, args, kwargs)?;

        if self.frames.len() >= RECURSION_LIMIT {
            return Err(Exception::new(
                ExceptionKind::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }

        self.frames.push(Frame {
            def: Some(def.clone()),
            locals,
            comps: Vec::new(),
        });
        let result = self.exec_block(&def.body);
        self.frames.pop();

        match result? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::None),
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Matches call arguments to parameters.
fn bind_arguments(
    func: &Function,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<HashMap<String, Value>, Exception> {
    let def = &func.def;
    let params = &def.params;

    if args.len() > params.len() {
        let required = func.defaults.iter().filter(|d| d.is_none()).count();
        let takes = if required == params.len() {
            format!("{} positional argument{}", params.len(), plural(params.len()))
        } else {
            format!("from {} to {} positional arguments", required, params.len())
        };
        return Err(Exception::type_error(format!(
            "{}() takes {} but {} {} given",
            def.name,
            takes,
            args.len(),
            if args.len() == 1 { "was" } else { "were" }
        )));
    }

    let mut slots: Vec<Option<Value>> = vec![None; params.len()];
    for (slot, arg) in slots.iter_mut().zip(args) {
        *slot = Some(arg);
    }

    for (key, value) in kwargs {
        match params.iter().position(|p| p.name == key) {
            Some(i) if slots[i].is_some() => {
                return Err(Exception::type_error(format!(
                    "{}() got multiple values for argument '{}'",
                    def.name, key
                )));
            }
            Some(i) => slots[i] = Some(value),
            None => {
                return Err(Exception::type_error(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    def.name, key
                )));
            }
        }
    }

    let mut missing = Vec::new();
    for (i, slot) in slots.iter_mut().enumerate() {
        if slot.is_none() {
            match &func.defaults[i] {
                Some(default) => *slot = Some(default.clone()),
                None => missing.push(format!("'{}'", params[i].name)),
            }
        }
    }

    if !missing.is_empty() {
        let names = match missing.len() {
            1 => missing[0].clone(),
            2 => format!("{} and {}", missing[0], missing[1]),
            n => format!("{}, and {}", missing[..n - 1].join(", "), missing[n - 1]),
        };
        return Err(Exception::type_error(format!(
            "{}() missing {} required positional argument{}: {}",
            def.name,
            missing.len(),
            plural(missing.len()),
            names
        )));
    }

    Ok(params
        .iter()
        .zip(slots)
        .filter_map(|(param, slot)| slot.map(|value| (param.name.clone(), value)))
        .collect())
}
