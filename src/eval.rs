use crate::ast::*;
use crate::exception::{Exception, ExceptionKind};
use crate::format::format_value;
use crate::interpreter::{Flow, Interpreter};
use crate::methods;
use crate::ops;
use crate::value::{Dict, Function, Value};
use std::rc::Rc;

type Result<I> = std::result::Result<I, Exception>;

impl<'a> Interpreter<'a> {
    pub fn exec_block(&mut self, body: &[Stmt]) -> Result<Flow> {
        for stmt in body {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }
            StmtKind::AugAssign { target, op, value } => self.exec_aug_assign(target, *op, value)?,
            StmtKind::If { branches, orelse } => {
                for (cond, body) in branches {
                    if self.eval(cond)?.truthy() {
                        return self.exec_block(body);
                    }
                }
                return self.exec_block(orelse);
            }
            StmtKind::While { cond, body, orelse } => {
                while self.eval(cond)?.truthy() {
                    match self.exec_block(body)? {
                        Flow::Break => return Ok(Flow::Normal),
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                return self.exec_block(orelse);
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                let iterable = self.eval(iter)?;
                for item in iterable.iter()? {
                    self.assign(target, item)?;
                    match self.exec_block(body)? {
                        Flow::Break => return Ok(Flow::Normal),
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                return self.exec_block(orelse);
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => return self.exec_try(body, handlers, orelse, finalbody),
            StmtKind::FunctionDef(def) => {
                let func = self.make_function(def)?;
                self.assign_name(&def.name, func);
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Raise(value) => return Err(self.exec_raise(value.as_ref())?),
            StmtKind::Assert { test, msg } => {
                if !self.eval(test)?.truthy() {
                    let args = match msg {
                        Some(msg) => vec![self.eval(msg)?],
                        None => vec![],
                    };
                    return Err(Exception::with_args(ExceptionKind::AssertionError, args)?);
                }
            }
            StmtKind::Delete(targets) => {
                for target in targets {
                    self.delete(target)?;
                }
            }
            StmtKind::Global(_) | StmtKind::Pass => {}
            StmtKind::Import(imports) => {
                for (name, alias) in imports {
                    let module = self.import(name)?;
                    self.assign_name(alias.as_ref().unwrap_or(name), module);
                }
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
        }

        Ok(Flow::Normal)
    }

    fn exec_aug_assign(&mut self, target: &Target, op: BinOp, value: &Expr) -> Result<()> {
        match target {
            Target::Name(name) => {
                let current = self.lookup(name)?;
                let rhs = self.eval(value)?;
                let updated = self.inplace(op, current, &rhs)?;
                self.assign_name(name, updated);
            }
            Target::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                let current = ops::get_item(&object, &index)?;
                let rhs = self.eval(value)?;
                let updated = self.inplace(op, current, &rhs)?;
                ops::set_item(&object, &index, updated)?;
            }
            Target::Tuple(_) => unreachable!(),
        }
        Ok(())
    }

    /// `lhs op= rhs`. Lists are extended in place.
    fn inplace(&mut self, op: BinOp, lhs: Value, rhs: &Value) -> Result<Value> {
        match (op, &lhs) {
            (BinOp::Add, Value::List(items)) => {
                let extra = rhs.to_vec()?;
                items.borrow_mut().extend(extra);
                Ok(lhs)
            }
            (BinOp::Mul, Value::List(items)) => match rhs.as_int() {
                Some(times) => {
                    let repeated = ops::repeat(&items.borrow(), times)?;
                    *items.borrow_mut() = repeated;
                    Ok(lhs)
                }
                None => ops::binary(op, &lhs, rhs),
            },
            _ => ops::binary(op, &lhs, rhs),
        }
    }

    fn exec_try(
        &mut self,
        body: &[Stmt],
        handlers: &[ExceptHandler],
        orelse: &[Stmt],
        finalbody: &[Stmt],
    ) -> Result<Flow> {
        let result = match self.exec_block(body) {
            Ok(Flow::Normal) => self.exec_block(orelse),
            Ok(flow) => Ok(flow),
            Err(exc) => self.handle(exc, handlers),
        };

        if finalbody.is_empty() {
            return result;
        }

        match self.exec_block(finalbody)? {
            Flow::Normal => result,
            flow => Ok(flow),
        }
    }

    /// Runs the first handler matching `exc`, or hands `exc` back.
    fn handle(&mut self, exc: Exception, handlers: &[ExceptHandler]) -> Result<Flow> {
        for handler in handlers {
            let matched = match &handler.class {
                Some(class) => {
                    let class = self.eval(class)?;
                    matches_class(&exc, &class)?
                }
                None => true,
            };

            if !matched {
                continue;
            }

            trace!("caught {}: {}", exc.kind.name(), exc.message);
            if let Some(name) = &handler.name {
                self.assign_name(name, Value::Exception(Rc::new(exc.clone())));
            }

            self.handling.push(exc);
            let result = self.exec_block(&handler.body);
            self.handling.pop();

            if let Some(name) = &handler.name {
                self.delete_name(name).ok();
            }
            return result;
        }

        Err(exc)
    }

    fn exec_raise(&mut self, value: Option<&Expr>) -> Result<Exception> {
        let value = match value {
            Some(value) => self.eval(value)?,
            None => {
                return Ok(self.handling.last().cloned().unwrap_or_else(|| {
                    Exception::new(ExceptionKind::RuntimeError, "No active exception to reraise")
                }))
            }
        };

        match value {
            Value::ExceptionClass(kind) => Ok(Exception::new(kind, "")),
            Value::Exception(exc) => Ok((*exc).clone()),
            _ => Err(Exception::type_error(
                "exceptions must derive from BaseException",
            )),
        }
    }

    fn make_function(&mut self, def: &Rc<FunctionDef>) -> Result<Value> {
        let mut defaults = Vec::with_capacity(def.params.len());
        for param in &def.params {
            defaults.push(match &param.default {
                Some(default) => Some(self.eval(default)?),
                None => None,
            });
        }

        Ok(Value::Function(Rc::new(Function {
            def: def.clone(),
            defaults,
        })))
    }

    pub fn assign(&mut self, target: &Target, value: Value) -> Result<()> {
        match target {
            Target::Name(name) => self.assign_name(name, value),
            Target::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                ops::set_item(&object, &index, value)?;
            }
            Target::Tuple(targets) => {
                let items = value.to_vec().map_err(|_| {
                    Exception::type_error(format!(
                        "cannot unpack non-iterable {} object",
                        value.type_name()
                    ))
                })?;

                if items.len() > targets.len() {
                    return Err(Exception::value_error(format!(
                        "too many values to unpack (expected {})",
                        targets.len()
                    )));
                }

                if items.len() < targets.len() {
                    return Err(Exception::value_error(format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        items.len()
                    )));
                }

                for (target, item) in targets.iter().zip(items) {
                    self.assign(target, item)?;
                }
            }
        }
        Ok(())
    }

    fn delete(&mut self, target: &Target) -> Result<()> {
        match target {
            Target::Name(name) => self.delete_name(name),
            Target::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                ops::del_item(&object, &index)
            }
            Target::Tuple(targets) => {
                for target in targets {
                    self.delete(target)?;
                }
                Ok(())
            }
        }
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::None => Value::None,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(n) => Value::Float(*n),
                Literal::Str(s) => Value::from(s.as_str()),
            }),
            Expr::FString(parts) => {
                let mut s = String::new();
                for part in parts {
                    match part {
                        FStringPart::Literal(text) => s.push_str(text),
                        FStringPart::Field {
                            expr,
                            conversion,
                            spec,
                        } => {
                            let value = self.eval(expr)?;
                            let value = match conversion {
                                Some('s') => Value::from(value.try_str()?),
                                Some(_) => Value::from(value.try_repr()?),
                                None => value,
                            };
                            s.push_str(&format_value(&value, spec)?);
                        }
                    }
                }
                Ok(Value::from(s))
            }
            Expr::Name(name) => self.lookup(name),
            Expr::Tuple(items) => Ok(Value::tuple(self.eval_all(items)?)),
            Expr::List(items) => Ok(Value::list(self.eval_all(items)?)),
            Expr::Dict(entries) => {
                let mut dict = Dict::new();
                for (key, value) in entries {
                    let key = self.eval(key)?;
                    let value = self.eval(value)?;
                    dict.insert(key, value)?;
                }
                Ok(Value::dict(dict))
            }
            Expr::ListComp { element, clauses } => {
                let mut items = Vec::new();
                self.comprehend(clauses, &mut |interp: &mut Interpreter<'a>| {
                    items.push(interp.eval(element)?);
                    Ok(())
                })?;
                Ok(Value::list(items))
            }
            Expr::DictComp {
                key,
                value,
                clauses,
            } => {
                let mut dict = Dict::new();
                self.comprehend(clauses, &mut |interp: &mut Interpreter<'a>| {
                    let key = interp.eval(key)?;
                    let value = interp.eval(value)?;
                    dict.insert(key, value)
                })?;
                Ok(Value::dict(dict))
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                ops::unary(*op, &operand)
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                ops::binary(*op, &lhs, &rhs)
            }
            Expr::BoolOp { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                match (op, lhs.truthy()) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(lhs),
                    _ => self.eval(rhs),
                }
            }
            Expr::Compare { first, rest } => {
                let mut lhs = self.eval(first)?;
                for (op, rhs) in rest {
                    let rhs = self.eval(rhs)?;
                    if !ops::compare(*op, &lhs, &rhs)? {
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Ok(Value::Bool(true))
            }
            Expr::Ternary { cond, then, orelse } => {
                if self.eval(cond)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(orelse)
                }
            }
            Expr::Call { func, args, kwargs } => {
                let func = self.eval(func)?;
                let args = self.eval_all(args)?;
                let mut evaluated = Vec::with_capacity(kwargs.len());
                for (name, value) in kwargs {
                    evaluated.push((name.clone(), self.eval(value)?));
                }
                self.call(&func, args, evaluated)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                ops::get_item(&object, &index)
            }
            Expr::Slice {
                object,
                lower,
                upper,
                step,
            } => {
                let object = self.eval(object)?;
                let lower = self.eval_opt(lower)?;
                let upper = self.eval_opt(upper)?;
                let step = self.eval_opt(step)?;
                ops::get_slice(&object, lower.as_ref(), upper.as_ref(), step.as_ref())
            }
            Expr::Attribute { object, name } => {
                let object = self.eval(object)?;
                methods::get_attr(&object, name)
            }
            Expr::Lambda(def) => self.make_function(def),
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.eval(expr)?);
        }
        Ok(values)
    }

    fn eval_opt(&mut self, expr: &Option<Box<Expr>>) -> Result<Option<Value>> {
        match expr {
            Some(expr) => Ok(Some(self.eval(expr)?)),
            None => Ok(None),
        }
    }

    /// Runs `emit` for each combination the comprehension clauses produce.
    /// The first iterable is evaluated in the enclosing scope and the
    /// targets are bound in a scope of their own.
    fn comprehend(
        &mut self,
        clauses: &[Comprehension],
        emit: &mut dyn FnMut(&mut Interpreter<'a>) -> Result<()>,
    ) -> Result<()> {
        let first = match clauses.first() {
            Some(clause) => self.eval(&clause.iter)?,
            None => return Ok(()),
        };

        self.push_comp_scope();
        let result = self.comprehend_from(clauses, Some(first), emit);
        self.pop_comp_scope();
        result
    }

    fn comprehend_from(
        &mut self,
        clauses: &[Comprehension],
        iterable: Option<Value>,
        emit: &mut dyn FnMut(&mut Interpreter<'a>) -> Result<()>,
    ) -> Result<()> {
        let (clause, rest) = match clauses.split_first() {
            Some(split) => split,
            None => return emit(self),
        };

        let iterable = match iterable {
            Some(iterable) => iterable,
            None => self.eval(&clause.iter)?,
        };

        'items: for item in iterable.iter()? {
            self.assign(&clause.target, item)?;
            for cond in &clause.conds {
                if !self.eval(cond)?.truthy() {
                    continue 'items;
                }
            }
            self.comprehend_from(rest, None, emit)?;
        }
        Ok(())
    }
}

/// Whether an `except` clause naming `class` catches `exc`.
fn matches_class(exc: &Exception, class: &Value) -> Result<bool> {
    match class {
        Value::ExceptionClass(kind) => Ok(exc.kind.is_subclass_of(*kind)),
        Value::Tuple(classes) => {
            for class in classes.iter() {
                if matches_class(exc, class)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(Exception::type_error(
            "catching classes that do not inherit from BaseException is not allowed",
        )),
    }
}
