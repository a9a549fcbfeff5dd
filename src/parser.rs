use crate::ast::*;
use crate::exception::Exception;
use crate::layout::{check_nesting, layout, Layout};
use pest::error::LineColLocation;
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use std::collections::HashSet;
use std::rc::Rc;

#[derive(Parser)]
#[grammar = "snek.pest"]
struct SnekParser;

type Result<I> = std::result::Result<I, Exception>;

#[allow(unused)]
fn dump(pairs: Pairs<Rule>, level: usize) {
    for pair in pairs {
        trace!(
            "{}{:?}: {:?}",
            "  ".repeat(level),
            pair.as_rule(),
            pair.as_span().as_str()
        );
        dump(pair.into_inner(), level + 1);
    }
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_and
            | Rule::kw_as
            | Rule::kw_assert
            | Rule::kw_break
            | Rule::kw_continue
            | Rule::kw_def
            | Rule::kw_del
            | Rule::kw_elif
            | Rule::kw_else
            | Rule::kw_except
            | Rule::kw_finally
            | Rule::kw_for
            | Rule::kw_global
            | Rule::kw_if
            | Rule::kw_import
            | Rule::kw_in
            | Rule::kw_is
            | Rule::kw_lambda
            | Rule::kw_not
            | Rule::kw_or
            | Rule::kw_pass
            | Rule::kw_raise
            | Rule::kw_return
            | Rule::kw_try
            | Rule::kw_while
    )
}

/// Inner pairs without the keyword tokens.
fn significant<'i>(pair: Pair<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

/// Builds a function definition and works out which names are local to it.
fn function_def(name: &str, params: Vec<Param>, body: Vec<Stmt>) -> FunctionDef {
    let mut globals = HashSet::new();
    collect_globals(&body, &mut globals);

    let mut locals: HashSet<String> = params.iter().map(|p| p.name.clone()).collect();
    collect_bindings(&body, &mut locals);
    for name in &globals {
        locals.remove(name);
    }

    FunctionDef {
        name: name.to_owned(),
        params,
        body,
        locals,
        globals,
    }
}

fn collect_target_names(target: &Target, names: &mut HashSet<String>) {
    match target {
        Target::Name(name) => {
            names.insert(name.clone());
        }
        Target::Tuple(targets) => {
            for target in targets {
                collect_target_names(target, names);
            }
        }
        Target::Index { .. } => {}
    }
}

fn collect_bindings(body: &[Stmt], names: &mut HashSet<String>) {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    collect_target_names(target, names);
                }
            }
            StmtKind::AugAssign { target, .. } => collect_target_names(target, names),
            StmtKind::Delete(targets) => {
                for target in targets {
                    collect_target_names(target, names);
                }
            }
            StmtKind::FunctionDef(def) => {
                names.insert(def.name.clone());
            }
            StmtKind::Import(imports) => {
                for (module, alias) in imports {
                    names.insert(alias.as_ref().unwrap_or(module).clone());
                }
            }
            StmtKind::If { branches, orelse } => {
                for (_, body) in branches {
                    collect_bindings(body, names);
                }
                collect_bindings(orelse, names);
            }
            StmtKind::While { body, orelse, .. } => {
                collect_bindings(body, names);
                collect_bindings(orelse, names);
            }
            StmtKind::For {
                target,
                body,
                orelse,
                ..
            } => {
                collect_target_names(target, names);
                collect_bindings(body, names);
                collect_bindings(orelse, names);
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                collect_bindings(body, names);
                for handler in handlers {
                    if let Some(name) = &handler.name {
                        names.insert(name.clone());
                    }
                    collect_bindings(&handler.body, names);
                }
                collect_bindings(orelse, names);
                collect_bindings(finalbody, names);
            }
            _ => {}
        }
    }
}

fn collect_globals(body: &[Stmt], names: &mut HashSet<String>) {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Global(globals) => names.extend(globals.iter().cloned()),
            StmtKind::If { branches, orelse } => {
                for (_, body) in branches {
                    collect_globals(body, names);
                }
                collect_globals(orelse, names);
            }
            StmtKind::While { body, orelse, .. } | StmtKind::For { body, orelse, .. } => {
                collect_globals(body, names);
                collect_globals(orelse, names);
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                collect_globals(body, names);
                for handler in handlers {
                    collect_globals(&handler.body, names);
                }
                collect_globals(orelse, names);
                collect_globals(finalbody, names);
            }
            _ => {}
        }
    }
}

/// Rejects `break`, `continue` and `return` where they cannot appear.
fn check_block(body: &[Stmt], in_loop: bool, in_function: bool) -> Result<()> {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Break if !in_loop => {
                return Err(Exception::syntax_error("'break' outside loop", stmt.line));
            }
            StmtKind::Continue if !in_loop => {
                return Err(Exception::syntax_error(
                    "'continue' not properly in loop",
                    stmt.line,
                ));
            }
            StmtKind::Return(_) if !in_function => {
                return Err(Exception::syntax_error("'return' outside function", stmt.line));
            }
            StmtKind::If { branches, orelse } => {
                for (_, body) in branches {
                    check_block(body, in_loop, in_function)?;
                }
                check_block(orelse, in_loop, in_function)?;
            }
            StmtKind::While { body, orelse, .. } | StmtKind::For { body, orelse, .. } => {
                check_block(body, true, in_function)?;
                check_block(orelse, in_loop, in_function)?;
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                check_block(body, in_loop, in_function)?;
                for handler in handlers {
                    check_block(&handler.body, in_loop, in_function)?;
                }
                check_block(orelse, in_loop, in_function)?;
                check_block(finalbody, in_loop, in_function)?;
            }
            StmtKind::FunctionDef(def) => check_block(&def.body, false, true)?,
            _ => {}
        }
    }

    Ok(())
}

/// Resolves backslash escapes in a string literal body.
fn unescape(body: &str) -> String {
    let mut s = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            s.push(ch);
            continue;
        }

        let escaped = match chars.next() {
            Some(escaped) => escaped,
            None => {
                s.push('\\');
                break;
            }
        };

        match escaped {
            '\n' => {}
            '\\' => s.push('\\'),
            '\'' => s.push('\''),
            '"' => s.push('"'),
            'n' => s.push('\n'),
            't' => s.push('\t'),
            'r' => s.push('\r'),
            'a' => s.push('\x07'),
            'b' => s.push('\x08'),
            'f' => s.push('\x0C'),
            'v' => s.push('\x0B'),
            '0'..='7' => {
                let mut code = escaped.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                s.extend(std::char::from_u32(code));
            }
            'x' | 'u' | 'U' => {
                let len = match escaped {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = (0..len).filter_map(|_| chars.next()).collect();
                match u32::from_str_radix(&digits, 16)
                    .ok()
                    .and_then(std::char::from_u32)
                {
                    Some(c) if digits.len() == len => s.push(c),
                    _ => {
                        s.push('\\');
                        s.push(escaped);
                        s.push_str(&digits);
                    }
                }
            }
            other => {
                s.push('\\');
                s.push(other);
            }
        }
    }

    s
}

fn parse_int(text: &str) -> Option<i64> {
    let lower = text.to_ascii_lowercase();
    if let Some(digits) = lower.strip_prefix("0x") {
        i64::from_str_radix(digits, 16).ok()
    } else if let Some(digits) = lower.strip_prefix("0o") {
        i64::from_str_radix(digits, 8).ok()
    } else if let Some(digits) = lower.strip_prefix("0b") {
        i64::from_str_radix(digits, 2).ok()
    } else {
        lower.parse().ok()
    }
}

/// `(x)` is just `x`; a comma makes a tuple.
fn tuple_or_single(mut exprs: Vec<Expr>, trailing_comma: bool) -> Expr {
    if exprs.len() == 1 && !trailing_comma {
        exprs.remove(0)
    } else {
        Expr::Tuple(exprs)
    }
}

#[derive(Default)]
struct Bracketed {
    items: Vec<Expr>,
    entries: Vec<(Expr, Expr)>,
    clauses: Option<Vec<Comprehension>>,
    trailing_comma: bool,
}

struct Visitor<'a> {
    layout: &'a Layout,
}

impl<'a> Visitor<'a> {
    fn line(&self, pair: &Pair<Rule>) -> usize {
        self.layout
            .source_line(pair.as_span().start_pos().line_col().0)
    }

    fn error(&self, pair: &Pair<Rule>, message: &str) -> Exception {
        Exception::syntax_error(message, self.line(pair))
    }

    fn visit_program(&self, mut pairs: Pairs<Rule>) -> Result<Vec<Stmt>> {
        let mut body = Vec::new();
        if let Some(program) = pairs.next() {
            for pair in program.into_inner() {
                if pair.as_rule() != Rule::EOI {
                    self.visit_statement(pair, &mut body)?;
                }
            }
        }
        Ok(body)
    }

    fn visit_statement(&self, pair: Pair<Rule>, body: &mut Vec<Stmt>) -> Result<()> {
        match pair.as_rule() {
            Rule::simple_line => {
                for stmt in pair.into_inner() {
                    body.push(self.visit_simple_stmt(stmt)?);
                }
            }
            _ => body.push(self.visit_compound_stmt(pair)?),
        }
        Ok(())
    }

    // suite = { simple_line | NEWLINE ~ indent ~ statement+ ~ dedent }
    fn visit_suite(&self, pair: Pair<Rule>) -> Result<Vec<Stmt>> {
        let mut body = Vec::new();
        for stmt in pair.into_inner() {
            self.visit_statement(stmt, &mut body)?;
        }
        Ok(body)
    }

    // else_clause = { kw_else ~ ":" ~ suite }
    fn visit_clause_suite(&self, pair: Pair<Rule>) -> Result<Vec<Stmt>> {
        match significant(pair).last() {
            Some(suite) => self.visit_suite(suite),
            None => Ok(vec![]),
        }
    }

    fn visit_compound_stmt(&self, pair: Pair<Rule>) -> Result<Stmt> {
        let line = self.line(&pair);
        let kind = match pair.as_rule() {
            Rule::if_stmt => {
                let mut branches = Vec::new();
                let mut orelse = Vec::new();
                let mut inner = significant(pair);
                let cond = self.visit_expr(inner.next().unwrap())?;
                let body = self.visit_suite(inner.next().unwrap())?;
                branches.push((cond, body));
                for clause in inner {
                    match clause.as_rule() {
                        Rule::elif_clause => {
                            let mut inner = significant(clause);
                            let cond = self.visit_expr(inner.next().unwrap())?;
                            let body = self.visit_suite(inner.next().unwrap())?;
                            branches.push((cond, body));
                        }
                        _ => orelse = self.visit_clause_suite(clause)?,
                    }
                }
                StmtKind::If { branches, orelse }
            }
            Rule::while_stmt => {
                let mut inner = significant(pair);
                let cond = self.visit_expr(inner.next().unwrap())?;
                let body = self.visit_suite(inner.next().unwrap())?;
                let orelse = match inner.next() {
                    Some(clause) => self.visit_clause_suite(clause)?,
                    None => vec![],
                };
                StmtKind::While { cond, body, orelse }
            }
            Rule::for_stmt => {
                let mut inner = significant(pair);
                let target = self.visit_target_list(inner.next().unwrap())?;
                let iter = self.visit_expr_list(inner.next().unwrap())?;
                let body = self.visit_suite(inner.next().unwrap())?;
                let orelse = match inner.next() {
                    Some(clause) => self.visit_clause_suite(clause)?,
                    None => vec![],
                };
                StmtKind::For {
                    target,
                    iter,
                    body,
                    orelse,
                }
            }
            Rule::def_stmt => {
                let mut name = String::new();
                let mut params = Vec::new();
                let mut body = Vec::new();
                for child in significant(pair) {
                    match child.as_rule() {
                        Rule::ident => name = child.as_str().to_owned(),
                        Rule::params => params = self.visit_params(child)?,
                        _ => body = self.visit_suite(child)?,
                    }
                }
                StmtKind::FunctionDef(Rc::new(function_def(&name, params, body)))
            }
            Rule::try_stmt => {
                let mut inner = significant(pair);
                let body = self.visit_suite(inner.next().unwrap())?;
                let mut handlers = Vec::new();
                let mut orelse = Vec::new();
                let mut finalbody = Vec::new();
                for clause in inner {
                    match clause.as_rule() {
                        Rule::except_clause => handlers.push(self.visit_except_clause(clause)?),
                        Rule::else_clause => orelse = self.visit_clause_suite(clause)?,
                        _ => finalbody = self.visit_clause_suite(clause)?,
                    }
                }
                StmtKind::Try {
                    body,
                    handlers,
                    orelse,
                    finalbody,
                }
            }
            _ => unreachable!(),
        };

        Ok(Stmt { line, kind })
    }

    // except_clause = { kw_except ~ (expr ~ (kw_as ~ ident)?)? ~ ":" ~ suite }
    fn visit_except_clause(&self, pair: Pair<Rule>) -> Result<ExceptHandler> {
        let mut class = None;
        let mut name = None;
        let mut body = Vec::new();
        for child in significant(pair) {
            match child.as_rule() {
                Rule::expr => class = Some(self.visit_expr(child)?),
                Rule::ident => name = Some(child.as_str().to_owned()),
                _ => body = self.visit_suite(child)?,
            }
        }
        Ok(ExceptHandler { class, name, body })
    }

    fn visit_params(&self, pair: Pair<Rule>) -> Result<Vec<Param>> {
        let mut params: Vec<Param> = Vec::new();
        for param in pair.into_inner() {
            let span = param.clone();
            let mut inner = param.into_inner();
            let name = inner.next().unwrap().as_str().to_owned();
            let default = match inner.next() {
                Some(expr) => Some(self.visit_expr(expr)?),
                None => None,
            };

            if params.iter().any(|p| p.name == name) {
                let message = format!("duplicate argument '{}' in function definition", name);
                return Err(self.error(&span, &message));
            }

            if default.is_none() && params.iter().any(|p| p.default.is_some()) {
                return Err(self.error(&span, "non-default argument follows default argument"));
            }

            params.push(Param { name, default });
        }
        Ok(params)
    }

    fn visit_simple_stmt(&self, pair: Pair<Rule>) -> Result<Stmt> {
        let line = self.line(&pair);
        let kind = match pair.as_rule() {
            Rule::pass_stmt => StmtKind::Pass,
            Rule::break_stmt => StmtKind::Break,
            Rule::continue_stmt => StmtKind::Continue,
            Rule::return_stmt => match significant(pair).next() {
                Some(value) => StmtKind::Return(Some(self.visit_expr_list(value)?)),
                None => StmtKind::Return(None),
            },
            Rule::raise_stmt => match significant(pair).next() {
                Some(value) => StmtKind::Raise(Some(self.visit_expr(value)?)),
                None => StmtKind::Raise(None),
            },
            Rule::global_stmt => {
                StmtKind::Global(significant(pair).map(|p| p.as_str().to_owned()).collect())
            }
            Rule::import_stmt => StmtKind::Import(
                significant(pair)
                    .map(|import| {
                        let mut inner = significant(import);
                        let module = inner.next().unwrap().as_str().to_owned();
                        let alias = inner.next().map(|p| p.as_str().to_owned());
                        (module, alias)
                    })
                    .collect(),
            ),
            Rule::assert_stmt => {
                let mut inner = significant(pair);
                let test = self.visit_expr(inner.next().unwrap())?;
                let msg = match inner.next() {
                    Some(msg) => Some(self.visit_expr(msg)?),
                    None => None,
                };
                StmtKind::Assert { test, msg }
            }
            Rule::del_stmt => {
                let target = self.visit_target_list(significant(pair).next().unwrap())?;
                match target {
                    Target::Tuple(targets) => StmtKind::Delete(targets),
                    target => StmtKind::Delete(vec![target]),
                }
            }
            Rule::assign_stmt => {
                let mut children: Vec<Pair<Rule>> = pair.into_inner().collect();
                let value = self.visit_expr_list(children.pop().unwrap())?;
                let mut targets = Vec::new();
                for target in children {
                    targets.push(self.visit_target_list(target)?);
                }
                StmtKind::Assign { targets, value }
            }
            Rule::aug_assign_stmt => {
                let mut inner = pair.into_inner();
                let target_pair = inner.next().unwrap();
                let target = self.visit_target(target_pair.clone())?;
                if let Target::Tuple(_) = target {
                    return Err(self.error(
                        &target_pair,
                        "'tuple' is an illegal expression for augmented assignment",
                    ));
                }

                let op = match inner.next().unwrap().as_str() {
                    "+=" => BinOp::Add,
                    "-=" => BinOp::Sub,
                    "*=" => BinOp::Mul,
                    "/=" => BinOp::Div,
                    "//=" => BinOp::FloorDiv,
                    "%=" => BinOp::Mod,
                    "**=" => BinOp::Pow,
                    _ => unreachable!(),
                };
                let value = self.visit_expr_list(inner.next().unwrap())?;
                StmtKind::AugAssign { target, op, value }
            }
            Rule::expr_stmt => StmtKind::Expr(self.visit_expr_list(pair.into_inner().next().unwrap())?),
            _ => unreachable!(),
        };

        Ok(Stmt { line, kind })
    }

    // target_list = { target ~ ("," ~ target)* ~ trailing_comma? }
    fn visit_target_list(&self, pair: Pair<Rule>) -> Result<Target> {
        let mut targets = Vec::new();
        let mut trailing_comma = false;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::trailing_comma => trailing_comma = true,
                _ => targets.push(self.visit_target(child)?),
            }
        }

        if targets.len() == 1 && !trailing_comma {
            Ok(targets.remove(0))
        } else {
            Ok(Target::Tuple(targets))
        }
    }

    fn visit_target(&self, pair: Pair<Rule>) -> Result<Target> {
        let bracketed = pair.as_str().starts_with('[');
        let child = pair.into_inner().next().unwrap();
        if child.as_rule() == Rule::target_list {
            return match self.visit_target_list(child)? {
                Target::Tuple(targets) => Ok(Target::Tuple(targets)),
                target if bracketed => Ok(Target::Tuple(vec![target])),
                target => Ok(target),
            };
        }

        let span = child.clone();
        let what = match self.visit_expr(child)? {
            Expr::Name(name) => return Ok(Target::Name(name)),
            Expr::Index { object, index } => {
                return Ok(Target::Index {
                    object: *object,
                    index: *index,
                })
            }
            Expr::Tuple(_) | Expr::List(_) => "literal",
            Expr::Call { .. } => "function call",
            Expr::Literal(_) | Expr::FString(_) => "literal",
            Expr::Attribute { .. } => "attribute",
            Expr::Slice { .. } => "slice",
            _ => "expression",
        };

        Err(self.error(&span, &format!("cannot assign to {}", what)))
    }

    // expr_list = { expr ~ ("," ~ expr)* ~ trailing_comma? }
    fn visit_expr_list(&self, pair: Pair<Rule>) -> Result<Expr> {
        let mut exprs = Vec::new();
        let mut trailing_comma = false;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::trailing_comma => trailing_comma = true,
                _ => exprs.push(self.visit_expr(child)?),
            }
        }

        Ok(tuple_or_single(exprs, trailing_comma))
    }

    /// The contents of `(...)`, `[...]` and `{...}`: the items and the
    /// comprehension clauses following the first one, if any.
    fn visit_bracketed(&self, pair: Pair<Rule>) -> Result<Bracketed> {
        let mut contents = Bracketed::default();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::trailing_comma => contents.trailing_comma = true,
                Rule::comp_for => contents.clauses = Some(self.visit_comp_for(child)?),
                Rule::dict_entry => {
                    let mut inner = child.into_inner();
                    let key = self.visit_expr(inner.next().unwrap())?;
                    let value = self.visit_expr(inner.next().unwrap())?;
                    contents.entries.push((key, value));
                }
                _ => contents.items.push(self.visit_expr(child)?),
            }
        }
        Ok(contents)
    }

    fn visit_expr(&self, pair: Pair<Rule>) -> Result<Expr> {
        match pair.as_rule() {
            // expr = { lambda_expr | or_test ~ (kw_if ~ or_test ~ kw_else ~ expr)? }
            Rule::expr => {
                let mut inner = significant(pair);
                let value = self.visit_expr(inner.next().unwrap())?;
                match (inner.next(), inner.next()) {
                    (Some(cond), Some(orelse)) => Ok(Expr::Ternary {
                        cond: Box::new(self.visit_expr(cond)?),
                        then: Box::new(value),
                        orelse: Box::new(self.visit_expr(orelse)?),
                    }),
                    _ => Ok(value),
                }
            }
            Rule::lambda_expr => {
                let line = self.line(&pair);
                let mut params = Vec::new();
                let mut body = None;
                for child in significant(pair) {
                    match child.as_rule() {
                        Rule::params => params = self.visit_params(child)?,
                        _ => body = Some(self.visit_expr(child)?),
                    }
                }

                let body = vec![Stmt {
                    line,
                    kind: StmtKind::Return(body),
                }];
                Ok(Expr::Lambda(Rc::new(function_def("<lambda>", params, body))))
            }
            Rule::or_test | Rule::and_test => {
                let op = if pair.as_rule() == Rule::or_test {
                    BoolOp::Or
                } else {
                    BoolOp::And
                };

                let mut inner = significant(pair);
                let mut lhs = self.visit_expr(inner.next().unwrap())?;
                for rhs in inner {
                    lhs = Expr::BoolOp {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(self.visit_expr(rhs)?),
                    };
                }
                Ok(lhs)
            }
            Rule::not_expr => {
                let operand = self.visit_expr(significant(pair).next().unwrap())?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            // comparison = { arith ~ (comp_op ~ arith)* }
            Rule::comparison => {
                let mut inner = pair.into_inner();
                let first = self.visit_expr(inner.next().unwrap())?;
                let mut rest = Vec::new();
                while let Some(op) = inner.next() {
                    let words: Vec<&str> = op.as_str().split_whitespace().collect();
                    let op = match words.as_slice() {
                        ["=="] => CmpOp::Eq,
                        ["!="] => CmpOp::Ne,
                        ["<"] => CmpOp::Lt,
                        ["<="] => CmpOp::Le,
                        [">"] => CmpOp::Gt,
                        [">="] => CmpOp::Ge,
                        ["in"] => CmpOp::In,
                        ["not", "in"] => CmpOp::NotIn,
                        ["is"] => CmpOp::Is,
                        ["is", "not"] => CmpOp::IsNot,
                        _ => unreachable!(),
                    };
                    rest.push((op, self.visit_expr(inner.next().unwrap())?));
                }

                if rest.is_empty() {
                    Ok(first)
                } else {
                    Ok(Expr::Compare {
                        first: Box::new(first),
                        rest,
                    })
                }
            }
            // arith = { term ~ (add_op ~ term)* }
            // term = { factor ~ (mul_op ~ factor)* }
            Rule::arith | Rule::term => {
                let mut inner = pair.into_inner();
                let mut lhs = self.visit_expr(inner.next().unwrap())?;
                while let Some(op) = inner.next() {
                    let op = match op.as_str() {
                        "+" => BinOp::Add,
                        "-" => BinOp::Sub,
                        "*" => BinOp::Mul,
                        "/" => BinOp::Div,
                        "//" => BinOp::FloorDiv,
                        "%" => BinOp::Mod,
                        _ => unreachable!(),
                    };
                    let rhs = self.visit_expr(inner.next().unwrap())?;
                    lhs = Expr::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    };
                }
                Ok(lhs)
            }
            // factor = { unary_op ~ factor | power }
            Rule::factor => {
                let mut inner = pair.into_inner();
                let first = inner.next().unwrap();
                if first.as_rule() != Rule::unary_op {
                    return self.visit_expr(first);
                }

                let operand = self.visit_expr(inner.next().unwrap())?;
                match (first.as_str(), operand) {
                    ("-", Expr::Literal(Literal::Int(n))) => Ok(Expr::Literal(Literal::Int(-n))),
                    ("-", Expr::Literal(Literal::Float(n))) => Ok(Expr::Literal(Literal::Float(-n))),
                    ("-", operand) => Ok(Expr::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    }),
                    (_, operand) => Ok(Expr::Unary {
                        op: UnaryOp::Pos,
                        operand: Box::new(operand),
                    }),
                }
            }
            // power = { postfix ~ ("**" ~ factor)? }
            Rule::power => {
                let mut inner = pair.into_inner();
                let base = self.visit_expr(inner.next().unwrap())?;
                match inner.next() {
                    Some(exponent) => Ok(Expr::Binary {
                        op: BinOp::Pow,
                        lhs: Box::new(base),
                        rhs: Box::new(self.visit_expr(exponent)?),
                    }),
                    None => Ok(base),
                }
            }
            Rule::postfix => {
                let mut inner = pair.into_inner();
                let mut expr = self.visit_expr(inner.next().unwrap())?;
                for trailer in inner {
                    expr = self.visit_trailer(expr, trailer)?;
                }
                Ok(expr)
            }
            // paren = { "(" ~ (expr ~ (comp_for | expr_tail))? ~ ")" }
            // list = { "[" ~ (expr ~ (comp_for | expr_tail))? ~ "]" }
            Rule::paren | Rule::list => {
                let rule = pair.as_rule();
                let mut contents = self.visit_bracketed(pair)?;
                match contents.clauses {
                    // A parenthesized generator is evaluated eagerly, like
                    // the one passed as a sole call argument.
                    Some(clauses) => Ok(Expr::ListComp {
                        element: Box::new(contents.items.remove(0)),
                        clauses,
                    }),
                    None if rule == Rule::list => Ok(Expr::List(contents.items)),
                    None => Ok(tuple_or_single(contents.items, contents.trailing_comma)),
                }
            }
            // dict = { "{" ~ (dict_entry ~ (comp_for | ("," ~ dict_entry)* ~ trailing_comma?))? ~ "}" }
            Rule::dict => {
                let mut contents = self.visit_bracketed(pair)?;
                match contents.clauses {
                    Some(clauses) => {
                        let (key, value) = contents.entries.remove(0);
                        Ok(Expr::DictComp {
                            key: Box::new(key),
                            value: Box::new(value),
                            clauses,
                        })
                    }
                    None => Ok(Expr::Dict(contents.entries)),
                }
            }
            Rule::strings => self.visit_strings(pair),
            Rule::float => match pair.as_str().parse() {
                Ok(value) => Ok(Expr::Literal(Literal::Float(value))),
                Err(_) => Err(self.error(&pair, "invalid decimal literal")),
            },
            Rule::int => {
                let text = pair.as_str();
                if text.starts_with('0') && text.bytes().all(|b| b.is_ascii_digit()) && text.bytes().any(|b| b != b'0') {
                    return Err(self.error(
                        &pair,
                        "leading zeros in decimal integer literals are not permitted; \
                         use an 0o prefix for octal integers",
                    ));
                }

                match parse_int(text) {
                    Some(value) => Ok(Expr::Literal(Literal::Int(value))),
                    None => Err(self.error(&pair, "integer literal is too large")),
                }
            }
            Rule::none => Ok(Expr::Literal(Literal::None)),
            Rule::true_lit => Ok(Expr::Literal(Literal::Bool(true))),
            Rule::false_lit => Ok(Expr::Literal(Literal::Bool(false))),
            Rule::ident => Ok(Expr::Name(pair.as_str().to_owned())),
            rule => unreachable!("unexpected rule: {:?}", rule),
        }
    }

    fn visit_trailer(&self, object: Expr, trailer: Pair<Rule>) -> Result<Expr> {
        match trailer.as_rule() {
            Rule::call => {
                let mut args = Vec::new();
                let mut kwargs: Vec<(String, Expr)> = Vec::new();
                for arg in trailer.clone().into_inner() {
                    match arg.as_rule() {
                        Rule::trailing_comma => {}
                        // f(x for x in y): only allowed as the sole argument.
                        Rule::comp_for => match args.pop() {
                            Some(element) if kwargs.is_empty() => args.push(Expr::ListComp {
                                element: Box::new(element),
                                clauses: self.visit_comp_for(arg)?,
                            }),
                            _ => return Err(self.error(&trailer, "invalid syntax")),
                        },
                        Rule::kwarg => {
                            let mut inner = arg.into_inner();
                            let name = inner.next().unwrap().as_str().to_owned();
                            if kwargs.iter().any(|(k, _)| *k == name) {
                                let message = format!("keyword argument repeated: {}", name);
                                return Err(self.error(&trailer, &message));
                            }
                            kwargs.push((name, self.visit_expr(inner.next().unwrap())?));
                        }
                        _ => {
                            if !kwargs.is_empty() {
                                return Err(self.error(
                                    &trailer,
                                    "positional argument follows keyword argument",
                                ));
                            }
                            args.push(self.visit_expr(arg)?);
                        }
                    }
                }

                Ok(Expr::Call {
                    func: Box::new(object),
                    args,
                    kwargs,
                })
            }
            // subscript = { "[" ~ slice_part ~ (slice | expr_tail) ~ "]" }
            Rule::subscript => {
                let span = trailer.clone();
                let mut inner = trailer.into_inner();
                let first = inner.next().unwrap().into_inner().next();
                let rest: Vec<Pair<Rule>> = inner.collect();

                if let Some(slice) = rest.iter().find(|p| p.as_rule() == Rule::slice) {
                    let mut parts = vec![self.visit_slice_part(first)?];
                    for part in slice.clone().into_inner() {
                        parts.push(self.visit_slice_part(part.into_inner().next())?);
                    }

                    let mut parts = parts.into_iter();
                    return Ok(Expr::Slice {
                        object: Box::new(object),
                        lower: parts.next().unwrap_or(None),
                        upper: parts.next().unwrap_or(None),
                        step: parts.next().unwrap_or(None),
                    });
                }

                // `x[]` and `x[,]`
                let first = first.ok_or_else(|| self.error(&span, "invalid syntax"))?;
                let mut exprs = vec![self.visit_expr(first)?];
                let mut trailing_comma = false;
                for child in rest {
                    match child.as_rule() {
                        Rule::trailing_comma => trailing_comma = true,
                        _ => exprs.push(self.visit_expr(child)?),
                    }
                }

                Ok(Expr::Index {
                    object: Box::new(object),
                    index: Box::new(tuple_or_single(exprs, trailing_comma)),
                })
            }
            Rule::attribute => Ok(Expr::Attribute {
                object: Box::new(object),
                name: trailer.into_inner().next().unwrap().as_str().to_owned(),
            }),
            _ => unreachable!(),
        }
    }

    fn visit_slice_part(&self, expr: Option<Pair<Rule>>) -> Result<Option<Box<Expr>>> {
        match expr {
            Some(expr) => Ok(Some(Box::new(self.visit_expr(expr)?))),
            None => Ok(None),
        }
    }

    // comp_for = { kw_for ~ target_list ~ kw_in ~ or_test ~ comp_if* ~ comp_for? }
    fn visit_comp_for(&self, pair: Pair<Rule>) -> Result<Vec<Comprehension>> {
        let mut inner = significant(pair);
        let target = self.visit_target_list(inner.next().unwrap())?;
        let iter = self.visit_expr(inner.next().unwrap())?;
        let mut conds = Vec::new();
        let mut nested = Vec::new();
        for child in inner {
            match child.as_rule() {
                Rule::comp_if => conds.push(self.visit_expr(significant(child).next().unwrap())?),
                _ => nested = self.visit_comp_for(child)?,
            }
        }

        let mut clauses = vec![Comprehension {
            target,
            iter,
            conds,
        }];
        clauses.extend(nested);
        Ok(clauses)
    }

    // strings = { string+ }
    // string = ${ string_prefix? ~ (dq_string | sq_string) }
    fn visit_strings(&self, pair: Pair<Rule>) -> Result<Expr> {
        let mut parts = Vec::new();
        let mut formatted = false;
        for string in pair.into_inner() {
            let span = string.clone();
            let mut prefix = String::new();
            let mut body = "";
            for child in string.into_inner() {
                match child.as_rule() {
                    Rule::string_prefix => prefix = child.as_str().to_ascii_lowercase(),
                    _ => body = child.as_str(),
                }
            }

            let raw = prefix.contains('r');
            if prefix.contains('f') {
                formatted = true;
                parts.extend(self.visit_fstring(&span, body, raw)?);
            } else if raw {
                parts.push(FStringPart::Literal(body.to_owned()));
            } else {
                parts.push(FStringPart::Literal(unescape(body)));
            }
        }

        if !formatted {
            let mut s = String::new();
            for part in parts {
                if let FStringPart::Literal(text) = part {
                    s.push_str(&text);
                }
            }
            return Ok(Expr::Literal(Literal::Str(s)));
        }

        // Merge adjacent literals.
        let mut merged: Vec<FStringPart> = Vec::new();
        for part in parts {
            if let FStringPart::Literal(text) = &part {
                if let Some(FStringPart::Literal(prev)) = merged.last_mut() {
                    prev.push_str(text);
                    continue;
                }
            }
            merged.push(part);
        }
        Ok(Expr::FString(merged))
    }

    /// Splits an f-string body into literal text and replacement fields.
    fn visit_fstring(&self, span: &Pair<Rule>, body: &str, raw: bool) -> Result<Vec<FStringPart>> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let chars: Vec<char> = body.chars().collect();
        let mut i = 0;

        let flush = |literal: &mut String, parts: &mut Vec<FStringPart>| {
            if !literal.is_empty() {
                let text = if raw {
                    literal.clone()
                } else {
                    unescape(literal)
                };
                parts.push(FStringPart::Literal(text));
                literal.clear();
            }
        };

        while i < chars.len() {
            match chars[i] {
                '{' if chars.get(i + 1) == Some(&'{') => {
                    literal.push('{');
                    i += 2;
                }
                '}' if chars.get(i + 1) == Some(&'}') => {
                    literal.push('}');
                    i += 2;
                }
                '}' => return Err(self.error(span, "f-string: single '}' is not allowed")),
                '{' => {
                    flush(&mut literal, &mut parts);
                    let (part, next) = self.visit_fstring_field(span, &chars, i + 1)?;
                    parts.push(part);
                    i = next;
                }
                ch => {
                    literal.push(ch);
                    i += 1;
                }
            }
        }

        flush(&mut literal, &mut parts);
        Ok(parts)
    }

    /// Parses `expr[!conversion][:spec]}` starting at `start`. Returns the
    /// field and the index just past the closing brace.
    fn visit_fstring_field(
        &self,
        span: &Pair<Rule>,
        chars: &[char],
        start: usize,
    ) -> Result<(FStringPart, usize)> {
        let mut depth = 0;
        let mut quote: Option<char> = None;
        let mut i = start;
        while i < chars.len() {
            let ch = chars[i];
            if let Some(q) = quote {
                if ch == q {
                    quote = None;
                }
            } else {
                match ch {
                    '\'' | '"' => quote = Some(ch),
                    '(' | '[' | '{' => depth += 1,
                    ')' | ']' if depth > 0 => depth -= 1,
                    '}' if depth > 0 => depth -= 1,
                    '}' | ':' if depth == 0 => break,
                    '!' if depth == 0 && chars.get(i + 1) != Some(&'=') => break,
                    _ => {}
                }
            }
            i += 1;
        }

        let source: String = chars[start..i.min(chars.len())].iter().collect();
        if source.trim().is_empty() {
            return Err(self.error(span, "f-string: empty expression not allowed"));
        }

        let mut conversion = None;
        if chars.get(i) == Some(&'!') {
            match chars.get(i + 1).copied() {
                Some(c) if "rsa".contains(c) => conversion = Some(c),
                _ => return Err(self.error(span, "f-string: invalid conversion character")),
            }
            i += 2;
        }

        let mut spec = String::new();
        if chars.get(i) == Some(&':') {
            i += 1;
            while i < chars.len() && chars[i] != '}' {
                if chars[i] == '{' {
                    return Err(self.error(span, "f-string: nested replacement fields are not supported"));
                }
                spec.push(chars[i]);
                i += 1;
            }
        }

        if chars.get(i) != Some(&'}') {
            return Err(self.error(span, "f-string: expecting '}'"));
        }

        check_nesting(&source, self.line(span))?;
        let pairs = SnekParser::parse(Rule::fexpr_input, source.trim())
            .map_err(|_| self.error(span, "f-string: invalid syntax"))?;
        let expr_list = pairs
            .flatten()
            .find(|p| p.as_rule() == Rule::expr_list)
            .ok_or_else(|| self.error(span, "f-string: invalid syntax"))?;
        let expr = self.visit_expr_list(expr_list)?;

        Ok((
            FStringPart::Field {
                expr,
                conversion,
                spec,
            },
            i + 1,
        ))
    }
}

/// Parses a whole program. Nothing is executed if this fails.
pub fn parse(source: &str) -> Result<Program> {
    let layout = layout(source)?;
    let pairs = SnekParser::parse(Rule::program, &layout.text).map_err(|err| {
        let line = match err.line_col {
            LineColLocation::Pos((line, _)) | LineColLocation::Span((line, _), _) => line,
        };
        debug!("parse error: {}", err);
        Exception::syntax_error("invalid syntax", layout.source_line(line))
    })?;

    let visitor = Visitor { layout: &layout };
    let body = visitor.visit_program(pairs)?;
    check_block(&body, false, false)?;
    Ok(Program { body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::ExceptionKind;
    use pretty_assertions::assert_eq;

    fn body(source: &str) -> Vec<StmtKind> {
        parse(source)
            .unwrap()
            .body
            .into_iter()
            .map(|stmt| stmt.kind)
            .collect()
    }

    fn expr(source: &str) -> Expr {
        match body(source).pop() {
            Some(StmtKind::Expr(expr)) => expr,
            other => panic!("not an expression: {:?}", other),
        }
    }

    fn int(n: i64) -> Expr {
        Expr::Literal(Literal::Int(n))
    }

    fn name(s: &str) -> Expr {
        Expr::Name(s.to_owned())
    }

    fn error(source: &str) -> String {
        parse(source).unwrap_err().message
    }

    #[test]
    fn call_with_arithmetic() {
        assert_eq!(
            expr("print(1+1)"),
            Expr::Call {
                func: Box::new(name("print")),
                args: vec![Expr::Binary {
                    op: BinOp::Add,
                    lhs: Box::new(int(1)),
                    rhs: Box::new(int(1)),
                }],
                kwargs: vec![],
            }
        );
    }

    #[test]
    fn precedence() {
        // 1 + 2 * -3 ** 2
        assert_eq!(
            expr("1 + 2 * -3 ** 2"),
            Expr::Binary {
                op: BinOp::Add,
                lhs: Box::new(int(1)),
                rhs: Box::new(Expr::Binary {
                    op: BinOp::Mul,
                    lhs: Box::new(int(2)),
                    rhs: Box::new(Expr::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(Expr::Binary {
                            op: BinOp::Pow,
                            lhs: Box::new(int(3)),
                            rhs: Box::new(int(2)),
                        }),
                    }),
                }),
            }
        );

        assert_eq!(
            expr("a - b - c"),
            Expr::Binary {
                op: BinOp::Sub,
                lhs: Box::new(Expr::Binary {
                    op: BinOp::Sub,
                    lhs: Box::new(name("a")),
                    rhs: Box::new(name("b")),
                }),
                rhs: Box::new(name("c")),
            }
        );
    }

    #[test]
    fn comparisons() {
        assert_eq!(
            expr("a < b not in c"),
            Expr::Compare {
                first: Box::new(name("a")),
                rest: vec![(CmpOp::Lt, name("b")), (CmpOp::NotIn, name("c"))],
            }
        );
        assert_eq!(
            expr("a is not None"),
            Expr::Compare {
                first: Box::new(name("a")),
                rest: vec![(CmpOp::IsNot, Expr::Literal(Literal::None))],
            }
        );
        assert_eq!(
            expr("not x"),
            Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(name("x")),
            }
        );
    }

    #[test]
    fn keywords_are_not_names() {
        assert_eq!(expr("iffy"), name("iffy"));
        assert_eq!(expr("inner"), name("inner"));
        assert_eq!(expr("None"), Expr::Literal(Literal::None));
        assert_eq!(expr("Nonesuch"), name("Nonesuch"));
        assert!(parse("if = 1").is_err());
    }

    #[test]
    fn literals() {
        assert_eq!(expr("0x1f"), int(31));
        assert_eq!(expr("0b101"), int(5));
        assert_eq!(expr("1.5e3"), Expr::Literal(Literal::Float(1500.0)));
        assert_eq!(expr("-7"), int(-7));
        assert_eq!(expr("00"), int(0));
        assert_eq!(expr("'a\\tb'"), Expr::Literal(Literal::Str("a\tb".into())));
        assert_eq!(expr("r'a\\tb'"), Expr::Literal(Literal::Str("a\\tb".into())));
        assert_eq!(expr("'ab' \"cd\""), Expr::Literal(Literal::Str("abcd".into())));
        assert_eq!(expr("'\\x41\\u00e9'"), Expr::Literal(Literal::Str("Aé".into())));
        assert_eq!(expr("()"), Expr::Tuple(vec![]));
        assert_eq!(expr("(1,)"), Expr::Tuple(vec![int(1)]));
        assert_eq!(expr("(1)"), int(1));
        assert_eq!(expr("1, 2"), Expr::Tuple(vec![int(1), int(2)]));
        assert_eq!(
            expr("{'a': 1}"),
            Expr::Dict(vec![(Expr::Literal(Literal::Str("a".into())), int(1))])
        );
    }

    #[test]
    fn fstrings() {
        assert_eq!(
            expr("f'x={x!r:>4} {{ok}}'"),
            Expr::FString(vec![
                FStringPart::Literal("x=".into()),
                FStringPart::Field {
                    expr: name("x"),
                    conversion: Some('r'),
                    spec: ">4".into(),
                },
                FStringPart::Literal(" {ok}".into()),
            ])
        );
        assert_eq!(
            expr("f\"{a['k']}\""),
            Expr::FString(vec![FStringPart::Field {
                expr: Expr::Index {
                    object: Box::new(name("a")),
                    index: Box::new(Expr::Literal(Literal::Str("k".into()))),
                },
                conversion: None,
                spec: String::new(),
            }])
        );
        assert_eq!(error("f'{}'"), "f-string: empty expression not allowed (<string>, line 1)");
        assert_eq!(error("f'}'"), "f-string: single '}' is not allowed (<string>, line 1)");
    }

    #[test]
    fn assignments() {
        assert_eq!(
            body("a = b = 1"),
            vec![StmtKind::Assign {
                targets: vec![Target::Name("a".into()), Target::Name("b".into())],
                value: int(1),
            }]
        );
        assert_eq!(
            body("a, (b, c) = x"),
            vec![StmtKind::Assign {
                targets: vec![Target::Tuple(vec![
                    Target::Name("a".into()),
                    Target::Tuple(vec![Target::Name("b".into()), Target::Name("c".into())]),
                ])],
                value: name("x"),
            }]
        );
        assert_eq!(
            body("d[k] += 2"),
            vec![StmtKind::AugAssign {
                target: Target::Index {
                    object: name("d"),
                    index: name("k"),
                },
                op: BinOp::Add,
                value: int(2),
            }]
        );
        assert_eq!(
            body("x == 1"),
            vec![StmtKind::Expr(Expr::Compare {
                first: Box::new(name("x")),
                rest: vec![(CmpOp::Eq, int(1))],
            })]
        );
        assert_eq!(error("f() = 1"), "cannot assign to function call (<string>, line 1)");
    }

    #[test]
    fn compound_statements() {
        let program = body("if a:\n    b\nelif c:\n    d\nelse:\n    e\nf");
        assert_eq!(program.len(), 2);
        match &program[0] {
            StmtKind::If { branches, orelse } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(orelse.len(), 1);
            }
            other => panic!("unexpected: {:?}", other),
        }

        let program = body("for i in range(3): print(i); print(-i)");
        match &program[0] {
            StmtKind::For { target, body, .. } => {
                assert_eq!(*target, Target::Name("i".into()));
                assert_eq!(body.len(), 2);
            }
            other => panic!("unexpected: {:?}", other),
        }

        let program = body("try:\n  x\nexcept ValueError as e:\n  y\nfinally:\n  z");
        match &program[0] {
            StmtKind::Try {
                handlers,
                finalbody,
                ..
            } => {
                assert_eq!(handlers.len(), 1);
                assert_eq!(handlers[0].name, Some("e".to_owned()));
                assert_eq!(finalbody.len(), 1);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn function_locals() {
        let program = body(
            "def f(a, b=2):\n    global g\n    c = a\n    g = 1\n    for i in b: pass\n    return c",
        );
        match &program[0] {
            StmtKind::FunctionDef(def) => {
                let mut locals: Vec<&str> = def.locals.iter().map(|s| s.as_str()).collect();
                locals.sort();
                assert_eq!(locals, vec!["a", "b", "c", "i"]);
                assert!(def.globals.contains("g"));
                assert_eq!(def.params[1].default, Some(int(2)));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn comprehensions() {
        assert_eq!(
            expr("[x for x in y if x]"),
            Expr::ListComp {
                element: Box::new(name("x")),
                clauses: vec![Comprehension {
                    target: Target::Name("x".into()),
                    iter: name("y"),
                    conds: vec![name("x")],
                }],
            }
        );
        match expr("sum(x for x in y)") {
            Expr::Call { args, .. } => match &args[0] {
                Expr::ListComp { .. } => {}
                other => panic!("unexpected: {:?}", other),
            },
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn brackets_and_subscripts() {
        assert_eq!(expr("[1, 2,]"), Expr::List(vec![int(1), int(2)]));
        assert_eq!(expr("[]"), Expr::List(vec![]));
        assert_eq!(
            expr("x[1,]"),
            Expr::Index {
                object: Box::new(name("x")),
                index: Box::new(Expr::Tuple(vec![int(1)])),
            }
        );
        assert_eq!(
            expr("x[::2]"),
            Expr::Slice {
                object: Box::new(name("x")),
                lower: None,
                upper: None,
                step: Some(Box::new(int(2))),
            }
        );
        assert_eq!(
            expr("x[1:]"),
            Expr::Slice {
                object: Box::new(name("x")),
                lower: Some(Box::new(int(1))),
                upper: None,
                step: None,
            }
        );
        match expr("(x for x in y)") {
            Expr::ListComp { .. } => {}
            other => panic!("unexpected: {:?}", other),
        }
        match expr("{k: 1 for k in y}") {
            Expr::DictComp { .. } => {}
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(error("x[]"), "invalid syntax (<string>, line 1)");
        assert_eq!(error("f(a=1 for a in b)"), "invalid syntax (<string>, line 1)");
        assert!(parse("f(x for x in y, 1)").is_err());
    }

    #[test]
    fn deep_nesting() {
        // The parser recurses per level; give it the interpreter's stack.
        crate::exec::spawn(|| {
            // Each level used to be parsed several times over.
            let depth = 50;
            let parens = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
            assert_eq!(expr(&parens), int(1));

            let mut nested = Expr::List(vec![]);
            for _ in 1..depth {
                nested = Expr::List(vec![nested]);
            }
            assert_eq!(expr(&format!("{}{}", "[".repeat(depth), "]".repeat(depth))), nested);

            let mut nested = int(1);
            for _ in 0..depth {
                nested = Expr::Tuple(vec![nested]);
            }
            assert_eq!(expr(&format!("{}1{}", "(".repeat(depth), ",)".repeat(depth))), nested);

            assert!(parse(&format!("{}x{}", "f(".repeat(depth), ")".repeat(depth))).is_ok());
            assert!(parse(&format!("{}0{}", "a[".repeat(depth), "]".repeat(depth))).is_ok());
            assert!(parse(&format!("{}1{}", "{1: ".repeat(depth), "}".repeat(depth))).is_ok());
            assert!(parse(&format!("x = {}1", "-".repeat(1000))).is_ok());
            assert_eq!(
                parse(&format!("x = {}1", "-".repeat(50000))).unwrap_err().kind,
                ExceptionKind::RecursionError
            );
            assert_eq!(
                parse(&format!("f'{{{}1}}'", "-".repeat(50000))).unwrap_err().kind,
                ExceptionKind::RecursionError
            );
        })
        .unwrap();
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(error("print(1"), "invalid syntax (<string>, line 1)");
        assert_eq!(error("x = 1\n\ny = = 2"), "invalid syntax (<string>, line 3)");
        assert_eq!(error("break"), "'break' outside loop (<string>, line 1)");
        assert_eq!(
            error("x = 01"),
            "leading zeros in decimal integer literals are not permitted; \
             use an 0o prefix for octal integers (<string>, line 1)"
        );
        assert_eq!(error("return 1"), "'return' outside function (<string>, line 1)");
        assert_eq!(
            error("def f(a=1, b): pass"),
            "non-default argument follows default argument (<string>, line 1)"
        );
        assert_eq!(
            error("f(a=1, 2)"),
            "positional argument follows keyword argument (<string>, line 1)"
        );
        assert_eq!(parse("print(1").unwrap_err().kind, ExceptionKind::SyntaxError);
        assert!(parse("while x:\n    break").is_ok());
        assert!(parse("def f():\n    return").is_ok());
    }

    #[test]
    fn empty_programs() {
        assert_eq!(body(""), vec![]);
        assert_eq!(body("# just a comment"), vec![]);
    }
}
