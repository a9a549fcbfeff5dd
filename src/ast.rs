use std::collections::HashSet;
use std::rc::Rc;

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub body: Vec<Stmt>,
}

/// A statement and the source line it starts on.
#[derive(Debug, PartialEq, Clone)]
pub struct Stmt {
    pub line: usize,
    pub kind: StmtKind,
}

#[derive(Debug, PartialEq, Clone)]
pub enum StmtKind {
    Expr(Expr),
    // a = b = value
    Assign {
        targets: Vec<Target>,
        value: Expr,
    },
    // a += value
    AugAssign {
        target: Target,
        op: BinOp,
        value: Expr,
    },
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        orelse: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Target,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
    },
    FunctionDef(Rc<FunctionDef>),
    Return(Option<Expr>),
    Raise(Option<Expr>),
    Assert {
        test: Expr,
        msg: Option<Expr>,
    },
    Delete(Vec<Target>),
    Global(Vec<String>),
    // import math as m
    Import(Vec<(String, Option<String>)>),
    Pass,
    Break,
    Continue,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ExceptHandler {
    /// `None` for a bare `except:`.
    pub class: Option<Expr>,
    pub name: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

/// A `def` or a `lambda`.
#[derive(Debug, PartialEq, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    /// Names bound in the body, i.e. the function's local variables.
    pub locals: HashSet<String>,
    /// Names declared with `global`.
    pub globals: HashSet<String>,
}

/// The left-hand side of an assignment, a `for` target or a `del` operand.
#[derive(Debug, PartialEq, Clone)]
pub enum Target {
    Name(String),
    Index { object: Expr, index: Expr },
    Tuple(Vec<Target>),
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "** or pow()",
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// A piece of an f-string.
#[derive(Debug, PartialEq, Clone)]
pub enum FStringPart {
    Literal(String),
    // {expr!conversion:spec}
    Field {
        expr: Expr,
        conversion: Option<char>,
        spec: String,
    },
}

/// `for target in iter if cond ...` in a comprehension.
#[derive(Debug, PartialEq, Clone)]
pub struct Comprehension {
    pub target: Target,
    pub iter: Expr,
    pub conds: Vec<Expr>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Literal(Literal),
    FString(Vec<FStringPart>),
    Name(String),
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    ListComp {
        element: Box<Expr>,
        clauses: Vec<Comprehension>,
    },
    DictComp {
        key: Box<Expr>,
        value: Box<Expr>,
        clauses: Vec<Comprehension>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    BoolOp {
        op: BoolOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    // a < b <= c
    Compare {
        first: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
    // then if cond else orelse
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        orelse: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        object: Box<Expr>,
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    Attribute {
        object: Box<Expr>,
        name: String,
    },
    Lambda(Rc<FunctionDef>),
}
