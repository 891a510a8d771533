use chumsky::span::SimpleSpan;

pub type Span = SimpleSpan;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    // `let t = @pos.x * 2`
    Let { name: String, value: Expr },
    // `@clr.y = t` or `t = t + 1`
    Assign { target: Name, value: Expr },
}

/// Which namespace a name was written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    // `name`: locals, then symbols, then parameters
    Any,
    // `@name`
    Symbol,
    // `$name`
    Param,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub scope: Scope,
    pub name: String,
    pub channel: Option<usize>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number { value: f32 },
    Name(Name),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    FnCall { name: String, args: Vec<Expr>, span: Span },
}
