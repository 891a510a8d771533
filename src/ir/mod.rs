//! Statement graph shared by every pass.
//!
//! An [`Ir`] is an arena of [`Statement`]s in evaluation order. Operands are
//! [`StmtId`] indices into the same arena, so common subexpressions are shared
//! by index and the graph stays a DAG. Passes never mutate a statement; they
//! build a new `Ir` through [`visitor::Rewriter`].

pub mod lower;
pub mod visitor;

use std::fmt;

use crate::error::{CompileError, CompileResult};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StmtId(pub usize);

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl UnaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
        }
    }
}

impl BinaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
        }
    }
}

/// Payload-free discriminant of [`StmtKind`], used by passes to declare
/// which statements they handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtTag {
    Literal,
    SymbolRef,
    ParamRef,
    UnaryOp,
    BinaryOp,
    FunctionCall,
    Component,
    Pack,
    Assign,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Literal { value: f32 },
    SymbolRef { name: String, channel: Option<usize> },
    ParamRef { name: String, channel: Option<usize> },
    UnaryOp { op: UnaryOp, src: StmtId },
    BinaryOp { op: BinaryOp, lhs: StmtId, rhs: StmtId },
    FunctionCall { name: String, args: Vec<StmtId> },
    // One channel of a vector value
    Component { src: StmtId, channel: usize },
    // Scalars packed into a vector, one per channel
    Pack { args: Vec<StmtId> },
    Assign { name: String, channel: Option<usize>, src: StmtId },
}

impl StmtKind {
    pub fn tag(&self) -> StmtTag {
        match self {
            StmtKind::Literal { .. } => StmtTag::Literal,
            StmtKind::SymbolRef { .. } => StmtTag::SymbolRef,
            StmtKind::ParamRef { .. } => StmtTag::ParamRef,
            StmtKind::UnaryOp { .. } => StmtTag::UnaryOp,
            StmtKind::BinaryOp { .. } => StmtTag::BinaryOp,
            StmtKind::FunctionCall { .. } => StmtTag::FunctionCall,
            StmtKind::Component { .. } => StmtTag::Component,
            StmtKind::Pack { .. } => StmtTag::Pack,
            StmtKind::Assign { .. } => StmtTag::Assign,
        }
    }

    pub fn operands(&self) -> Vec<StmtId> {
        match self {
            StmtKind::Literal { .. } | StmtKind::SymbolRef { .. } | StmtKind::ParamRef { .. } => vec![],
            StmtKind::UnaryOp { src, .. }
            | StmtKind::Component { src, .. }
            | StmtKind::Assign { src, .. } => vec![*src],
            StmtKind::BinaryOp { lhs, rhs, .. } => vec![*lhs, *rhs],
            StmtKind::FunctionCall { args, .. } | StmtKind::Pack { args } => args.clone(),
        }
    }

    /// Copy of this kind with every operand passed through `f`.
    pub fn map_operands<F>(&self, mut f: F) -> CompileResult<StmtKind>
    where
        F: FnMut(StmtId) -> CompileResult<StmtId>,
    {
        Ok(match self {
            StmtKind::Literal { .. } | StmtKind::SymbolRef { .. } | StmtKind::ParamRef { .. } => self.clone(),
            StmtKind::UnaryOp { op, src } => StmtKind::UnaryOp { op: *op, src: f(*src)? },
            StmtKind::BinaryOp { op, lhs, rhs } => StmtKind::BinaryOp {
                op: *op,
                lhs: f(*lhs)?,
                rhs: f(*rhs)?,
            },
            StmtKind::FunctionCall { name, args } => StmtKind::FunctionCall {
                name: name.clone(),
                args: args.iter().map(|&a| f(a)).collect::<CompileResult<_>>()?,
            },
            StmtKind::Component { src, channel } => StmtKind::Component { src: f(*src)?, channel: *channel },
            StmtKind::Pack { args } => StmtKind::Pack {
                args: args.iter().map(|&a| f(a)).collect::<CompileResult<_>>()?,
            },
            StmtKind::Assign { name, channel, src } => StmtKind::Assign {
                name: name.clone(),
                channel: *channel,
                src: f(*src)?,
            },
        })
    }

    /// Whether the statement produces a value that needs a register.
    pub fn has_value(&self) -> bool {
        !matches!(self, StmtKind::Assign { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StmtKind,
    // Result width, or the number of channels written for `Assign`
    pub dim: usize,
}

impl Statement {
    pub fn new(kind: StmtKind, dim: usize) -> Self {
        Self { kind, dim }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ir {
    stmts: Vec<Statement>,
}

impl Ir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stmt: Statement) -> StmtId {
        let id = StmtId(self.stmts.len());
        self.stmts.push(stmt);
        id
    }

    pub fn get(&self, id: StmtId) -> &Statement {
        &self.stmts[id.0]
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StmtId, &Statement)> + '_ {
        self.stmts.iter().enumerate().map(|(i, s)| (StmtId(i), s))
    }

    /// Every operand must name an earlier statement of this same IR.
    pub fn validate(&self, pass: &'static str) -> CompileResult<()> {
        for (id, stmt) in self.iter() {
            for operand in stmt.kind.operands() {
                if operand >= id {
                    return Err(CompileError::structure(
                        pass,
                        format!("{} refers to {} which is not defined before it", id, operand),
                    ));
                }
                if !self.get(operand).kind.has_value() {
                    return Err(CompileError::structure(
                        pass,
                        format!("{} uses the result of assignment {}", id, operand),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn channel_suffix(channel: Option<usize>) -> String {
    channel.map_or(String::new(), |c| format!(".{}", ['x', 'y', 'z', 'w'][c.min(3)]))
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StmtKind::Literal { value } => write!(f, "{}", value),
            StmtKind::SymbolRef { name, channel } => write!(f, "@{}{}", name, channel_suffix(*channel)),
            StmtKind::ParamRef { name, channel } => write!(f, "${}{}", name, channel_suffix(*channel)),
            StmtKind::UnaryOp { op, src } => write!(f, "{} {}", op.mnemonic(), src),
            StmtKind::BinaryOp { op, lhs, rhs } => write!(f, "{} {} {}", op.mnemonic(), lhs, rhs),
            StmtKind::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            StmtKind::Component { src, channel } => write!(f, "{}{}", src, channel_suffix(Some(*channel))),
            StmtKind::Pack { args } => {
                write!(f, "pack")?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
            StmtKind::Assign { name, channel, src } => {
                write!(f, "@{}{} = {}", name, channel_suffix(*channel), src)
            }
        }
    }
}

impl fmt::Display for Ir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, stmt) in self.iter() {
            writeln!(f, "{}:{} {}", id, stmt.dim, stmt)?;
        }
        Ok(())
    }
}
