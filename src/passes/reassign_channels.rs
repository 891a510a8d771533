use rustc_hash::FxHashMap;

use crate::error::{CompileError, CompileResult};
use crate::ir::visitor::{Pass, Rewriter};
use crate::ir::{Statement, StmtId, StmtKind, StmtTag};

/// Splits every vector statement into one scalar statement per channel.
///
/// `lanes` maps an input statement to the scalar output statements holding
/// its channels. Width-1 values have a single lane that broadcasts to any
/// channel.
#[derive(Default)]
pub struct ReassignChannels {
    lanes: FxHashMap<StmtId, Vec<StmtId>>,
}

impl ReassignChannels {
    fn lane(&self, old: StmtId, channel: usize) -> CompileResult<StmtId> {
        let lanes = self.lanes.get(&old).ok_or_else(|| {
            CompileError::structure(Self::NAME, format!("dangling operand {}", old))
        })?;

        match lanes.len() {
            1 => Ok(lanes[0]),
            n if channel < n => Ok(lanes[channel]),
            n => Err(CompileError::structure(
                Self::NAME,
                format!("channel {} of {} which has {} channel(s)", channel, old, n),
            )),
        }
    }

    fn record(&mut self, rw: &mut Rewriter<'_>, id: StmtId, lanes: Vec<StmtId>) {
        if lanes.len() == 1 {
            rw.mark_replacement(id, lanes[0]);
        }
        self.lanes.insert(id, lanes);
    }

    fn lane_wise<F>(&self, rw: &mut Rewriter<'_>, dim: usize, mut make: F) -> CompileResult<Vec<StmtId>>
    where
        F: FnMut(&Self, usize) -> CompileResult<StmtKind>,
    {
        let mut lanes = Vec::with_capacity(dim);
        for channel in 0..dim {
            let kind = make(self, channel)?;
            lanes.push(rw.emit(kind, 1));
        }
        Ok(lanes)
    }
}

impl Pass for ReassignChannels {
    const NAME: &'static str = "reassign_channels";
    const HANDLES: &'static [StmtTag] = &[
        StmtTag::Literal,
        StmtTag::SymbolRef,
        StmtTag::ParamRef,
        StmtTag::UnaryOp,
        StmtTag::BinaryOp,
        StmtTag::FunctionCall,
        StmtTag::Component,
        StmtTag::Pack,
        StmtTag::Assign,
    ];

    fn visit<'a>(&mut self, rw: &mut Rewriter<'a>, id: StmtId, stmt: &'a Statement) -> CompileResult<()> {
        let dim = stmt.dim;

        let lanes = match &stmt.kind {
            StmtKind::Literal { .. }
            | StmtKind::SymbolRef { channel: Some(_), .. }
            | StmtKind::ParamRef { channel: Some(_), .. } => vec![rw.keep(id)?],

            StmtKind::SymbolRef { name, channel: None } => (0..dim)
                .map(|c| rw.emit(StmtKind::SymbolRef { name: name.clone(), channel: Some(c) }, 1))
                .collect(),

            StmtKind::ParamRef { name, channel: None } => (0..dim)
                .map(|c| rw.emit(StmtKind::ParamRef { name: name.clone(), channel: Some(c) }, 1))
                .collect(),

            StmtKind::UnaryOp { op, src } => self.lane_wise(rw, dim, |this, c| {
                Ok(StmtKind::UnaryOp { op: *op, src: this.lane(*src, c)? })
            })?,

            StmtKind::BinaryOp { op, lhs, rhs } => self.lane_wise(rw, dim, |this, c| {
                Ok(StmtKind::BinaryOp { op: *op, lhs: this.lane(*lhs, c)?, rhs: this.lane(*rhs, c)? })
            })?,

            StmtKind::FunctionCall { name, args } => self.lane_wise(rw, dim, |this, c| {
                let args = args.iter().map(|&a| this.lane(a, c)).collect::<CompileResult<_>>()?;
                Ok(StmtKind::FunctionCall { name: name.clone(), args })
            })?,

            StmtKind::Component { src, channel } => vec![self.lane(*src, *channel)?],

            StmtKind::Pack { args } => args
                .iter()
                .map(|&a| self.lane(a, 0))
                .collect::<CompileResult<_>>()?,

            StmtKind::Assign { name, channel, src } => {
                let channels = match channel {
                    Some(c) => *c..*c + 1,
                    None => 0..dim,
                };
                for c in channels {
                    let src = self.lane(*src, c)?;
                    rw.emit(StmtKind::Assign { name: name.clone(), channel: Some(c), src }, 1);
                }
                return Ok(());
            }
        };

        self.record(rw, id, lanes);
        Ok(())
    }
}
