use rustc_hash::FxHashMap;

use crate::error::{CompileError, CompileResult};
use crate::ir::{Ir, Statement, StmtId, StmtKind, StmtTag};

/// Builds the output IR of one pass run.
///
/// `replacements` maps statements of the input IR to their counterpart in the
/// output IR. It lives only as long as the run, and output statements are
/// append-only.
pub struct Rewriter<'a> {
    pass: &'static str,
    input: &'a Ir,
    output: Ir,
    replacements: FxHashMap<StmtId, StmtId>,
}

impl<'a> Rewriter<'a> {
    fn new(pass: &'static str, input: &'a Ir) -> Self {
        Self {
            pass,
            input,
            output: Ir::new(),
            replacements: FxHashMap::default(),
        }
    }

    pub fn output(&self) -> &Ir {
        &self.output
    }

    /// Append a new statement whose operands already refer to the output IR.
    pub fn emit(&mut self, kind: StmtKind, dim: usize) -> StmtId {
        self.output.push(Statement::new(kind, dim))
    }

    /// Output statement standing in for input statement `old`.
    pub fn resolve(&self, old: StmtId) -> CompileResult<StmtId> {
        self.replacements.get(&old).copied().ok_or_else(|| {
            CompileError::structure(self.pass, format!("dangling operand {}", old))
        })
    }

    pub fn mark_replacement(&mut self, old: StmtId, new: StmtId) {
        self.replacements.insert(old, new);
    }

    /// Clone input statement `old` into the output with remapped operands.
    pub fn keep(&mut self, old: StmtId) -> CompileResult<StmtId> {
        let input = self.input;
        let stmt = input.get(old);
        let kind = stmt.kind.map_operands(|operand| self.resolve(operand))?;
        let new = self.emit(kind, stmt.dim);
        self.mark_replacement(old, new);
        Ok(new)
    }

    fn finish(self) -> CompileResult<Ir> {
        self.output.validate(self.pass)?;
        Ok(self.output)
    }
}

/// An IR to IR transformation.
///
/// Statements whose tag is listed in `HANDLES` are given to [`Pass::visit`];
/// everything else is kept as is. A visited statement may be replaced by any
/// number of new statements, or dropped, as long as later users of it can
/// still be resolved through [`Rewriter::mark_replacement`].
pub trait Pass {
    const NAME: &'static str;
    const HANDLES: &'static [StmtTag];

    fn visit<'a>(
        &mut self,
        rw: &mut Rewriter<'a>,
        id: StmtId,
        stmt: &'a Statement,
    ) -> CompileResult<()>;
}

pub fn apply<P: Pass>(pass: &mut P, ir: &Ir) -> CompileResult<Ir> {
    let mut rw = Rewriter::new(P::NAME, ir);

    for (id, stmt) in ir.iter() {
        if P::HANDLES.contains(&stmt.kind.tag()) {
            pass.visit(&mut rw, id, stmt)?;
        } else {
            rw.keep(id)?;
        }
    }

    let output = rw.finish()?;
    log::trace!("pass {}: {} -> {} statements", P::NAME, ir.len(), output.len());
    Ok(output)
}
