use rustc_hash::FxHashMap;

use crate::error::CompileResult;
use crate::ir::visitor::{Pass, Rewriter};
use crate::ir::{Statement, StmtId, StmtKind, StmtTag};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Global {
    Symbol(String),
    Param(String),
}

/// Loads each global channel once and reuses the loaded value for every later
/// read. A store makes the stored value the current one for the channels it
/// writes.
#[derive(Default)]
pub struct GlobalLocalize {
    locals: FxHashMap<(Global, Option<usize>), StmtId>,
}

// `None` stands for every channel of the global
fn overlaps(a: Option<usize>, b: Option<usize>) -> bool {
    a.is_none() || b.is_none() || a == b
}

impl GlobalLocalize {
    fn load<'a>(&mut self, rw: &mut Rewriter<'a>, id: StmtId, key: (Global, Option<usize>)) -> CompileResult<()> {
        if let Some(&local) = self.locals.get(&key) {
            rw.mark_replacement(id, local);
        } else {
            let local = rw.keep(id)?;
            self.locals.insert(key, local);
        }
        Ok(())
    }
}

impl Pass for GlobalLocalize {
    const NAME: &'static str = "global_localize";
    const HANDLES: &'static [StmtTag] = &[StmtTag::SymbolRef, StmtTag::ParamRef, StmtTag::Assign];

    fn visit<'a>(&mut self, rw: &mut Rewriter<'a>, id: StmtId, stmt: &'a Statement) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::SymbolRef { name, channel } => {
                self.load(rw, id, (Global::Symbol(name.clone()), *channel))
            }

            StmtKind::ParamRef { name, channel } => {
                self.load(rw, id, (Global::Param(name.clone()), *channel))
            }

            StmtKind::Assign { name, channel, src } => {
                rw.keep(id)?;
                let value = rw.resolve(*src)?;

                let written = Global::Symbol(name.clone());
                self.locals.retain(|(global, ch), _| !(*global == written && overlaps(*ch, *channel)));

                // A broadcast store leaves a scalar, reads of the whole vector reload
                if rw.output().get(value).dim == stmt.dim {
                    self.locals.insert((written, *channel), value);
                }
                Ok(())
            }

            _ => rw.keep(id).map(drop),
        }
    }
}
