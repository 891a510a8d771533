use rustc_hash::FxHashMap;

use crate::error::CompileResult;
use crate::ir::visitor::{Pass, Rewriter};
use crate::ir::{Statement, StmtId, StmtKind, StmtTag};

/// Hoists literals into synthetic scalar parameters `%c0`, `%c1`, ...
///
/// Equal literals share one parameter. The values are handed back through
/// [`ConstParametrize::into_constants`] so the caller can bind them.
#[derive(Default)]
pub struct ConstParametrize {
    constants: Vec<(String, f32)>,
    by_bits: FxHashMap<u32, usize>,
}

impl ConstParametrize {
    pub fn into_constants(self) -> Vec<(String, f32)> {
        self.constants
    }

    fn intern(&mut self, value: f32) -> String {
        let next = self.constants.len();
        let index = *self.by_bits.entry(value.to_bits()).or_insert(next);
        if index == next {
            self.constants.push((format!("%c{}", index), value));
        }
        self.constants[index].0.clone()
    }
}

impl Pass for ConstParametrize {
    const NAME: &'static str = "const_parametrize";
    const HANDLES: &'static [StmtTag] = &[StmtTag::Literal];

    fn visit<'a>(&mut self, rw: &mut Rewriter<'a>, id: StmtId, stmt: &'a Statement) -> CompileResult<()> {
        let StmtKind::Literal { value } = stmt.kind else {
            return rw.keep(id).map(drop);
        };

        let name = self.intern(value);
        let param = rw.emit(StmtKind::ParamRef { name, channel: Some(0) }, 1);
        rw.mark_replacement(id, param);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{build_ir, compile_to_assembly};
    use crate::ir::visitor;
    use crate::options::Options;

    fn options() -> Options {
        let mut options = Options::for_x64().with_symbol("x", 1).with_symbol("y", 1);
        options.demote_math_funcs = false;
        options
    }

    #[test]
    fn test_literals_become_parameters() {
        let ir = build_ir("y = x * 2 + 2 * 0.5", &Options::for_cuda().with_symbol("x", 1).with_symbol("y", 1)).unwrap();
        let mut pass = ConstParametrize::default();
        let out = visitor::apply(&mut pass, &ir).unwrap();

        assert_eq!(out.len(), ir.len());
        assert!(out.iter().all(|(_, s)| s.kind.tag() != StmtTag::Literal));
        assert_eq!(
            pass.into_constants(),
            vec![("%c0".to_string(), 2.0), ("%c1".to_string(), 0.5)]
        );
    }

    #[test]
    fn test_program_tables() {
        let program = compile_to_assembly("y = x * 2 + 2 * 0.5", &options()).unwrap();
        assert_eq!(program.params(), &[("%c0".to_string(), 1), ("%c1".to_string(), 1)]);
        assert_eq!(program.constants(), &[("%c0".to_string(), 2.0), ("%c1".to_string(), 0.5)]);
        assert!(!program.assembly().contains("ldi"));
    }

    #[test]
    fn test_disabled_keeps_literals_inline() {
        let mut options = options();
        options.const_parametrize = false;
        let program = compile_to_assembly("y = x * 2", &options).unwrap();
        assert!(program.params().is_empty());
        assert!(program.assembly().contains("ldi r1 2"), "{}", program.assembly());
    }
}
