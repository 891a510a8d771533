use crate::ir::{Ir, StmtId};

/// For each statement, the last statement that reads its result.
///
/// The IR is a single straight-line block, so one forward sweep is enough:
/// every read overwrites the previous candidate.
pub fn last_uses(ir: &Ir) -> Vec<Option<StmtId>> {
    let mut result = vec![None; ir.len()];

    for (id, stmt) in ir.iter() {
        for operand in stmt.kind.operands() {
            result[operand.0] = Some(id);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, Statement, StmtKind};

    #[test]
    fn test_simple_liveness() {
        // x = @a; t = x * x; @b = t; dead = 1
        let mut ir = Ir::new();
        let x = ir.push(Statement::new(StmtKind::SymbolRef { name: "a".into(), channel: None }, 1));
        let t = ir.push(Statement::new(StmtKind::BinaryOp { op: BinaryOp::Mul, lhs: x, rhs: x }, 1));
        let store = ir.push(Statement::new(StmtKind::Assign { name: "b".into(), channel: None, src: t }, 1));
        let dead = ir.push(Statement::new(StmtKind::Literal { value: 1.0 }, 1));

        let result = last_uses(&ir);
        assert_eq!(result[x.0], Some(t));
        assert_eq!(result[t.0], Some(store));
        assert_eq!(result[store.0], None);
        assert_eq!(result[dead.0], None);
    }
}
