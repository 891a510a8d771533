use std::collections::BTreeSet;

use crate::backend::liveness;
use crate::error::{CompileError, CompileResult};
use crate::ir::{Ir, StmtId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    registers: Vec<Option<usize>>,
    used: usize,
}

impl Allocation {
    pub fn get(&self, id: StmtId) -> Option<usize> {
        self.registers.get(id.0).copied().flatten()
    }

    /// Number of distinct registers the program touches.
    pub fn used(&self) -> usize {
        self.used
    }
}

/*
 * Linear scan over the statement order.
 *
 * - operands whose last reader is the current statement give their register
 *   back first, so a result may overwrite one of its own operands
 * - the result takes the lowest free register
 * - a result nobody reads is released right away
 *
 * With `max_registers == 0` every value gets its own register and nothing is
 * ever reused; the consumer allocates for itself. There is no spilling: when
 * all registers hold live values the compilation fails.
 */
pub fn allocate(ir: &Ir, max_registers: usize) -> CompileResult<Allocation> {
    let last_uses = liveness::last_uses(ir);
    let unbounded = max_registers == 0;

    let mut registers = vec![None; ir.len()];
    let mut free = BTreeSet::new();
    let mut next = 0;

    for (id, stmt) in ir.iter() {
        if !unbounded {
            for operand in stmt.kind.operands() {
                if last_uses[operand.0] == Some(id) {
                    if let Some(reg) = registers[operand.0] {
                        free.insert(reg);
                    }
                }
            }
        }

        if !stmt.kind.has_value() {
            continue;
        }

        let reg = match free.pop_first() {
            Some(reg) => reg,
            None if unbounded || next < max_registers => {
                next += 1;
                next - 1
            }
            None => {
                return Err(CompileError::RegisterOverflow {
                    required: next + 1,
                    available: max_registers,
                    statement: format!("{} {}", id, stmt),
                });
            }
        };
        registers[id.0] = Some(reg);

        if !unbounded && last_uses[id.0].is_none() {
            free.insert(reg);
        }
    }

    log::trace!("allocated {} register(s) for {} statements", next, ir.len());
    Ok(Allocation { registers, used: next })
}
