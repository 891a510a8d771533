pub mod generator;
pub mod liveness;
pub mod regalloc;

#[cfg(test)]
pub mod eval;

use crate::error::CompileResult;
use crate::ir::Ir;
use crate::options::Options;

pub use generator::Output;

/// Allocate registers for a fully rewritten IR and serialize it to assembly.
pub fn assemble(ir: &Ir, options: &Options) -> CompileResult<(Output, usize)> {
    let allocation = regalloc::allocate(ir, options.arch_maxregs)?;
    let output = generator::generate(ir, &allocation, options)?;
    Ok((output, allocation.used()))
}
