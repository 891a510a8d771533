use std::fmt::Write;

use rustc_hash::FxHashMap;

use crate::backend::regalloc::Allocation;
use crate::error::{CompileError, CompileResult};
use crate::ir::{Ir, StmtId, StmtKind};
use crate::options::Options;
use crate::passes::math_functions;

/// Ordered, deduplicated (name, dimension) table. An entry's position is the
/// id the assembly refers to it by.
#[derive(Debug, Default)]
pub struct Table {
    entries: Vec<(String, usize)>,
    ids: FxHashMap<String, usize>,
}

impl Table {
    fn intern(&mut self, name: &str, dim: usize) -> usize {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.entries.len();
        self.entries.push((name.to_string(), dim));
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn into_entries(self) -> Vec<(String, usize)> {
        self.entries
    }
}

#[derive(Debug)]
pub struct Output {
    pub assembly: String,
    pub symbols: Vec<(String, usize)>,
    pub params: Vec<(String, usize)>,
}

fn width(dim: usize) -> String {
    if dim > 1 { format!(".{}", dim) } else { String::new() }
}

// `@id.c` for one channel, `@id` for the whole vector
fn slot(sigil: char, id: usize, channel: Option<usize>, dim: usize) -> String {
    match channel {
        Some(c) => format!("{}{}.{}", sigil, id, c),
        None if dim == 1 => format!("{}{}.0", sigil, id),
        None => format!("{}{}", sigil, id),
    }
}

struct Generator<'a> {
    options: &'a Options,
    allocation: &'a Allocation,
    symbols: Table,
    params: Table,
}

impl Generator<'_> {
    fn reg(&self, id: StmtId) -> CompileResult<String> {
        self.allocation
            .get(id)
            .map(|r| format!("r{}", r))
            .ok_or_else(|| CompileError::structure("generator", format!("{} has no register", id)))
    }

    fn regs(&self, ids: &[StmtId]) -> CompileResult<String> {
        let regs = ids.iter().map(|&id| self.reg(id)).collect::<CompileResult<Vec<_>>>()?;
        Ok(regs.join(" "))
    }

    fn symbol(&mut self, name: &str) -> CompileResult<usize> {
        let dim = self.options.symbol_dim(name).ok_or_else(|| {
            CompileError::structure("generator", format!("undeclared symbol `{}`", name))
        })?;
        Ok(self.symbols.intern(name, dim))
    }

    fn param(&mut self, name: &str) -> CompileResult<usize> {
        // synthetic `%cN` parameters hold one hoisted literal each
        let dim = match self.options.param_dim(name) {
            Some(dim) => dim,
            None if name.starts_with('%') => 1,
            None => {
                return Err(CompileError::structure("generator", format!("undeclared parameter `{}`", name)));
            }
        };
        Ok(self.params.intern(name, dim))
    }

    fn instruction(&mut self, out: &mut String, id: StmtId, kind: &StmtKind, dim: usize) -> CompileResult<()> {
        let w = width(dim);

        match kind {
            StmtKind::Literal { value } => {
                writeln!(out, "ldi {} {}", self.reg(id)?, value)?;
            }

            StmtKind::SymbolRef { name, channel } => {
                let sym = self.symbol(name)?;
                writeln!(out, "lds{} {} {}", w, self.reg(id)?, slot('@', sym, *channel, dim))?;
            }

            StmtKind::ParamRef { name, channel } => {
                let par = self.param(name)?;
                writeln!(out, "ldp{} {} {}", w, self.reg(id)?, slot('$', par, *channel, dim))?;
            }

            StmtKind::UnaryOp { op, src } => {
                writeln!(out, "{}{} {} {}", op.mnemonic(), w, self.reg(id)?, self.reg(*src)?)?;
            }

            StmtKind::BinaryOp { op, lhs, rhs } => {
                writeln!(
                    out,
                    "{}{} {} {} {}",
                    op.mnemonic(), w, self.reg(id)?, self.reg(*lhs)?, self.reg(*rhs)?
                )?;
            }

            StmtKind::FunctionCall { name, args } => {
                math_functions::check_call(name, args.len())?;
                writeln!(out, "call{} {} {} {}", w, name, self.reg(id)?, self.regs(args)?)?;
            }

            StmtKind::Component { src, channel } => {
                writeln!(out, "ext {} {} {}", self.reg(id)?, self.reg(*src)?, channel)?;
            }

            StmtKind::Pack { args } => {
                writeln!(out, "pack{} {} {}", w, self.reg(id)?, self.regs(args)?)?;
            }

            StmtKind::Assign { name, channel, src } => {
                let sym = self.symbol(name)?;
                writeln!(out, "sts{} {} {}", w, slot('@', sym, *channel, dim), self.reg(*src)?)?;
            }
        }
        Ok(())
    }
}

/// Serialize `ir` in order, one instruction per statement, building the
/// symbol and parameter tables in order of first use.
pub fn generate(ir: &Ir, allocation: &Allocation, options: &Options) -> CompileResult<Output> {
    let mut gen = Generator {
        options,
        allocation,
        symbols: Table::default(),
        params: Table::default(),
    };

    let mut assembly = String::new();
    for (id, stmt) in ir.iter() {
        gen.instruction(&mut assembly, id, &stmt.kind, stmt.dim)?;
    }

    Ok(Output {
        assembly,
        symbols: gen.symbols.into_entries(),
        params: gen.params.into_entries(),
    })
}
