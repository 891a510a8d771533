//! Compiler driver: parse, lower, rewrite, allocate, generate, and a cache of
//! finished programs keyed by source and options.

use std::fmt::Write;
use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::FxHashMap;

use crate::backend;
use crate::error::CompileResult;
use crate::frontend::parser;
use crate::ir::visitor;
use crate::ir::{lower, Ir, StmtKind};
use crate::options::Options;
use crate::passes::{self, ConstParametrize, GlobalLocalize, MathFunctions, ReassignChannels};
use crate::program::Program;

fn run_passes(code: &str, options: &Options) -> CompileResult<(Ir, Vec<(String, f32)>)> {
    options.validate()?;

    let ast = parser::parse(code)?;
    let mut ir = lower::lower(code, &ast, options)?;
    log::debug!("lowered {} statement(s)", ir.len());

    for (_, stmt) in ir.iter() {
        if let StmtKind::FunctionCall { name, args } = &stmt.kind {
            passes::math_functions::check_call(name, args.len())?;
        }
    }

    if options.demote_math_funcs {
        ir = visitor::apply(&mut MathFunctions, &ir)?;
    }
    if options.reassign_channels {
        ir = visitor::apply(&mut ReassignChannels::default(), &ir)?;
    }
    if options.global_localize {
        ir = visitor::apply(&mut GlobalLocalize::default(), &ir)?;
    }

    let mut constants = Vec::new();
    if options.const_parametrize {
        let mut pass = ConstParametrize::default();
        ir = visitor::apply(&mut pass, &ir)?;
        constants = pass.into_constants();
    }

    log::debug!("{} statement(s) after rewriting", ir.len());
    Ok((ir, constants))
}

/// Parse `code` and run every enabled pass, stopping before register
/// allocation.
pub fn build_ir(code: &str, options: &Options) -> CompileResult<Ir> {
    run_passes(code, options).map(|(ir, _)| ir)
}

/// Compile `code` all the way to assembly.
pub fn compile_to_assembly(code: &str, options: &Options) -> CompileResult<Program> {
    let (ir, constants) = run_passes(code, options)?;
    let (output, registers) = backend::assemble(&ir, options)?;
    log::debug!("compiled {} instruction(s) using {} register(s)", ir.len(), registers);
    Ok(Program::new(output.assembly, output.symbols, output.params, constants, registers))
}

/// Cache key: the source text, an end marker, then the options dump.
pub fn fingerprint(code: &str, options: &Options) -> CompileResult<String> {
    let mut key = String::with_capacity(code.len() + 64);
    write!(key, "{}<EOF>", code)?;
    options.dump(&mut key)?;
    Ok(key)
}

/// Compiles programs once and hands out shared copies afterwards. Entries are
/// never evicted and failures are never stored.
#[derive(Default)]
pub struct Compiler {
    cache: Mutex<FxHashMap<String, Arc<Program>>>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compile(&self, code: &str, options: &Options) -> CompileResult<Arc<Program>> {
        let key = fingerprint(code, options)?;

        // a panic while compiling cannot leave a half-written entry behind
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(program) = cache.get(&key) {
            log::debug!("cache hit");
            return Ok(Arc::clone(program));
        }

        log::debug!("cache miss, compiling");
        let program = Arc::new(compile_to_assembly(code, options)?);
        cache.insert(key, Arc::clone(&program));
        Ok(program)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
