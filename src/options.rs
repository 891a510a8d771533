use std::collections::BTreeMap;
use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};

/// Channels a symbol or parameter may carry (`x`, `y`, `z`, `w`).
pub const MAX_CHANNELS: usize = 4;

/// Compilation options: which passes run, the register budget of the target,
/// and the symbols/parameters the runtime binds.
///
/// Declarations live in ordered maps so that [`Options::dump`] does not depend
/// on the order in which they were declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub const_parametrize: bool,
    pub global_localize: bool,
    pub demote_math_funcs: bool,
    pub reassign_channels: bool,
    pub arch_maxregs: usize,

    pub symbols: BTreeMap<String, usize>,
    pub params: BTreeMap<String, usize>,
}

impl Default for Options {
    fn default() -> Self {
        Self::for_x64()
    }
}

impl Options {
    /// Scalar CPU target: every pass on, eight registers.
    pub fn for_x64() -> Self {
        Self {
            const_parametrize: true,
            global_localize: true,
            demote_math_funcs: true,
            reassign_channels: true,
            arch_maxregs: 8,
            symbols: BTreeMap::new(),
            params: BTreeMap::new(),
        }
    }

    /// GPU target: the downstream code generator does its own allocation and
    /// has native math functions.
    pub fn for_cuda() -> Self {
        Self {
            const_parametrize: false,
            global_localize: false,
            demote_math_funcs: false,
            reassign_channels: true,
            arch_maxregs: 0,
            symbols: BTreeMap::new(),
            params: BTreeMap::new(),
        }
    }

    pub fn define_symbol(&mut self, name: impl Into<String>, dim: usize) {
        self.symbols.insert(name.into(), dim);
    }

    pub fn define_param(&mut self, name: impl Into<String>, dim: usize) {
        self.params.insert(name.into(), dim);
    }

    pub fn with_symbol(mut self, name: impl Into<String>, dim: usize) -> Self {
        self.define_symbol(name, dim);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, dim: usize) -> Self {
        self.define_param(name, dim);
        self
    }

    pub fn symbol_dim(&self, name: &str) -> Option<usize> {
        self.symbols.get(name).copied()
    }

    pub fn param_dim(&self, name: &str) -> Option<usize> {
        self.params.get(name).copied()
    }

    pub fn validate(&self) -> CompileResult<()> {
        let declared = self.symbols.iter().map(|d| ("symbol", d))
            .chain(self.params.iter().map(|d| ("parameter", d)));

        for (what, (name, &dim)) in declared {
            if dim == 0 || dim > MAX_CHANNELS {
                return Err(CompileError::InvalidOptions {
                    message: format!(
                        "{} `{}` has dimension {}, expected 1 to {}",
                        what, name, dim, MAX_CHANNELS
                    ),
                });
            }
        }
        Ok(())
    }

    /*
     * Deterministic dump used as part of the cache fingerprint:
     *   /sym/dim ... \param\dim ... |const|localize|demote|reassign|maxregs
     */
    pub fn dump(&self, out: &mut impl Write) -> fmt::Result {
        for (name, dim) in &self.symbols {
            write!(out, "/{}/{}", name, dim)?;
        }
        for (name, dim) in &self.params {
            write!(out, "\\{}\\{}", name, dim)?;
        }
        write!(out, "|{}", self.const_parametrize as u8)?;
        write!(out, "|{}", self.global_localize as u8)?;
        write!(out, "|{}", self.demote_math_funcs as u8)?;
        write!(out, "|{}", self.reassign_channels as u8)?;
        write!(out, "|{}", self.arch_maxregs)
    }
}
