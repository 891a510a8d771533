use std::fmt;

/// A compiled expression: assembly text plus the tables a runtime needs to
/// bind it. `@N` in the assembly is `symbols()[N]`, `$N` is `params()[N]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    assembly: String,
    symbols: Vec<(String, usize)>,
    params: Vec<(String, usize)>,
    constants: Vec<(String, f32)>,
    registers: usize,
}

impl Program {
    pub(crate) fn new(
        assembly: String,
        symbols: Vec<(String, usize)>,
        params: Vec<(String, usize)>,
        constants: Vec<(String, f32)>,
        registers: usize,
    ) -> Self {
        Self { assembly, symbols, params, constants, registers }
    }

    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    pub fn symbols(&self) -> &[(String, usize)] {
        &self.symbols
    }

    pub fn params(&self) -> &[(String, usize)] {
        &self.params
    }

    /// Values of the hoisted literal parameters, in `%cN` order.
    pub fn constants(&self) -> &[(String, f32)] {
        &self.constants
    }

    /// Registers the assembly touches.
    pub fn registers(&self) -> usize {
        self.registers
    }

    pub fn symbol_id(&self, name: &str, dim: usize) -> Option<usize> {
        self.symbols.iter().position(|(n, d)| n == name && *d == dim)
    }

    pub fn param_id(&self, name: &str, dim: usize) -> Option<usize> {
        self.params.iter().position(|(n, d)| n == name && *d == dim)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.assembly)?;
        for (id, (name, dim)) in self.symbols.iter().enumerate() {
            writeln!(f, "# symbol @{} {}:{}", id, name, dim)?;
        }
        for (id, (name, dim)) in self.params.iter().enumerate() {
            writeln!(f, "# param ${} {}:{}", id, name, dim)?;
        }
        for (name, value) in &self.constants {
            writeln!(f, "# const {} = {}", name, value)?;
        }
        Ok(())
    }
}
