//! ZFX: a small JIT expression compiler. Scalar and short-vector expressions
//! over named symbols and parameters are compiled to a register-based
//! assembly text.

pub mod backend;
pub mod compiler;
pub mod error;
pub mod frontend;
pub mod ir;
pub mod options;
pub mod passes;
pub mod program;

pub use compiler::{build_ir, compile_to_assembly, fingerprint, Compiler};
pub use error::{CompileError, CompileResult, ErrorKind};
pub use options::Options;
pub use program::Program;
