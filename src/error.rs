//! Error types for the ZFX compiler.

use thiserror::Error;

/// Coarse classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Name,
    Compile,
    RegisterOverflow,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        position: usize,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("name error at {line}:{column}: `{name}` is not a declared symbol, parameter or local")]
    Name {
        name: String,
        position: usize,
        line: usize,
        column: usize,
    },

    #[error("dimension error: {message}")]
    Dimension {
        message: String,
    },

    #[error("invalid function name `{name}` (with {args} args)")]
    UnknownFunction {
        name: String,
        args: usize,
    },

    #[error("structural error in pass `{pass}`: {message}")]
    Structure {
        pass: &'static str,
        message: String,
    },

    #[error("invalid options: {message}")]
    InvalidOptions {
        message: String,
    },

    #[error("failed to format assembly")]
    Format(#[from] std::fmt::Error),

    #[error("register overflow: {required} live values needed at `{statement}` but only {available} registers available")]
    RegisterOverflow {
        required: usize,
        available: usize,
        statement: String,
    },
}

impl CompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Syntax { .. } => ErrorKind::Syntax,
            CompileError::Name { .. } => ErrorKind::Name,
            CompileError::Dimension { .. }
            | CompileError::UnknownFunction { .. }
            | CompileError::Structure { .. }
            | CompileError::InvalidOptions { .. }
            | CompileError::Format(_) => ErrorKind::Compile,
            CompileError::RegisterOverflow { .. } => ErrorKind::RegisterOverflow,
        }
    }

    pub(crate) fn dimension(message: impl Into<String>) -> Self {
        CompileError::Dimension { message: message.into() }
    }

    pub(crate) fn structure(pass: &'static str, message: impl Into<String>) -> Self {
        CompileError::Structure { pass, message: message.into() }
    }
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// 1-based line and column of a byte offset in `source`.
pub fn line_column(source: &str, position: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for (offset, c) in source.char_indices() {
        if offset >= position {
            break;
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let src = "y = 1\nz = foo + 2";
        assert_eq!(line_column(src, 0), (1, 1));
        assert_eq!(line_column(src, 4), (1, 5));
        assert_eq!(line_column(src, 10), (2, 5));
    }

    #[test]
    fn test_kind_grouping() {
        let err = CompileError::UnknownFunction { name: "foo".into(), args: 1 };
        assert_eq!(err.kind(), ErrorKind::Compile);
        assert_eq!(err.to_string(), "invalid function name `foo` (with 1 args)");
    }
}
