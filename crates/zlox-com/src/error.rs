//! Compile-time errors.

use thiserror::Error;

use zlox_lex::ScanError;

/// An error raised while compiling. Compilation stops at the first one;
/// there is no recovery or resynchronization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("unexpected token '{found}', expected {expected}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },

    #[error("expected an expression, found '{found}'")]
    ExpressionExpected { found: String },

    #[error("invalid syntax at '{lexeme}'")]
    InvalidSyntax { lexeme: String },

    /// The expression to the left of `=` is not something assignable.
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,

    #[error("unterminated block, expected '}}'")]
    UnterminatedBlock,

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("too many constants in one chunk (limit 256)")]
    TooManyConstants,

    #[error("too many global names in one chunk (limit 256)")]
    TooManyGlobals,

    #[error("too many local variables in scope (limit 256)")]
    TooManyLocals,

    #[error("variable '{name}' is already declared in this scope")]
    RedeclaredLocal { name: String },
}
