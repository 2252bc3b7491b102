//! Runtime errors.

use std::io;

use thiserror::Error;

/// An error raised while executing a chunk. The first one stops the VM.
///
/// The last four variants cannot be produced by chunks coming out of the
/// compiler; they indicate a compiler bug or a hand-built chunk, and exist
/// so the VM never panics on bad bytecode.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unsupported operand types for '{op}': {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("cannot negate a {operand}")]
    NegateTypeMismatch { operand: &'static str },

    #[error("undeclared variable '{name}'")]
    UndeclaredVariable { name: String },

    #[error("operand stack not empty at exit ({depth} values left)")]
    StackNotEmpty { depth: usize },

    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("invalid opcode byte {byte:#04x} at offset {offset}")]
    InvalidOpcode { byte: u8, offset: usize },

    #[error("corrupt chunk at offset {offset}: {detail}")]
    CorruptChunk {
        offset: usize,
        detail: &'static str,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}
