//! zlox-lex - Scanner (Lexical Analyzer)
//!
//! ============================================================================
//! LEXICAL ANALYSIS THEORY
//! ============================================================================
//!
//! Lexical analysis is the first phase of the pipeline. It transforms a
//! stream of characters into a stream of tokens.
//!
//! FORMAL DEFINITION:
//! ------------------
//! Let Σ be the alphabet (the bytes of the source file).
//! Let Σ* be the set of all strings over Σ.
//!
//! The scanner is a function:
//!   L: Σ* → T*
//! where T is the set of tokens, and every output sequence ends with a
//! single `Eof`.
//!
//! PROPERTIES:
//! -----------
//! - Linear time: O(n) where n = input length, one pass, one byte of
//!   lookahead (two for `==` and `//`).
//! - Context-free: no token depends on the tokens around it.
//! - Zero-copy: a token's lexeme is a slice of the source buffer, so the
//!   buffer must outlive every token taken from it.
//!
//! LEXEME vs TOKEN:
//! ----------------
//! - Lexeme: the actual characters covered (e.g., `var`, `1.5`, `+`).
//! - Token: the category plus the lexeme (e.g., `Var`, `Number`, `Plus`).
//!
//! Example:
//! ```text
//! Source:  var x = 42;
//!
//! Tokens:  [Var] [Ident "x"] [Equal] [Number "42"] [Semicolon] [Eof]
//!          (whitespace skipped)
//! ```
//!
//! ============================================================================
//! TOKEN CATEGORIES
//! ============================================================================
//!
//! 1. KEYWORDS
//!    `var`, `print`, `true`, `false`, `nil`. Reserved; never identifiers.
//!
//! 2. IDENTIFIERS
//!    Pattern: [a-zA-Z_][a-zA-Z0-9_]*
//!
//! 3. LITERALS
//!    - Number: digits with an optional fraction, `42`, `3.5`
//!    - String: double-quoted, no escapes; the lexeme keeps both quotes
//!
//! 4. OPERATORS
//!    - Arithmetic: `+`, `-`, `*`, `/`
//!    - Comparison: `<`, `>`, `==`
//!    - Assignment: `=`
//!
//! 5. DELIMITERS
//!    `{`, `}`, `;`
//!
//! 6. SPECIAL
//!    - Whitespace and `//` line comments (skipped)
//!    - `Eof` (end-of-input marker)
//!    - `Unknown` (any byte with no rule above)
//!
//! ============================================================================
//! ERROR POLICY
//! ============================================================================
//!
//! The scanner is deliberately forgiving: unexpected bytes become `Unknown`
//! tokens for the parser to reject with a proper syntax error, rather than
//! aborting the scan. Its only hard failure is a string literal that never
//! closes, reported with the byte offset of the opening quote.

pub mod cursor;
pub mod scanner;
pub mod token;

pub use scanner::{ScanError, Scanner};
pub use token::{Token, TokenKind};
