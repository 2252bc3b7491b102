//! zlox-com - Single-Pass Compiler
//!
//! ============================================================================
//! PARSING THEORY
//! ============================================================================
//!
//! Parsing determines the grammatical structure of a token sequence
//! according to a formal grammar.
//!
//! FORMAL DEFINITION:
//! ------------------
//! Given:
//! - G = (N, T, P, S) where
//!   N = non-terminal symbols
//!   T = terminal symbols (tokens)
//!   P = production rules
//!   S = start symbol
//!
//! Parsing is finding a derivation S ⇒* w where w is the input sequence.
//!
//! GRAMMAR:
//! --------
//! The whole language, in EBNF:
//!
//! ```ebnf
//! program     = { declaration } Eof ;
//! declaration = block | statement ;
//! block       = "{" { declaration } "}" ;
//! statement   = "print" expr ";"
//!             | "var" Ident "=" expr ";"
//!             | expr ";" ;
//! expr        = assignment ;
//! assignment  = Ident "=" assignment | equality ;
//! equality    = comparison { "==" comparison } ;
//! comparison  = term { ( "<" | ">" ) term } ;
//! term        = factor { ( "+" | "-" ) factor } ;
//! factor      = unary { ( "*" | "/" ) unary } ;
//! unary       = "-" unary | primary ;
//! primary     = Number | Str | "true" | "false" | "nil" | Ident ;
//! ```
//!
//! This is a context-free grammar (Type 2 in the Chomsky hierarchy); the
//! token layer below it is regular (Type 3).
//!
//! ============================================================================
//! PRATT PARSING
//! ============================================================================
//!
//! The expression levels of the grammar are not implemented as one function
//! per non-terminal. A Pratt parser collapses them into a single loop
//! driven by a per-token-kind table of:
//!
//!   (prefix handler, infix handler, precedence)
//!
//! ALGORITHM (parse_precedence(p)):
//! --------------------------------
//! 1. Consume one token and run its prefix handler (its absence is a
//!    syntax error).
//! 2. While the next token's precedence ≥ p, consume it and run its infix
//!    handler.
//! 3. Left associativity falls out of the infix handler parsing its right
//!    operand at precedence + 1.
//!
//! Adding an operator is one table row, and the precedence ladder is data
//! rather than call-stack shape.
//!
//! ============================================================================
//! SINGLE-PASS CODE GENERATION
//! ============================================================================
//!
//! There is no AST. Handlers emit bytecode the moment they recognize a
//! construct, and the emission order is the evaluation order: operands
//! first, then the operator that consumes them. `1 + 2 * 3` emits
//!
//! ```text
//! GetConst 1, GetConst 2, GetConst 3, Multiply, Add
//! ```
//!
//! because the climb into the tighter factor level finishes before the
//! looser term level gets to emit `Add`.
//!
//! VARIABLE RESOLUTION:
//! --------------------
//! Scoping is resolved entirely at compile time. Globals are referenced by
//! name through the chunk's varname pool and resolved by the VM's globals
//! table at run time; locals collapse to operand-stack slots. The locals
//! bookkeeping here mirrors the VM stack exactly: the n-th `Local` recorded
//! lives in stack slot n, because each `var` leaves its initializer on the
//! stack and each block exit pops its own locals in reverse.

mod expr;
mod stmt;

pub mod error;

pub use error::CompileError;

use zlox_lex::{Scanner, Token, TokenKind};
use zlox_util::{Chunk, Heap, OpCode, Value};

/// Locals are addressed by a one-byte stack slot.
pub const MAX_LOCALS: usize = 256;

/// A block-scoped variable the compiler is tracking.
///
/// Its index in `Compiler::locals` is its operand-stack slot.
#[derive(Debug)]
struct Local<'src> {
    name: &'src str,
    depth: u32,
}

/// Scans and compiles a whole program in one call.
///
/// String literals are interned into `heap` as they are compiled, so the
/// resulting chunk must be executed against the same heap.
///
/// # Example
///
/// ```
/// use zlox_util::Heap;
///
/// let mut heap = Heap::new();
/// let chunk = zlox_com::compile("print 1 + 2;", &mut heap).unwrap();
/// assert!(!chunk.code().is_empty());
/// ```
pub fn compile<'src>(source: &'src str, heap: &mut Heap) -> Result<Chunk<'src>, CompileError> {
    let tokens = Scanner::scan_all(source)?;
    Compiler::new(tokens, heap).compile()
}

/// The single-pass compiler.
///
/// Consumes an `Eof`-terminated token stream and produces one [`Chunk`].
pub struct Compiler<'src, 'heap> {
    tokens: Vec<Token<'src>>,
    pos: usize,
    chunk: Chunk<'src>,
    heap: &'heap mut Heap,
    locals: Vec<Local<'src>>,
    /// 0 is top level; each `{` is one deeper.
    scope_depth: u32,
}

impl<'src, 'heap> Compiler<'src, 'heap> {
    pub fn new(tokens: Vec<Token<'src>>, heap: &'heap mut Heap) -> Self {
        Self {
            tokens,
            pos: 0,
            chunk: Chunk::new(),
            heap,
            locals: Vec::new(),
            scope_depth: 0,
        }
    }

    /// Compiles every declaration up to `Eof` and terminates the chunk with
    /// [`OpCode::Exit`].
    pub fn compile(mut self) -> Result<Chunk<'src>, CompileError> {
        while !self.check(TokenKind::Eof) {
            self.declaration()?;
        }
        self.chunk.emit(OpCode::Exit);
        Ok(self.chunk)
    }

    // -------------------------------------------------------------------
    // Token stream primitives
    // -------------------------------------------------------------------

    /// The token under the cursor. Past the end this is `Eof`, so the parser
    /// can always look ahead safely.
    fn peek(&self) -> Token<'src> {
        self.tokens
            .get(self.pos)
            .copied()
            .unwrap_or(Token::new(TokenKind::Eof, ""))
    }

    /// The most recently consumed token.
    fn previous(&self) -> Token<'src> {
        self.tokens[self.pos - 1]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token<'src> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    /// Consumes the next token if it has the given kind.
    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consumes a token of the given kind or fails, naming what was wanted.
    fn expect(
        &mut self,
        kind: TokenKind,
        expected: &'static str,
    ) -> Result<Token<'src>, CompileError> {
        let token = self.peek();
        if token.kind == kind {
            Ok(self.advance())
        } else if token.kind == TokenKind::Eof {
            Err(CompileError::UnexpectedEof)
        } else {
            Err(CompileError::UnexpectedToken {
                expected,
                found: token.lexeme.to_string(),
            })
        }
    }

    // -------------------------------------------------------------------
    // Variable resolution
    // -------------------------------------------------------------------

    /// Finds the newest local named `name`, returning its stack slot.
    ///
    /// With `same_scope_only`, locals of enclosing blocks are ignored; this
    /// is the redeclaration check. Without it the newest match wins, which
    /// is what makes shadowing work.
    fn find_local(&self, name: &str, same_scope_only: bool) -> Option<usize> {
        self.locals
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, local)| !same_scope_only || local.depth == self.scope_depth)
            .find(|(_, local)| local.name == name)
            .map(|(slot, _)| slot)
    }

    // -------------------------------------------------------------------
    // Emission helpers
    // -------------------------------------------------------------------

    /// Adds `value` to the constant pool and emits the push for it.
    fn emit_constant(&mut self, value: Value) -> Result<(), CompileError> {
        let idx = self
            .chunk
            .add_constant(value)
            .ok_or(CompileError::TooManyConstants)?;
        self.chunk.emit_with_operand(OpCode::GetConst, idx);
        Ok(())
    }

    /// Index of `name` in the varname pool, adding it if new.
    fn varname_index(&mut self, name: &'src str) -> Result<u8, CompileError> {
        self.chunk
            .add_varname(name)
            .ok_or(CompileError::TooManyGlobals)
    }
}
