//! Expression compilation: Pratt parsing straight to bytecode.
//!
//! Every token kind that may open or continue an expression has a
//! [`ParseRule`]: an optional prefix handler, an optional infix handler, and
//! the precedence of its infix form. [`Compiler::parse_precedence`] walks the
//! token stream with those rules and emits instructions bottom-up, so operand
//! code is always in place before the operator instruction that consumes it.
//!
//! # Precedence ladder (loose to tight)
//!
//! | Level | Tokens |
//! |-------|--------|
//! | Assignment | `=` (handled inside the identifier prefix) |
//! | Equality | `==` |
//! | Comparison | `<`, `>` |
//! | Term | `+`, `-` |
//! | Factor | `*`, `/` |
//! | Unary | prefix `-` |
//!
//! All infix operators are left-associative: their right operand is parsed
//! one level tighter than their own.

use zlox_lex::TokenKind;
use zlox_util::{OpCode, Value};

use crate::{CompileError, Compiler};

/// Binding strength of an infix position. `None` marks tokens that can never
/// continue an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
}

impl Precedence {
    /// One level tighter; used for left-associative right operands.
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Unary,
        }
    }
}

type ParseFn<'src, 'heap> = fn(&mut Compiler<'src, 'heap>, bool) -> Result<(), CompileError>;

struct ParseRule<'src, 'heap> {
    prefix: Option<ParseFn<'src, 'heap>>,
    infix: Option<ParseFn<'src, 'heap>>,
    precedence: Precedence,
}

impl<'src, 'heap> Compiler<'src, 'heap> {
    /// The static parse-rule table, as a match instead of an array.
    fn rule(kind: TokenKind) -> ParseRule<'src, 'heap> {
        let (prefix, infix, precedence): (
            Option<ParseFn<'src, 'heap>>,
            Option<ParseFn<'src, 'heap>>,
            Precedence,
        ) = match kind {
            TokenKind::Minus => (Some(Self::unary), Some(Self::binary), Precedence::Term),
            TokenKind::Plus => (None, Some(Self::binary), Precedence::Term),
            TokenKind::Star | TokenKind::Slash => (None, Some(Self::binary), Precedence::Factor),
            TokenKind::EqualEqual => (None, Some(Self::binary), Precedence::Equality),
            TokenKind::Less | TokenKind::Greater => {
                (None, Some(Self::binary), Precedence::Comparison)
            }
            TokenKind::Number => (Some(Self::number), None, Precedence::None),
            TokenKind::Str => (Some(Self::string), None, Precedence::None),
            TokenKind::True | TokenKind::False | TokenKind::Nil => {
                (Some(Self::literal), None, Precedence::None)
            }
            TokenKind::Ident => (Some(Self::variable), None, Precedence::None),
            _ => (None, None, Precedence::None),
        };
        ParseRule {
            prefix,
            infix,
            precedence,
        }
    }

    /// Compiles one full expression.
    pub(crate) fn expression(&mut self) -> Result<(), CompileError> {
        self.parse_precedence(Precedence::Assignment)
    }

    /// The Pratt core: compiles everything that binds at least as tightly
    /// as `prec`.
    fn parse_precedence(&mut self, prec: Precedence) -> Result<(), CompileError> {
        let token = self.advance();
        let Some(prefix) = Self::rule(token.kind).prefix else {
            return Err(match token.kind {
                TokenKind::Eof => CompileError::UnexpectedEof,
                TokenKind::Unknown => CompileError::InvalidSyntax {
                    lexeme: token.lexeme.to_string(),
                },
                _ => CompileError::ExpressionExpected {
                    found: token.lexeme.to_string(),
                },
            });
        };

        // Only an expression parsed at assignment level may be the target
        // of an `=`; operands deeper in the climb may not.
        let can_assign = prec <= Precedence::Assignment;
        prefix(self, can_assign)?;

        loop {
            let rule = Self::rule(self.peek().kind);
            if rule.precedence < prec {
                break;
            }
            let Some(infix) = rule.infix else {
                break;
            };
            self.advance();
            infix(self, can_assign)?;
        }

        // A leftover `=` here means the expression just parsed was used as
        // an assignment target where none is allowed, e.g. `a + b = c`.
        if !can_assign && self.check(TokenKind::Equal) {
            return Err(CompileError::InvalidAssignmentTarget);
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Prefix handlers
    // -------------------------------------------------------------------

    fn number(&mut self, _can_assign: bool) -> Result<(), CompileError> {
        let token = self.previous();
        let value: f32 = token.lexeme.parse().map_err(|_| CompileError::InvalidSyntax {
            lexeme: token.lexeme.to_string(),
        })?;
        self.emit_constant(Value::Number(value))
    }

    fn string(&mut self, _can_assign: bool) -> Result<(), CompileError> {
        let lexeme = self.previous().lexeme;
        // The lexeme includes the quotes.
        let text = &lexeme[1..lexeme.len() - 1];
        let obj = self.heap.intern(text);
        self.emit_constant(Value::Obj(obj))
    }

    fn literal(&mut self, _can_assign: bool) -> Result<(), CompileError> {
        let value = match self.previous().kind {
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            TokenKind::Nil => Value::Nil,
            _ => unreachable!("literal rule bound to a non-literal token"),
        };
        self.emit_constant(value)
    }

    fn unary(&mut self, _can_assign: bool) -> Result<(), CompileError> {
        self.parse_precedence(Precedence::Unary)?;
        self.chunk.emit(OpCode::Negate);
        Ok(())
    }

    /// Identifier prefix: a variable read, or an assignment when the next
    /// token is `=` and assignment is allowed at this precedence.
    fn variable(&mut self, can_assign: bool) -> Result<(), CompileError> {
        let name = self.previous().lexeme;
        if can_assign && self.matches(TokenKind::Equal) {
            // Right-associative: `a = b = c` assigns `b = c` first.
            self.expression()?;
            match self.find_local(name, false) {
                Some(slot) => self.chunk.emit_with_operand(OpCode::SetLocal, slot as u8),
                None => {
                    let idx = self.varname_index(name)?;
                    self.chunk.emit_with_operand(OpCode::SetGlobal, idx);
                }
            }
        } else {
            match self.find_local(name, false) {
                Some(slot) => self.chunk.emit_with_operand(OpCode::GetLocal, slot as u8),
                None => {
                    let idx = self.varname_index(name)?;
                    self.chunk.emit_with_operand(OpCode::GetGlobal, idx);
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Infix handlers
    // -------------------------------------------------------------------

    fn binary(&mut self, _can_assign: bool) -> Result<(), CompileError> {
        let operator = self.previous().kind;
        self.parse_precedence(Self::rule(operator).precedence.next())?;

        let op = match operator {
            TokenKind::Plus => OpCode::Add,
            TokenKind::Minus => OpCode::Subtract,
            TokenKind::Star => OpCode::Multiply,
            TokenKind::Slash => OpCode::Divide,
            TokenKind::Less => OpCode::Less,
            TokenKind::Greater => OpCode::Greater,
            TokenKind::EqualEqual => OpCode::Equals,
            _ => unreachable!("binary rule bound to a non-operator token"),
        };
        self.chunk.emit(op);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use zlox_util::Heap;

    /// Compiles a source string and returns the raw bytecode.
    fn bytecode(source: &str) -> Vec<u8> {
        let mut heap = Heap::new();
        compile(source, &mut heap).unwrap().code().to_vec()
    }

    fn compile_err(source: &str) -> CompileError {
        let mut heap = Heap::new();
        compile(source, &mut heap).unwrap_err()
    }

    fn op(op: OpCode) -> u8 {
        u8::from(op)
    }

    // =========================================================================
    // LITERALS
    // =========================================================================

    #[test]
    fn number_literal() {
        let mut heap = Heap::new();
        let chunk = compile("1.5;", &mut heap).unwrap();
        assert_eq!(chunk.constants(), [Value::Number(1.5)]);
        assert_eq!(
            chunk.code(),
            [
                op(OpCode::GetConst),
                0,
                op(OpCode::Pop),
                op(OpCode::Exit),
            ]
        );
    }

    #[test]
    fn boolean_and_nil_literals() {
        let mut heap = Heap::new();
        let chunk = compile("true; false; nil;", &mut heap).unwrap();
        assert_eq!(
            chunk.constants(),
            [Value::Bool(true), Value::Bool(false), Value::Nil]
        );
    }

    #[test]
    fn string_literal_is_interned_object() {
        let mut heap = Heap::new();
        let chunk = compile("\"lox\";", &mut heap).unwrap();
        let Value::Obj(obj) = chunk.constants()[0] else {
            panic!("expected an object constant");
        };
        assert_eq!(heap.get_str(obj), "lox");
    }

    // =========================================================================
    // PRECEDENCE
    // =========================================================================

    #[test]
    fn factor_binds_tighter_than_term() {
        // 1 + 2 * 3 compiles the multiplication first.
        assert_eq!(
            bytecode("1 + 2 * 3;"),
            [
                op(OpCode::GetConst),
                0,
                op(OpCode::GetConst),
                1,
                op(OpCode::GetConst),
                2,
                op(OpCode::Multiply),
                op(OpCode::Add),
                op(OpCode::Pop),
                op(OpCode::Exit),
            ]
        );
    }

    #[test]
    fn term_binds_tighter_than_comparison() {
        // 1 + 2 < 4 is (1 + 2) < 4.
        assert_eq!(
            bytecode("1 + 2 < 4;"),
            [
                op(OpCode::GetConst),
                0,
                op(OpCode::GetConst),
                1,
                op(OpCode::Add),
                op(OpCode::GetConst),
                2,
                op(OpCode::Less),
                op(OpCode::Pop),
                op(OpCode::Exit),
            ]
        );
    }

    #[test]
    fn comparison_binds_tighter_than_equality() {
        // 1 < 2 == true is (1 < 2) == true.
        assert_eq!(
            bytecode("1 < 2 == true;"),
            [
                op(OpCode::GetConst),
                0,
                op(OpCode::GetConst),
                1,
                op(OpCode::Less),
                op(OpCode::GetConst),
                2,
                op(OpCode::Equals),
                op(OpCode::Pop),
                op(OpCode::Exit),
            ]
        );
    }

    #[test]
    fn unary_binds_tighter_than_factor() {
        // -2 * 3 is (-2) * 3.
        assert_eq!(
            bytecode("-2 * 3;"),
            [
                op(OpCode::GetConst),
                0,
                op(OpCode::Negate),
                op(OpCode::GetConst),
                1,
                op(OpCode::Multiply),
                op(OpCode::Pop),
                op(OpCode::Exit),
            ]
        );
    }

    #[test]
    fn nested_unary() {
        assert_eq!(
            bytecode("--1;"),
            [
                op(OpCode::GetConst),
                0,
                op(OpCode::Negate),
                op(OpCode::Negate),
                op(OpCode::Pop),
                op(OpCode::Exit),
            ]
        );
    }

    // =========================================================================
    // ASSOCIATIVITY
    // =========================================================================

    #[test]
    fn subtraction_is_left_associative() {
        // 1 - 2 - 3 is (1 - 2) - 3.
        assert_eq!(
            bytecode("1 - 2 - 3;"),
            [
                op(OpCode::GetConst),
                0,
                op(OpCode::GetConst),
                1,
                op(OpCode::Subtract),
                op(OpCode::GetConst),
                2,
                op(OpCode::Subtract),
                op(OpCode::Pop),
                op(OpCode::Exit),
            ]
        );
    }

    #[test]
    fn division_is_left_associative() {
        assert_eq!(
            bytecode("8 / 4 / 2;"),
            [
                op(OpCode::GetConst),
                0,
                op(OpCode::GetConst),
                1,
                op(OpCode::Divide),
                op(OpCode::GetConst),
                2,
                op(OpCode::Divide),
                op(OpCode::Pop),
                op(OpCode::Exit),
            ]
        );
    }

    #[test]
    fn assignment_is_right_associative() {
        let mut heap = Heap::new();
        let chunk = compile("var a = 1; var b = 2; a = b = 3;", &mut heap).unwrap();
        // The tail of the code: GetConst 3, SetGlobal b, SetGlobal a, Pop.
        let code = chunk.code();
        let tail = &code[code.len() - 8..];
        assert_eq!(
            tail,
            [
                op(OpCode::GetConst),
                2,
                op(OpCode::SetGlobal),
                1,
                op(OpCode::SetGlobal),
                0,
                op(OpCode::Pop),
                op(OpCode::Exit),
            ]
        );
    }

    // =========================================================================
    // ASSIGNMENT TARGETS
    // =========================================================================

    #[test]
    fn arithmetic_result_is_not_assignable() {
        assert_eq!(
            compile_err("a + b = 1;"),
            CompileError::InvalidAssignmentTarget
        );
    }

    #[test]
    fn comparison_operand_is_not_assignable() {
        assert_eq!(
            compile_err("1 < b = 2;"),
            CompileError::InvalidAssignmentTarget
        );
    }

    #[test]
    fn negated_variable_is_not_assignable() {
        assert_eq!(
            compile_err("-a = 1;"),
            CompileError::InvalidAssignmentTarget
        );
    }

    #[test]
    fn plain_assignment_compiles() {
        let mut heap = Heap::new();
        let chunk = compile("a = 1;", &mut heap).unwrap();
        assert_eq!(
            chunk.code(),
            [
                op(OpCode::GetConst),
                0,
                op(OpCode::SetGlobal),
                0,
                op(OpCode::Pop),
                op(OpCode::Exit),
            ]
        );
    }

    // =========================================================================
    // ERROR CASES
    // =========================================================================

    #[test]
    fn missing_operand_after_operator() {
        assert!(matches!(
            compile_err("1 + ;"),
            CompileError::ExpressionExpected { .. }
        ));
    }

    #[test]
    fn operator_cannot_open_an_expression() {
        assert!(matches!(
            compile_err("* 2;"),
            CompileError::ExpressionExpected { .. }
        ));
    }

    #[test]
    fn dangling_operator_at_eof() {
        assert_eq!(compile_err("1 +"), CompileError::UnexpectedEof);
    }

    #[test]
    fn unknown_token_is_invalid_syntax() {
        assert!(matches!(
            compile_err("@;"),
            CompileError::InvalidSyntax { .. }
        ));
    }

    #[test]
    fn equality_of_mixed_operands_compiles() {
        // Type checks happen at run time; compilation accepts this.
        let mut heap = Heap::new();
        assert!(compile("1 == \"one\";", &mut heap).is_ok());
    }
}
