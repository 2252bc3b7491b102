//! Statement and declaration compilation.

use zlox_lex::TokenKind;
use zlox_util::OpCode;

use crate::{CompileError, Compiler, Local, MAX_LOCALS};

impl<'src, 'heap> Compiler<'src, 'heap> {
    /// `declaration := block | statement`
    pub(crate) fn declaration(&mut self) -> Result<(), CompileError> {
        if self.matches(TokenKind::LBrace) {
            self.block()
        } else {
            self.statement()
        }
    }

    /// Compiles the declarations of a `{ ... }` block, then pops every local
    /// the block declared so the operand stack shrinks back to its size at
    /// block entry.
    fn block(&mut self) -> Result<(), CompileError> {
        self.scope_depth += 1;
        while !self.check(TokenKind::RBrace) {
            if self.check(TokenKind::Eof) {
                return Err(CompileError::UnterminatedBlock);
            }
            self.declaration()?;
        }
        self.advance();

        while self
            .locals
            .last()
            .is_some_and(|local| local.depth == self.scope_depth)
        {
            self.locals.pop();
            self.chunk.emit(OpCode::Pop);
        }
        self.scope_depth -= 1;
        Ok(())
    }

    /// `statement := print | var-decl | expression-statement`
    fn statement(&mut self) -> Result<(), CompileError> {
        if self.matches(TokenKind::Print) {
            self.print_statement()
        } else if self.matches(TokenKind::Var) {
            self.var_declaration()
        } else {
            self.expression_statement()
        }
    }

    fn print_statement(&mut self) -> Result<(), CompileError> {
        self.expression()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        self.chunk.emit(OpCode::Print);
        Ok(())
    }

    /// `var IDENT = expression ;` with a mandatory initializer.
    fn var_declaration(&mut self) -> Result<(), CompileError> {
        let name = self.expect(TokenKind::Ident, "a variable name")?.lexeme;
        self.expect(TokenKind::Equal, "'='")?;
        self.expression()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        self.define_variable(name)
    }

    /// Binds `name` to the initializer value sitting on top of the stack.
    fn define_variable(&mut self, name: &'src str) -> Result<(), CompileError> {
        if self.scope_depth == 0 {
            let idx = self.varname_index(name)?;
            self.chunk.emit_with_operand(OpCode::DeclareGlobal, idx);
            return Ok(());
        }

        if self.find_local(name, true).is_some() {
            return Err(CompileError::RedeclaredLocal {
                name: name.to_string(),
            });
        }
        if self.locals.len() >= MAX_LOCALS {
            return Err(CompileError::TooManyLocals);
        }
        self.locals.push(Local {
            name,
            depth: self.scope_depth,
        });

        // The initializer is on top of the stack, and that stack position is
        // exactly the new local's slot: slot index == locals index == stack
        // index. The copy is a no-op that leaves the value in place as the
        // local's storage.
        let slot = (self.locals.len() - 1) as u8;
        self.chunk.emit_with_operand(OpCode::SetLocal, slot);
        Ok(())
    }

    fn expression_statement(&mut self) -> Result<(), CompileError> {
        self.expression()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        self.chunk.emit(OpCode::Pop);
        Ok(())
    }
}
