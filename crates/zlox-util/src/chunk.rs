//! Compiled bytecode: the instruction set and the `Chunk` container.

use std::io;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::heap::Heap;
use crate::value::Value;

/// Constant-pool entries are addressed by one byte.
pub const MAX_CONSTANTS: usize = 256;

/// Variable-name entries are addressed by one byte.
pub const MAX_VARNAMES: usize = 256;

/// One bytecode instruction.
///
/// Instructions are one byte, optionally followed by a one-byte operand
/// (see [`OpCode::operand_kind`]). The numeric values are the on-wire
/// encoding; decoding an unknown byte is an error surfaced by the VM, never
/// a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    /// Halt. The operand stack must be empty.
    Exit,
    /// Discard the top of the stack.
    Pop,
    /// Pop and write the value, followed by a newline.
    Print,
    /// `GetConst i`: push `constants[i]`.
    GetConst,
    /// `DeclareGlobal i`: bind `varnames[i]` to the popped top of stack.
    DeclareGlobal,
    /// `SetGlobal i`: overwrite an existing binding; the value stays on the
    /// stack (assignment is an expression).
    SetGlobal,
    /// `GetGlobal i`: push the binding of `varnames[i]`.
    GetGlobal,
    /// `SetLocal s`: copy the top of stack into slot `s` without popping.
    SetLocal,
    /// `GetLocal s`: push a copy of slot `s`.
    GetLocal,
    /// Pop two values; push their sum (numbers) or concatenation (strings).
    Add,
    Subtract,
    Multiply,
    Divide,
    /// Negate the number on top of the stack.
    Negate,
    /// Pop two numbers; push the boolean `a < b`.
    Less,
    /// Pop two numbers; push the boolean `a > b`.
    Greater,
    /// Pop two values; push whether they are equal.
    Equals,
}

/// What the byte after an opcode means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand byte.
    None,
    /// Index into the constant pool.
    Const,
    /// Index into the variable-name pool.
    Name,
    /// Operand-stack slot.
    Slot,
}

impl OpCode {
    pub fn operand_kind(self) -> OperandKind {
        match self {
            OpCode::GetConst => OperandKind::Const,
            OpCode::DeclareGlobal | OpCode::SetGlobal | OpCode::GetGlobal => OperandKind::Name,
            OpCode::SetLocal | OpCode::GetLocal => OperandKind::Slot,
            _ => OperandKind::None,
        }
    }

    /// Mnemonic used by the disassembler.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Exit => "EXIT",
            OpCode::Pop => "POP",
            OpCode::Print => "PRINT",
            OpCode::GetConst => "GET_CONST",
            OpCode::DeclareGlobal => "DECLARE_GLOBAL",
            OpCode::SetGlobal => "SET_GLOBAL",
            OpCode::GetGlobal => "GET_GLOBAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUBTRACT",
            OpCode::Multiply => "MULTIPLY",
            OpCode::Divide => "DIVIDE",
            OpCode::Negate => "NEGATE",
            OpCode::Less => "LESS_THAN",
            OpCode::Greater => "GREATER_THAN",
            OpCode::Equals => "EQUALS",
        }
    }
}

/// The unit of compilation: code bytes plus the pools they index into.
///
/// Variable names are slices of the source text, so a chunk cannot outlive
/// the source it was compiled from.
#[derive(Debug, Default)]
pub struct Chunk<'src> {
    code: Vec<u8>,
    constants: Vec<Value>,
    varnames: Vec<&'src str>,
}

impl<'src> Chunk<'src> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, op: OpCode) {
        self.code.push(op.into());
    }

    pub fn emit_with_operand(&mut self, op: OpCode, operand: u8) {
        self.code.push(op.into());
        self.code.push(operand);
    }

    /// Appends a constant, returning its pool index, or `None` once the
    /// one-byte index space is exhausted.
    pub fn add_constant(&mut self, value: Value) -> Option<u8> {
        if self.constants.len() >= MAX_CONSTANTS {
            return None;
        }
        self.constants.push(value);
        Some((self.constants.len() - 1) as u8)
    }

    /// Returns the pool index for a variable name, reusing an existing entry
    /// for a name already in the pool. `None` once 256 distinct names exist.
    pub fn add_varname(&mut self, name: &'src str) -> Option<u8> {
        if let Some(idx) = self.varnames.iter().position(|&n| n == name) {
            return Some(idx as u8);
        }
        if self.varnames.len() >= MAX_VARNAMES {
            return None;
        }
        self.varnames.push(name);
        Some((self.varnames.len() - 1) as u8)
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn constant(&self, index: u8) -> Option<Value> {
        self.constants.get(usize::from(index)).copied()
    }

    pub fn varname(&self, index: u8) -> Option<&'src str> {
        self.varnames.get(usize::from(index)).copied()
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn varnames(&self) -> &[&'src str] {
        &self.varnames
    }

    /// Writes a human-readable listing of the whole chunk.
    pub fn disassemble<W: io::Write>(&self, heap: &Heap, w: &mut W) -> io::Result<()> {
        writeln!(
            w,
            "== {} bytes, {} constants, {} names ==",
            self.code.len(),
            self.constants.len(),
            self.varnames.len()
        )?;
        let mut offset = 0;
        while offset < self.code.len() {
            offset = self.disassemble_instruction(heap, w, offset)?;
        }
        Ok(())
    }

    /// Writes one instruction and returns the offset of the next one.
    pub fn disassemble_instruction<W: io::Write>(
        &self,
        heap: &Heap,
        w: &mut W,
        offset: usize,
    ) -> io::Result<usize> {
        write!(w, "{offset:04}  ")?;

        let byte = self.code[offset];
        let Ok(op) = OpCode::try_from(byte) else {
            writeln!(w, "??? {byte:#04x}")?;
            return Ok(offset + 1);
        };

        if op.operand_kind() == OperandKind::None {
            writeln!(w, "{}", op.name())?;
            return Ok(offset + 1);
        }

        let Some(&operand) = self.code.get(offset + 1) else {
            writeln!(w, "{} <truncated>", op.name())?;
            return Ok(offset + 1);
        };

        match op.operand_kind() {
            OperandKind::Const => match self.constant(operand) {
                Some(value) => {
                    writeln!(w, "{:<14} {operand:3}  ; {}", op.name(), value.display(heap))?
                }
                None => writeln!(w, "{:<14} {operand:3}  ; <bad index>", op.name())?,
            },
            OperandKind::Name => match self.varname(operand) {
                Some(name) => writeln!(w, "{:<14} {operand:3}  ; {name}", op.name())?,
                None => writeln!(w, "{:<14} {operand:3}  ; <bad index>", op.name())?,
            },
            OperandKind::Slot => writeln!(w, "{:<14} {operand:3}", op.name())?,
            OperandKind::None => unreachable!(),
        }
        Ok(offset + 2)
    }
}
