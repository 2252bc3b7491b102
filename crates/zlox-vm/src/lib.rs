//! zlox-vm - Bytecode Interpreter
//!
//! ============================================================================
//! STACK MACHINE THEORY
//! ============================================================================
//!
//! A stack machine evaluates postfix code against an operand stack instead
//! of named registers.
//!
//! FORMAL DEFINITION:
//! ------------------
//! The machine state is the triple
//!
//!   M = (ip, S, G)
//!
//! where ip indexes the chunk's code, S is the operand stack, and G is the
//! globals map. Each instruction is a transition M → M′ with a fixed stack
//! effect, e.g.
//!
//!   Add:       (ip, S·a·b, G) → (ip+1, S·(a+b), G)        effect -1
//!   GetConst i:(ip, S, G)     → (ip+2, S·constants[i], G)  effect +1
//!
//! Because the compiler emits operands before their operator, every
//! instruction finds its inputs on top of the stack, and a well-formed
//! chunk reaches `Exit` with S empty.
//!
//! DISPATCH:
//! ---------
//! Execution is a plain fetch-decode-execute loop: read the byte at ip,
//! advance, decode to an opcode, and `match` on it. Operand bytes are
//! fetched by the same advance-one primitive. Decoding an unknown byte is
//! an error, never undefined behavior, so a hand-built chunk cannot crash
//! the interpreter.
//!
//! EXAMPLE:
//! --------
//! ```text
//! print 1 + 2;
//!
//! GetConst 0      stack: [1]
//! GetConst 1      stack: [1, 2]
//! Add             stack: [3]
//! Print           stack: []        writes "3\n"
//! Exit            stack: []        halt
//! ```
//!
//! ============================================================================
//! EXECUTION MODEL
//! ============================================================================
//!
//! State lives in [`Vm`]: the chunk reference, the shared [`Heap`] the chunk
//! was compiled against, the operand stack, the globals table, and ip.
//!
//! The globals table borrows its keys from the chunk's varname pool, which is
//! why a [`Vm`] cannot outlive its chunk. Locals need no table at all: the
//! compiler turned them into stack slots, and slot `n` is simply `stack[n]`.
//!
//! Every arithmetic instruction type-checks its operands with non-popping
//! peeks before committing, so the stack is unchanged when a type error is
//! reported. `Exit` demands an empty stack; anything left over means the
//! compiler emitted unbalanced code, and the driver reports it as such.

pub mod error;

pub use error::RuntimeError;

use std::io::Write;

use zlox_util::{Chunk, Heap, OpCode, Table, Value};

/// The virtual machine. One instance interprets one chunk.
///
/// `print` output goes to `writer`: stdout in the driver, a byte buffer in
/// tests.
pub struct Vm<'a, W> {
    chunk: &'a Chunk<'a>,
    heap: &'a mut Heap,
    stack: Vec<Value>,
    globals: Table<&'a str, Value>,
    ip: usize,
    writer: W,
}

impl<'a, W: Write> Vm<'a, W> {
    pub fn new(chunk: &'a Chunk<'a>, heap: &'a mut Heap, writer: W) -> Self {
        Self {
            chunk,
            heap,
            stack: Vec::new(),
            globals: Table::new(),
            ip: 0,
            writer,
        }
    }

    /// The operand stack, oldest value first. Exposed for the driver's
    /// post-mortem dump.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// The heap this VM allocates into.
    pub fn heap(&self) -> &Heap {
        self.heap
    }

    /// Runs the chunk to `Exit` or to the first error.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            let offset = self.ip;
            let byte = self.fetch()?;
            let op = OpCode::try_from(byte)
                .map_err(|_| RuntimeError::InvalidOpcode { byte, offset })?;

            match op {
                OpCode::Exit => {
                    return if self.stack.is_empty() {
                        Ok(())
                    } else {
                        Err(RuntimeError::StackNotEmpty {
                            depth: self.stack.len(),
                        })
                    };
                }

                OpCode::Pop => {
                    self.pop()?;
                }

                OpCode::Print => {
                    let value = self.pop()?;
                    writeln!(self.writer, "{}", value.display(self.heap))?;
                }

                OpCode::GetConst => {
                    let idx = self.fetch()?;
                    let value = self.chunk.constant(idx).ok_or(RuntimeError::CorruptChunk {
                        offset,
                        detail: "constant index out of range",
                    })?;
                    self.stack.push(value);
                }

                OpCode::DeclareGlobal => {
                    let name = self.fetch_name(offset)?;
                    let value = self.pop()?;
                    self.globals.insert(name, value);
                }

                OpCode::SetGlobal => {
                    let name = self.fetch_name(offset)?;
                    if !self.globals.has_key(name.as_bytes()) {
                        return Err(RuntimeError::UndeclaredVariable {
                            name: name.to_string(),
                        });
                    }
                    // Assignment is an expression; its value stays put.
                    let value = self.peek(0)?;
                    self.globals.insert(name, value);
                }

                OpCode::GetGlobal => {
                    let name = self.fetch_name(offset)?;
                    match self.globals.find(name.as_bytes()) {
                        Some(&value) => self.stack.push(value),
                        None => {
                            return Err(RuntimeError::UndeclaredVariable {
                                name: name.to_string(),
                            })
                        }
                    }
                }

                OpCode::SetLocal => {
                    let slot = usize::from(self.fetch()?);
                    let value = self.peek(0)?;
                    let target = self
                        .stack
                        .get_mut(slot)
                        .ok_or(RuntimeError::StackUnderflow)?;
                    *target = value;
                }

                OpCode::GetLocal => {
                    let slot = usize::from(self.fetch()?);
                    let value = *self.stack.get(slot).ok_or(RuntimeError::StackUnderflow)?;
                    self.stack.push(value);
                }

                OpCode::Add => self.add()?,
                OpCode::Subtract => self.arithmetic("-", |a, b| a - b)?,
                OpCode::Multiply => self.arithmetic("*", |a, b| a * b)?,
                OpCode::Divide => self.arithmetic("/", |a, b| a / b)?,

                OpCode::Negate => {
                    let value = self.peek(0)?;
                    let Some(n) = value.as_number() else {
                        return Err(RuntimeError::NegateTypeMismatch {
                            operand: value.kind(),
                        });
                    };
                    self.pop()?;
                    self.stack.push(Value::Number(-n));
                }

                OpCode::Less => self.comparison("<", |a, b| a < b)?,
                OpCode::Greater => self.comparison(">", |a, b| a > b)?,

                OpCode::Equals => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    // Value equality is the language's `==`: mixed kinds are
                    // unequal, strings compare by interned identity.
                    self.stack.push(Value::Bool(lhs == rhs));
                }
            }
        }
    }

    // -------------------------------------------------------------------
    // Fetch primitives
    // -------------------------------------------------------------------

    /// Reads the byte at `ip` and advances.
    fn fetch(&mut self) -> Result<u8, RuntimeError> {
        let byte = self
            .chunk
            .code()
            .get(self.ip)
            .copied()
            .ok_or(RuntimeError::CorruptChunk {
                offset: self.ip,
                detail: "code ended mid-instruction",
            })?;
        self.ip += 1;
        Ok(byte)
    }

    /// Fetches a varname operand and resolves it in the chunk's pool.
    fn fetch_name(&mut self, offset: usize) -> Result<&'a str, RuntimeError> {
        let idx = self.fetch()?;
        self.chunk.varname(idx).ok_or(RuntimeError::CorruptChunk {
            offset,
            detail: "variable name index out of range",
        })
    }

    // -------------------------------------------------------------------
    // Stack primitives
    // -------------------------------------------------------------------

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Reads `depth` values below the top without popping.
    fn peek(&self, depth: usize) -> Result<Value, RuntimeError> {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| self.stack.get(i))
            .copied()
            .ok_or(RuntimeError::StackUnderflow)
    }

    // -------------------------------------------------------------------
    // Operator implementations
    // -------------------------------------------------------------------

    /// `Add` is the one polymorphic operator: numeric addition or string
    /// concatenation. The concatenation result is interned, so `==` on it
    /// keeps working by identity.
    fn add(&mut self) -> Result<(), RuntimeError> {
        let rhs = self.peek(0)?;
        let lhs = self.peek(1)?;
        match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => {
                self.pop()?;
                self.pop()?;
                self.stack.push(Value::Number(a + b));
            }
            (Value::Obj(a), Value::Obj(b)) => {
                self.pop()?;
                self.pop()?;
                let joined = self.heap.concat(a, b);
                self.stack.push(Value::Obj(joined));
            }
            _ => {
                return Err(RuntimeError::TypeMismatch {
                    op: "+",
                    lhs: lhs.kind(),
                    rhs: rhs.kind(),
                })
            }
        }
        Ok(())
    }

    fn arithmetic(&mut self, op: &'static str, apply: fn(f32, f32) -> f32) -> Result<(), RuntimeError> {
        let (a, b) = self.numeric_operands(op)?;
        self.stack.push(Value::Number(apply(a, b)));
        Ok(())
    }

    fn comparison(&mut self, op: &'static str, apply: fn(f32, f32) -> bool) -> Result<(), RuntimeError> {
        let (a, b) = self.numeric_operands(op)?;
        self.stack.push(Value::Bool(apply(a, b)));
        Ok(())
    }

    /// Type-checks the top two values, then pops and returns them.
    /// On mismatch the stack is left untouched.
    fn numeric_operands(&mut self, op: &'static str) -> Result<(f32, f32), RuntimeError> {
        let rhs = self.peek(0)?;
        let lhs = self.peek(1)?;
        match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => {
                self.pop()?;
                self.pop()?;
                Ok((a, b))
            }
            _ => Err(RuntimeError::TypeMismatch {
                op,
                lhs: lhs.kind(),
                rhs: rhs.kind(),
            }),
        }
    }
}
