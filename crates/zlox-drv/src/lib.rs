//! zlox-drv - Driver
//!
//! ============================================================================
//! DRIVER OVERVIEW
//! ============================================================================
//!
//! Entry point and pipeline orchestrator. The driver owns everything outside
//! the language core:
//!
//! 1. COMMAND LINE PARSING
//!    - One source file argument plus the optional `--debug` flag
//!    - Anything else prints usage and exits 1
//!
//! 2. FILE MANAGEMENT
//!    - Reads the source whole, as UTF-8
//!
//! 3. PIPELINE ORCHESTRATION
//!    - Runs scan, compile, and execute in order
//!    - Threads the shared heap from the compiler into the VM
//!
//! 4. ERROR REPORTING
//!    - First error from any phase aborts the pipeline
//!    - `main` prints it to stderr and exits non-zero
//!
//! ============================================================================
//! EXECUTION PIPELINE
//! ============================================================================
//!
//! ```text
//! source file
//!      │
//!      ▼
//!  [Scanner] ──▶ tokens            (--debug: token dump to stderr)
//!      │
//!      ▼
//!  [Compiler] ──▶ chunk + heap     (--debug: disassembly to stderr)
//!      │
//!      ▼
//!  [VM] ──▶ stdout                 (--debug: stack dump if the chunk
//!                                   exits with values left over)
//! ```
//!
//! ============================================================================
//! COMMAND LINE INTERFACE
//! ============================================================================
//!
//! Run a program:
//!   zlox program.lox
//!
//! Run with diagnostics on stderr:
//!   zlox program.lox --debug
//!
//! Exit codes:
//! - 0: the program ran to completion
//! - 1: bad command line, unreadable file, or any scan, compile, or
//!      runtime error
//!
//! `print` output is the only thing written to stdout; every diagnostic
//! goes to stderr, so program output stays pipeable.
//!
//! ============================================================================
//! RESOURCE LIFETIMES
//! ============================================================================
//!
//! Cleanup is ownership: heap, chunk, and VM all live in [`run`]'s frame and
//! drop on every path, success or error. The chunk borrows the source
//! buffer and the VM borrows both the chunk and the heap, so the borrow
//! checker pins the teardown order the design requires.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;

use zlox_com::Compiler;
use zlox_lex::{Scanner, Token};
use zlox_util::Heap;
use zlox_vm::{RuntimeError, Vm};

/// Printed when the command line is unusable.
pub const USAGE: &str = "Usage: zlox <filename.lox>";

/// The command line could not be parsed.
#[derive(Debug)]
pub struct UsageError;

/// One invocation's configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The source file to run.
    pub path: PathBuf,
    /// Dump tokens and bytecode to stderr, and the operand stack if the
    /// program exits with values left on it.
    pub debug: bool,
}

impl Config {
    /// Parses command-line arguments (without the program name).
    pub fn from_args<I>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut path = None;
        let mut debug = false;
        for arg in args {
            if arg == "--debug" {
                debug = true;
            } else if path.is_none() && !arg.starts_with("--") {
                path = Some(PathBuf::from(arg));
            } else {
                return Err(UsageError);
            }
        }
        match path {
            Some(path) => Ok(Self { path, debug }),
            None => Err(UsageError),
        }
    }
}

/// Reads, compiles, and runs the configured source file.
pub fn run(config: &Config) -> anyhow::Result<()> {
    let source = fs::read_to_string(&config.path)
        .with_context(|| format!("cannot read {}", config.path.display()))?;

    let tokens = Scanner::scan_all(&source)?;
    if config.debug {
        dump_tokens(&tokens);
    }

    let mut heap = Heap::new();
    let chunk = Compiler::new(tokens, &mut heap).compile()?;
    if config.debug {
        chunk.disassemble(&heap, &mut io::stderr().lock())?;
    }

    let mut vm = Vm::new(&chunk, &mut heap, io::stdout().lock());
    let result = vm.run();

    if config.debug {
        if let Err(RuntimeError::StackNotEmpty { .. }) = &result {
            dump_stack(&vm);
        }
    }
    result?;
    Ok(())
}

fn dump_tokens(tokens: &[Token<'_>]) {
    eprintln!("== {} tokens ==", tokens.len());
    for token in tokens {
        eprintln!("  {:<12} {:?}", format!("{:?}", token.kind), token.lexeme);
    }
}

fn dump_stack<W: Write>(vm: &Vm<'_, W>) {
    eprintln!("== operand stack, {} values, bottom first ==", vm.stack().len());
    for (slot, value) in vm.stack().iter().enumerate() {
        eprintln!("  [{slot:3}] {}", value.display(vm.heap()));
    }
}
