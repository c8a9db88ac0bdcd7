//! # Errors
//!
//! Interpreter faults are plain values attached to the task that raised
//! them: they terminate that task only. Loader failures drop a single
//! program. Dispatch failures are fatal to the whole run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Closed set of interpreter fault kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Unrecognised opcode, or the program ran past its last instruction
    /// without executing HALT.
    #[error("invalid instruction")]
    InvalidInstruction,
    /// Argument could not be resolved, division by zero, numeric READ
    /// target, or a full variable table.
    #[error("invalid argument")]
    InvalidArgument,
    /// A required operand is absent.
    #[error("missing argument")]
    MissingArgument,
    /// The console answered a READ with something that is not an integer.
    #[error("invalid symbol")]
    InvalidSymbol,
}

impl ErrorKind {
    /// Numeric code printed in fault reports.
    pub const fn code(self) -> u8 {
        match self {
            ErrorKind::InvalidInstruction => 1,
            ErrorKind::InvalidArgument => 2,
            ErrorKind::MissingArgument => 3,
            ErrorKind::InvalidSymbol => 5,
        }
    }
}

/// A fault raised while executing one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{kind} (code {code}) in `{program}` at line {line}: `{instruction}`",
    code = .kind.code(),
    line = .pc + 1
)]
pub struct ExecutionError {
    /// Index of the faulting instruction (program counter before increment).
    pub pc: usize,
    /// Raw text of the faulting instruction; empty when the program ran
    /// off its end.
    pub instruction: String,
    /// Name of the program the faulting task runs.
    pub program: String,
    pub kind: ErrorKind,
}

impl ExecutionError {
    /// One-based source line of the faulting instruction, as shown to the
    /// operator.
    pub fn line(&self) -> usize {
        self.pc + 1
    }
}

/// Failure to read a program file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("program {} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures that abort a dispatch run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to spawn worker for batch tes{batch}: {source}")]
    Spawn {
        batch: u32,
        #[source]
        source: io::Error,
    },

    #[error("worker for batch tes{batch} panicked")]
    WorkerPanicked { batch: u32 },

    #[error("batch tes{batch} holds {size} programs, more than one machine can run")]
    BatchTooLarge { batch: u32, size: usize },
}
