//! # Instruction Interpreter
//!
//! Executes exactly one instruction of the running task per call: fetch at
//! `pc`, advance `pc`, then apply the opcode to the machine's scratch
//! context. A fault is returned as [`Outcome::Error`] and never unwinds.
//!
//! ## Opcodes
//!
//! | Opcode | Effect | Faults |
//! |--------|--------|--------|
//! | `READ name` | read an integer from the console into `name`, +`READ_TIME` IO | missing / numeric name, malformed input, table full |
//! | `WRITE [arg]` | print `arg` (the register when omitted) | unresolvable `arg` |
//! | `LOAD arg` | `register = arg` | missing / unresolvable `arg` |
//! | `STORE name` | `name = register` | missing name, table full |
//! | `ADD/SUB/MUL/DIV arg` | `register op= arg` | missing / unresolvable `arg`, DIV by zero |
//! | `HALT` | end the program | — |
//!
//! ## Argument Resolution
//!
//! Under [`ZeroLiteral::Lookup`] an argument is a literal when its leading
//! decimal digits parse to a non-zero value; anything parsing to zero,
//! the literal `0` included, is looked up as a variable name. Under
//! [`ZeroLiteral::Literal`] only a token that parses entirely as an integer
//! is a literal, and zero is an ordinary value.

use std::sync::Arc;

use tracing::trace;

use crate::config::{ZeroLiteral, READ_TIME};
use crate::console::Console;
use crate::error::{ErrorKind, ExecutionError};
use crate::machine::ExecutionMachine;
use crate::program::Opcode;
use crate::task::{Context, TaskContext};

/// Result of executing one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Instruction completed; the task may continue.
    Ok,
    /// HALT executed; the task completed successfully.
    Halt,
    /// The instruction faulted; the task must be terminated.
    Error(ExecutionError),
}

/// Control flow after a successfully executed opcode.
enum Flow {
    Continue,
    Halt,
}

/// Executes instructions against an [`ExecutionMachine`], talking to the
/// operator through a [`Console`].
pub struct Interpreter<'a> {
    console: &'a dyn Console,
    zero_literal: ZeroLiteral,
}

impl<'a> Interpreter<'a> {
    /// Interpreter using `console` for READ and WRITE.
    pub fn new(console: &'a dyn Console, zero_literal: ZeroLiteral) -> Self {
        Self {
            console,
            zero_literal,
        }
    }

    /// Executes the next instruction of task `index` against the scratch
    /// context. The task's context must already be loaded.
    pub fn step(&self, machine: &mut ExecutionMachine, index: usize) -> Outcome {
        let ExecutionMachine {
            tasks,
            scratch,
            last_error,
        } = machine;
        let task = &mut tasks[index];

        let pc = task.pc;
        let program = Arc::clone(&task.program);
        let instruction = program.get(pc);
        task.advance_pc();

        trace!(task = task.name(), pc, instruction = ?instruction.map(|i| &i.text), "execute");

        let result = match instruction {
            // Fell off the end without HALT.
            None => Err(ErrorKind::InvalidInstruction),
            Some(instr) => match instr.opcode {
                Some(opcode) => self.execute(opcode, instr.argument.as_deref(), task, scratch),
                None => Err(ErrorKind::InvalidInstruction),
            },
        };

        match result {
            Ok(Flow::Continue) => Outcome::Ok,
            Ok(Flow::Halt) => Outcome::Halt,
            Err(kind) => {
                let error = ExecutionError {
                    pc,
                    instruction: instruction.map(|i| i.text.clone()).unwrap_or_default(),
                    program: program.name.clone(),
                    kind,
                };
                *last_error = Some(error.clone());
                Outcome::Error(error)
            }
        }
    }

    fn execute(
        &self,
        opcode: Opcode,
        argument: Option<&str>,
        task: &mut TaskContext,
        scratch: &mut Context,
    ) -> Result<Flow, ErrorKind> {
        match opcode {
            Opcode::Read => {
                let name = argument.ok_or(ErrorKind::MissingArgument)?;
                if self.literal(name).is_some() {
                    return Err(ErrorKind::InvalidArgument);
                }

                let value = self
                    .console
                    .read(task.name())
                    .ok_or(ErrorKind::InvalidSymbol)?;
                scratch
                    .variables
                    .bind(name, value)
                    .map_err(|_| ErrorKind::InvalidArgument)?;
                task.io_time += READ_TIME;
            }
            Opcode::Write => {
                let value = match argument {
                    Some(arg) => self.resolve(arg, scratch)?,
                    None => scratch.register,
                };
                self.console.write(task.name(), value);
            }
            Opcode::Load => {
                let arg = argument.ok_or(ErrorKind::MissingArgument)?;
                scratch.register = self.resolve(arg, scratch)?;
            }
            Opcode::Store => {
                let name = argument.ok_or(ErrorKind::MissingArgument)?;
                let register = scratch.register;
                scratch
                    .variables
                    .bind(name, register)
                    .map_err(|_| ErrorKind::InvalidArgument)?;
            }
            Opcode::Add => self.arithmetic(argument, scratch, |r, v| Some(r.wrapping_add(v)))?,
            Opcode::Sub => self.arithmetic(argument, scratch, |r, v| Some(r.wrapping_sub(v)))?,
            Opcode::Mul => self.arithmetic(argument, scratch, |r, v| Some(r.wrapping_mul(v)))?,
            Opcode::Div => self.arithmetic(argument, scratch, |r, v| {
                (v != 0).then(|| r.wrapping_div(v))
            })?,
            Opcode::Halt => return Ok(Flow::Halt),
        }

        Ok(Flow::Continue)
    }

    /// `R := op(R, argument)`. `op` returns `None` for an undefined result
    /// (division by zero), which leaves the register untouched.
    fn arithmetic(
        &self,
        argument: Option<&str>,
        scratch: &mut Context,
        op: impl Fn(i32, i32) -> Option<i32>,
    ) -> Result<(), ErrorKind> {
        let arg = argument.ok_or(ErrorKind::MissingArgument)?;
        let value = self.resolve(arg, scratch)?;
        scratch.register = op(scratch.register, value).ok_or(ErrorKind::InvalidArgument)?;
        Ok(())
    }

    /// Literal value of `argument` under the configured zero policy.
    fn literal(&self, argument: &str) -> Option<i32> {
        match self.zero_literal {
            ZeroLiteral::Lookup => Some(leading_integer(argument)).filter(|&v| v != 0),
            ZeroLiteral::Literal => argument.parse().ok(),
        }
    }

    /// Resolves `argument` to a value: literal first, then variable lookup.
    pub fn resolve(&self, argument: &str, scratch: &Context) -> Result<i32, ErrorKind> {
        self.literal(argument)
            .or_else(|| scratch.variables.get(argument))
            .ok_or(ErrorKind::InvalidArgument)
    }
}

/// Value of the leading decimal integer of `s`: optional whitespace, an
/// optional sign, then digits up to the first non-digit. Yields 0 when
/// there are no digits and saturates on overflow.
pub fn leading_integer(s: &str) -> i32 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }

    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
