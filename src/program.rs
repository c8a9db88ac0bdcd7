//! # Program Representation
//!
//! An LPAS program is an immutable, ordered list of instructions plus a
//! name. Instructions are split into opcode and argument when loaded; the
//! argument stays textual and is resolved by the interpreter at execution
//! time, because whether it is a literal or a variable depends on the
//! task's variable table at that moment.
//!
//! ## Source Format
//!
//! ```text
//! ; comment lines are ignored
//! READ X      ; so is anything after a semicolon
//! LOAD X
//! MUL 2
//! WRITE
//! HALT
//! ```
//!
//! One instruction per line, opcode first (case-sensitive), at most one
//! argument. Lines are truncated to `INSTRUCTION_CAPACITY` characters and
//! only the first `MAX_INSTRUCTIONS` instructions are kept.

use std::fmt;
use std::str::FromStr;

use crate::config::{COMMENT_MARKER, INSTRUCTION_CAPACITY, MAX_INSTRUCTIONS};

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Read,
    Write,
    Load,
    Store,
    Add,
    Sub,
    Mul,
    Div,
    Halt,
}

impl Opcode {
    pub const ALL: [Opcode; 9] = [
        Opcode::Read,
        Opcode::Write,
        Opcode::Load,
        Opcode::Store,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Halt,
    ];

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Read => "READ",
            Opcode::Write => "WRITE",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Halt => "HALT",
        }
    }
}

impl FromStr for Opcode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Opcode::ALL
            .into_iter()
            .find(|op| op.mnemonic() == s)
            .ok_or(())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// One decoded source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Source text as stored (comment stripped, truncated, trimmed).
    pub text: String,
    /// `None` when the first token is not a known mnemonic. Such an
    /// instruction only faults when it is executed.
    pub opcode: Option<Opcode>,
    /// Second token of the line, if any.
    pub argument: Option<String>,
}

impl Instruction {
    /// Splits `text` into opcode and optional argument. Tokens past the
    /// argument are ignored.
    pub fn decode(text: &str) -> Self {
        let mut tokens = text.split_whitespace();
        let opcode = tokens.next().and_then(|t| t.parse().ok());
        let argument = tokens.next().map(str::to_owned);

        Self {
            text: text.trim().to_owned(),
            opcode,
            argument,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ---------------------------------------------------------------------------
// Programs
// ---------------------------------------------------------------------------

/// A loaded program: its base name and decoded instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Base name, without the `.lpas` extension.
    pub name: String,
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(name: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            instructions,
        }
    }

    /// Number of instructions. Also the one valid `pc` value that does not
    /// address an instruction.
    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instruction at `pc`, or `None` at or past the end.
    pub fn get(&self, pc: usize) -> Option<&Instruction> {
        self.instructions.get(pc)
    }
}

/// Parses LPAS source text into a program called `name`.
pub fn parse_source(name: &str, source: &str) -> Program {
    let instructions = source
        .lines()
        .filter_map(|line| {
            let code = match line.find(COMMENT_MARKER) {
                Some(at) => &line[..at],
                None => line,
            };
            let code: String = code
                .chars()
                .filter(|&c| c != '\r')
                .take(INSTRUCTION_CAPACITY)
                .collect();

            (!code.trim().is_empty()).then(|| Instruction::decode(&code))
        })
        .take(MAX_INSTRUCTIONS)
        .collect();

    Program::new(name, instructions)
}
