//! # TES Configuration
//!
//! Compile-time capacities governing the execution machine and the program
//! loader, plus the small set of runtime knobs collected in
//! [`MachineConfig`]. Capacities are fixed at compile time; exceeding one is
//! either truncated (loader) or reported as an error (variable table).

/// Maximum number of tasks an execution machine holds. One batch is handed
/// to exactly one machine, so this is also the batch size.
pub const BATCH_CAPACITY: usize = 2;

/// Maximum number of program names accepted on one command line.
pub const MAX_PROGRAMS_PER_COMMAND: usize = 4;

/// Maximum number of instructions kept from a program file. Lines past
/// this limit are ignored.
pub const MAX_INSTRUCTIONS: usize = 255;

/// Maximum length of one instruction, in characters. Longer lines are
/// truncated.
pub const INSTRUCTION_CAPACITY: usize = 10;

/// Maximum number of named variables a single task may hold.
pub const MAX_VARIABLES: usize = 50;

/// One simulated time unit (ut): one scheduler loop iteration.
pub const UT: u32 = 1;

/// Default time slice, in time units, before a task becomes preemptible.
pub const DEFAULT_QUANTUM: u32 = 2 * UT;

/// IO time charged to a task for each READ.
pub const READ_TIME: u32 = 3 * UT;

/// File suffix appended by the loader to every program name.
pub const PROGRAM_EXTENSION: &str = ".lpas";

/// Prompt shown by the interactive command surface.
pub const PROMPT: &str = "tes > ";

/// Command that ends an interactive session.
pub const EXIT_COMMAND: &str = "exit";

/// Starts a comment that runs to the end of the line.
pub const COMMENT_MARKER: char = ';';

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// How an instruction argument that parses to the number zero is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroLiteral {
    /// A literal `0` (or anything that parses to 0, such as a bare name) is
    /// looked up in the variable table. `LOAD 0` fails unless a variable
    /// called `0` exists.
    #[default]
    Lookup,
    /// A token that parses exactly as a decimal integer is always a literal,
    /// zero included.
    Literal,
}

/// How batches are handed to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Spawn one worker, wait for it, then spawn the next.
    #[default]
    Sequential,
    /// Spawn every worker first, then wait for all of them.
    Parallel,
}

/// Runtime settings shared by every execution machine of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    /// Time units a task runs before it may be preempted. Never zero.
    pub quantum: u32,

    /// Argument resolution policy for zero-valued literals.
    pub zero_literal: ZeroLiteral,

    /// Batch worker policy.
    pub dispatch: DispatchMode,
}

impl MachineConfig {
    /// Returns a copy with the given quantum, clamped to at least one unit.
    pub fn with_quantum(mut self, quantum: u32) -> Self {
        self.quantum = quantum.max(UT);
        self
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            quantum: DEFAULT_QUANTUM,
            zero_literal: ZeroLiteral::default(),
            dispatch: DispatchMode::default(),
        }
    }
}
