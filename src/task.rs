//! # Task Control Block
//!
//! Defines the per-task state of the execution machine. Each task runs one
//! LPAS program and owns its saved working state (register and variables)
//! plus the counters the scheduler and the metrics reporter need.
//!
//! The live working state of the running task is not kept here but in the
//! machine's scratch [`Context`]; it is copied in on dispatch and copied back
//! on preemption or termination (see `machine.rs`).

use std::sync::Arc;

use crate::config::MAX_VARIABLES;
use crate::fixed::{CapacityError, FixedVec};
use crate::program::Program;

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Lifecycle state of a task.
///
/// ```text
///   ┌─────┐  admit   ┌───────┐  dispatch  ┌─────────┐  HALT / fault  ┌────────────┐
///   │ New │ ───────► │ Ready │ ─────────► │ Running │ ─────────────► │ Terminated │
///   └─────┘          └───────┘ ◄───────── └─────────┘                └────────────┘
///                               preempt
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created with its batch, not yet admitted to the ready queue.
    New,
    /// Waiting for the processor.
    Ready,
    /// Executing. At most one task of a machine is in this state.
    Running,
    /// Reserved; the round-robin policy never moves a task here.
    Suspended,
    /// Finished, either by HALT or by a fault. Terminal.
    Terminated,
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// A named integer bound by READ or STORE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Name as written in the program, case-sensitive.
    pub name: String,
    pub value: i32,
}

/// Named integer variables of one task, bounded by `MAX_VARIABLES`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTable {
    slots: FixedVec<Variable, MAX_VARIABLES>,
}

impl VariableTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<i32> {
        self.slots.iter().find(|v| v.name == name).map(|v| v.value)
    }

    /// Updates `name` in place, or creates it if absent.
    pub fn bind(&mut self, name: &str, value: i32) -> Result<(), CapacityError<Variable>> {
        if let Some(slot) = self.slots.iter_mut().find(|v| v.name == name) {
            slot.value = value;
            return Ok(());
        }
        self.slots.try_push(Variable {
            name: name.to_owned(),
            value,
        })
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Working context
// ---------------------------------------------------------------------------

/// The state an instruction can mutate apart from the program counter:
/// the accumulator register and the variable table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub register: i32,
    pub variables: VariableTable,
}

impl Context {
    /// Overwrites `self` with `other`, reusing existing storage.
    pub fn copy_from(&mut self, other: &Context) {
        self.register = other.register;
        self.variables.clone_from(&other.variables);
    }
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Task Control Block (TCB).
///
/// Owned exclusively by one execution machine. The scheduler mutates
/// `state`; the interpreter mutates `pc`, `cpu_time`, `io_time` and, through
/// the scratch context, `saved`.
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// Ordinal within the batch, starting at 1.
    pub id: usize,

    /// Program executed by this task. Shared read-only.
    pub program: Arc<Program>,

    /// Lifecycle state, driven by the scheduler.
    pub state: TaskState,

    /// Index of the next instruction. `0 <= pc <= program.len()`.
    pub pc: usize,

    /// Time units spent running.
    pub cpu_time: u32,

    /// Time units charged for console input.
    pub io_time: u32,

    /// Register and variables as of the last context save.
    pub saved: Context,
}

impl TaskContext {
    /// A `New` task at the start of `program` with an empty context.
    pub fn new(id: usize, program: Arc<Program>) -> Self {
        Self {
            id,
            program,
            state: TaskState::New,
            pc: 0,
            cpu_time: 0,
            io_time: 0,
            saved: Context::default(),
        }
    }

    /// Name of the program this task runs.
    pub fn name(&self) -> &str {
        &self.program.name
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.state == TaskState::Terminated
    }

    /// Advances `pc` past the current instruction, never beyond the end of
    /// the program.
    #[inline]
    pub fn advance_pc(&mut self) {
        self.pc = (self.pc + 1).min(self.program.len());
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
