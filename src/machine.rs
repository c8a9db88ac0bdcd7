//! # Execution Machine
//!
//! Holds the task control blocks of one batch and the scratch [`Context`]
//! that represents the running task's live register and variables.
//!
//! ## Context Switch
//!
//! ```text
//!              load_context(i)                 save_context(i)
//!   tasks[i].saved ──────────► scratch ───(run)───► tasks[i].saved
//!                 on dispatch          on preemption / termination
//! ```
//!
//! Only the scheduler calls the two halves, and never while an instruction
//! is executing. The interpreter only sees `scratch`.

use std::sync::Arc;

use tracing::trace;

use crate::config::BATCH_CAPACITY;
use crate::error::ExecutionError;
use crate::fixed::{CapacityError, FixedVec};
use crate::program::Program;
use crate::task::{Context, TaskContext, TaskState};

/// One simulated processor running the tasks of a single batch.
pub struct ExecutionMachine {
    /// Task control blocks, in admission order.
    pub tasks: FixedVec<TaskContext, BATCH_CAPACITY>,

    /// Live working state of whichever task is running.
    pub scratch: Context,

    /// Most recent fault raised by the interpreter.
    pub last_error: Option<ExecutionError>,
}

impl ExecutionMachine {
    /// Machine with no tasks and an empty scratch context.
    pub fn new() -> Self {
        Self {
            tasks: FixedVec::new(),
            scratch: Context::default(),
            last_error: None,
        }
    }

    /// Builds a machine holding one `New` task per program. Fails when more
    /// programs are given than a machine can hold.
    pub fn with_programs<I>(programs: I) -> Result<Self, CapacityError<Arc<Program>>>
    where
        I: IntoIterator<Item = Arc<Program>>,
    {
        let mut machine = Self::new();
        for program in programs {
            machine.create_task(program)?;
        }
        Ok(machine)
    }

    /// Registers a new task and returns its index.
    pub fn create_task(&mut self, program: Arc<Program>) -> Result<usize, CapacityError<Arc<Program>>> {
        let index = self.tasks.len();
        self.tasks
            .try_push(TaskContext::new(index + 1, program))
            .map_err(|err| CapacityError {
                capacity: err.capacity,
                rejected: err.rejected.program,
            })?;
        Ok(index)
    }

    #[inline]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Copies task `index`'s saved register and variables into the scratch
    /// context.
    pub fn load_context(&mut self, index: usize) {
        let task = &self.tasks[index];
        trace!(task = task.name(), register = task.saved.register, "load context");
        self.scratch.copy_from(&task.saved);
    }

    /// Copies the scratch context back into task `index`.
    pub fn save_context(&mut self, index: usize) {
        let task = &mut self.tasks[index];
        trace!(
            task = task.name(),
            register = self.scratch.register,
            variables = self.scratch.variables.len(),
            "save context"
        );
        task.saved.copy_from(&self.scratch);
    }

    /// Index of the first task in `state`, if any.
    pub fn find_state(&self, state: TaskState) -> Option<usize> {
        self.tasks.iter().position(|t| t.state == state)
    }

    /// True while at least one task has not terminated.
    pub fn has_live_tasks(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_terminated())
    }
}

impl Default for ExecutionMachine {
    fn default() -> Self {
        Self::new()
    }
}
