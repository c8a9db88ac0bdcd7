//! # Scheduler
//!
//! Round-robin scheduling of the tasks held by one execution machine. Time
//! is a discrete counter: one call to [`RoundRobin::tick`] is one time unit
//! (ut) and executes at most one instruction.
//!
//! ## Scheduling Algorithm
//!
//! At each tick:
//! 1. **Admit**: every `New` task becomes `Ready`; its entry time is the
//!    current clock.
//! 2. **Stop** when every task is `Terminated`.
//! 3. **Dispatch**: if the task under the cursor is not `Running`, scan
//!    circularly from the cursor for the first `Ready` task, mark it
//!    `Running` and load its context.
//! 4. **Execute** one instruction and charge one unit of CPU time.
//! 5. **Terminate** on HALT or fault: save the context, record the exit time
//!    (`clock + 1`), reset the preemption counter.
//!    Otherwise **preempt** if the counter has reached the quantum and some
//!    other task is `Ready`: save the context, mark the task `Ready`, move
//!    the cursor on, reset the counter. If nobody else is ready the task
//!    keeps the processor and the counter keeps growing.
//! 6. Advance the clock.
//!
//! The preemption counter starts at 1 and is compared before it is
//! incremented, so a task runs exactly `quantum` units per turn while
//! another task is waiting.

use tracing::{debug, warn};

use crate::config::{MachineConfig, BATCH_CAPACITY};
use crate::console::Console;
use crate::error::ExecutionError;
use crate::interpreter::{Interpreter, Outcome};
use crate::machine::ExecutionMachine;
use crate::task::TaskState;

/// Clock values at which a task entered the ready queue and terminated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueTimes {
    pub enter: u32,
    pub exit: u32,
}

impl QueueTimes {
    /// Time from admission to termination.
    pub fn turnaround(&self) -> u32 {
        self.exit.saturating_sub(self.enter)
    }
}

// ---------------------------------------------------------------------------
// Round-robin state
// ---------------------------------------------------------------------------

/// Scheduling state and statistics for one execution machine.
#[derive(Debug, Clone)]
pub struct RoundRobin {
    /// Time units elapsed.
    pub clock: u32,

    /// Units the running task has held the processor in its current turn,
    /// starting at 1.
    pub preemption_counter: u32,

    /// Entry and exit clock values, indexed like the machine's tasks.
    pub times: [QueueTimes; BATCH_CAPACITY],

    /// Number of quantum preemptions performed.
    pub preemptions: u32,

    /// Faults that terminated tasks, in the order they happened.
    pub faults: Vec<ExecutionError>,

    /// Index of the task that owns the processor or is next in line.
    cursor: usize,

    quantum: u32,
}

impl RoundRobin {
    /// Fresh state at clock 0 with the cursor on the first task. A zero
    /// `quantum` is raised to one unit.
    pub fn new(quantum: u32) -> Self {
        Self {
            clock: 0,
            preemption_counter: 1,
            times: [QueueTimes::default(); BATCH_CAPACITY],
            preemptions: 0,
            faults: Vec::new(),
            cursor: 0,
            quantum: quantum.max(1),
        }
    }

    /// State for a machine running under `config`.
    pub fn from_config(config: &MachineConfig) -> Self {
        Self::new(config.quantum)
    }

    /// Time slice in effect, never zero.
    #[inline]
    pub fn quantum(&self) -> u32 {
        self.quantum
    }

    /// Runs the machine until every task has terminated.
    pub fn run(
        &mut self,
        machine: &mut ExecutionMachine,
        interpreter: &Interpreter<'_>,
        console: &dyn Console,
    ) {
        while self.tick(machine, interpreter, console) {}

        debug!(
            clock = self.clock,
            preemptions = self.preemptions,
            "machine finished"
        );
    }

    /// Performs one time unit. Returns `false` once the run is over.
    pub fn tick(
        &mut self,
        machine: &mut ExecutionMachine,
        interpreter: &Interpreter<'_>,
        console: &dyn Console,
    ) -> bool {
        self.admit(machine);

        if !machine.has_live_tasks() {
            return false;
        }

        if machine.tasks[self.cursor].state != TaskState::Running && !self.dispatch(machine) {
            // Live tasks but none ready: nothing can ever run again.
            warn!(clock = self.clock, "no ready task to dispatch");
            self.clock += 1;
            return false;
        }

        let index = self.cursor;
        let outcome = interpreter.step(machine, index);
        machine.tasks[index].cpu_time += 1;

        match outcome {
            Outcome::Halt => self.terminate(machine, index),
            Outcome::Error(err) => {
                debug!(%err, "task faulted");
                console.fault(&err);
                self.faults.push(err);
                self.terminate(machine, index);
            }
            Outcome::Ok => {
                if self.preemption_counter >= self.quantum
                    && machine.find_state(TaskState::Ready).is_some()
                {
                    self.preempt(machine);
                } else {
                    self.preemption_counter += 1;
                }
            }
        }

        self.clock += 1;
        true
    }

    /// Moves every `New` task to `Ready`, stamping its entry time.
    fn admit(&mut self, machine: &mut ExecutionMachine) {
        for (index, task) in machine.tasks.iter_mut().enumerate() {
            if task.state == TaskState::New {
                task.state = TaskState::Ready;
                self.times[index].enter = self.clock;
                debug!(task = task.name(), id = task.id, clock = self.clock, "admitted");
            }
        }
    }

    /// Scans circularly from the cursor for a `Ready` task and gives it the
    /// processor. Returns `false` if none was found; the cursor still moves.
    fn dispatch(&mut self, machine: &mut ExecutionMachine) -> bool {
        let count = machine.task_count();

        for _ in 0..count {
            if machine.tasks[self.cursor].state == TaskState::Ready {
                machine.tasks[self.cursor].state = TaskState::Running;
                machine.load_context(self.cursor);
                debug!(
                    task = machine.tasks[self.cursor].name(),
                    clock = self.clock,
                    "dispatched"
                );
                return true;
            }
            self.advance_cursor(count);
        }

        false
    }

    /// Takes the processor from the running task at the cursor.
    fn preempt(&mut self, machine: &mut ExecutionMachine) {
        let index = self.cursor;
        machine.save_context(index);
        machine.tasks[index].state = TaskState::Ready;
        debug!(task = machine.tasks[index].name(), clock = self.clock, "preempted");

        self.advance_cursor(machine.task_count());
        self.preemption_counter = 1;
        self.preemptions += 1;
    }

    fn terminate(&mut self, machine: &mut ExecutionMachine, index: usize) {
        machine.save_context(index);
        machine.tasks[index].state = TaskState::Terminated;
        self.times[index].exit = self.clock + 1;
        self.preemption_counter = 1;
        debug!(
            task = machine.tasks[index].name(),
            exit = self.clock + 1,
            "terminated"
        );
    }

    #[inline]
    fn advance_cursor(&mut self, count: usize) {
        self.cursor = (self.cursor + 1) % count.max(1);
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZeroLiteral;
    use crate::console::ScriptedConsole;
    use crate::program::parse_source;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn machine(sources: &[&str]) -> ExecutionMachine {
        let programs = sources
            .iter()
            .enumerate()
            .map(|(i, src)| Arc::new(parse_source(&format!("T{}", i + 1), src)));
        ExecutionMachine::with_programs(programs).unwrap()
    }

    /// Index of the task that executed in each tick, in order.
    fn trace_run(rr: &mut RoundRobin, m: &mut ExecutionMachine, console: &ScriptedConsole) -> Vec<usize> {
        let interp = Interpreter::new(console, ZeroLiteral::Lookup);
        let mut order = Vec::new();
        loop {
            let before: Vec<u32> = m.tasks.iter().map(|t| t.cpu_time).collect();
            if !rr.tick(m, &interp, console) {
                return order;
            }
            let ran = (0..m.task_count())
                .find(|&i| m.tasks[i].cpu_time != before[i])
                .unwrap();
            order.push(ran);
        }
    }

    const FOUR: &str = "LOAD 1\nADD 1\nADD 1\nHALT\n";

    #[test]
    fn test_single_task_never_preempted() {
        let console = ScriptedConsole::default();
        let mut m = machine(&[FOUR]);
        let mut rr = RoundRobin::new(2);
        let interp = Interpreter::new(&console, ZeroLiteral::Lookup);

        rr.run(&mut m, &interp, &console);

        assert_eq!(rr.clock, 4);
        assert_eq!(rr.preemptions, 0, "Sole ready task must not be preempted");
        assert_eq!(m.tasks[0].cpu_time, 4);
        assert_eq!(rr.times[0], QueueTimes { enter: 0, exit: 4 });
    }

    #[test]
    fn test_two_tasks_alternate_every_quantum() {
        let console = ScriptedConsole::default();
        let mut m = machine(&[FOUR, FOUR]);
        let mut rr = RoundRobin::new(2);

        let order = trace_run(&mut rr, &mut m, &console);

        assert_eq!(order, vec![0, 0, 1, 1, 0, 0, 1, 1]);
        assert_eq!(rr.clock, 8);
        assert_eq!(rr.preemptions, 2);
        assert_eq!(rr.times[0], QueueTimes { enter: 0, exit: 6 });
        assert_eq!(rr.times[1], QueueTimes { enter: 0, exit: 8 });
        assert_eq!(m.tasks[0].cpu_time, 4);
        assert_eq!(m.tasks[1].cpu_time, 4);
    }

    #[test]
    fn test_fault_terminates_only_the_offender() {
        let console = ScriptedConsole::default();
        let mut m = machine(&["DIV 0\nHALT\n", FOUR]);
        let mut rr = RoundRobin::new(2);
        let interp = Interpreter::new(&console, ZeroLiteral::Lookup);

        rr.run(&mut m, &interp, &console);

        assert!(m.tasks.iter().all(|t| t.is_terminated()));
        assert_eq!(m.tasks[0].cpu_time, 1);
        assert_eq!(m.tasks[1].cpu_time, 4);
        assert_eq!(rr.times[0].exit, 1);
        assert_eq!(rr.times[1].exit, 5);
        assert_eq!(console.faults().len(), 1);
        assert_eq!(rr.faults, console.faults());
        assert_eq!(console.faults()[0].program, "T1");
    }

    #[test]
    fn test_longer_quantum() {
        let console = ScriptedConsole::default();
        let mut m = machine(&[FOUR, FOUR]);
        let mut rr = RoundRobin::new(3);

        let order = trace_run(&mut rr, &mut m, &console);
        assert_eq!(order, vec![0, 0, 0, 1, 1, 1, 0, 1]);
    }

    #[test]
    fn test_contexts_survive_preemption() {
        let console = ScriptedConsole::default();
        let a = "LOAD 10\nADD 1\nADD 1\nWRITE\nHALT\n";
        let b = "LOAD 50\nSUB 1\nSUB 1\nWRITE\nHALT\n";
        let mut m = machine(&[a, b]);
        let mut rr = RoundRobin::new(2);
        let interp = Interpreter::new(&console, ZeroLiteral::Lookup);

        rr.run(&mut m, &interp, &console);

        assert_eq!(console.written(), vec![12, 48]);
        assert_eq!(m.tasks[0].saved.register, 12);
        assert_eq!(m.tasks[1].saved.register, 48);
    }

    fn program_source() -> impl Strategy<Value = String> {
        let op = prop_oneof![
            Just("LOAD 3".to_owned()),
            Just("ADD 2".to_owned()),
            Just("MUL 2".to_owned()),
            Just("STORE A".to_owned()),
            Just("SUB A".to_owned()),
            Just("DIV A".to_owned()),
            Just("WRITE".to_owned()),
        ];
        (proptest::collection::vec(op, 0..12), any::<bool>()).prop_map(|(ops, halt)| {
            let mut src = ops.join("\n");
            if halt {
                src.push_str("\nHALT");
            }
            src
        })
    }

    proptest! {
        #[test]
        fn at_most_one_task_running(
            a in program_source(),
            b in program_source(),
            quantum in 1u32..5,
        ) {
            let console = ScriptedConsole::default();
            let mut m = machine(&[a.as_str(), b.as_str()]);
            let mut rr = RoundRobin::new(quantum);
            let interp = Interpreter::new(&console, ZeroLiteral::Lookup);

            let mut ticks = 0u32;
            while rr.tick(&mut m, &interp, &console) {
                let running = m.tasks.iter().filter(|t| t.state == TaskState::Running).count();
                prop_assert!(running <= 1);
                ticks += 1;
                prop_assert!(ticks < 1000, "run did not terminate");
            }

            prop_assert!(m.tasks.iter().all(|t| t.is_terminated()));
            let cpu: u32 = m.tasks.iter().map(|t| t.cpu_time).sum();
            prop_assert_eq!(cpu, rr.clock, "every unit runs exactly one instruction");
            for t in m.tasks.iter() {
                prop_assert!(t.pc <= t.program.len());
            }
        }
    }
}
