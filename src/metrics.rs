//! # Metrics
//!
//! Per-task occupancy and per-batch fairness figures, computed once a
//! machine has run to completion.
//!
//! | Figure | Formula |
//! |--------|---------|
//! | CPU occupancy | `cpu_time / clock × 100` |
//! | Turnaround | `exit − enter` |
//! | Wait | `exit − enter − cpu_time` |
//!
//! Batch figures are plain means over the batch's tasks. The rendered
//! report also lists the faults that terminated tasks of the batch.

use std::fmt;

use crate::config::PROGRAM_EXTENSION;
use crate::error::ExecutionError;
use crate::machine::ExecutionMachine;
use crate::scheduler::{QueueTimes, RoundRobin};

// ---------------------------------------------------------------------------
// Per-task figures
// ---------------------------------------------------------------------------

/// Figures of one task of a finished batch.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    /// Program name, without extension.
    pub name: String,
    /// Time units spent executing instructions.
    pub cpu_time: u32,
    /// Time units charged for READs.
    pub io_time: u32,
    /// Clock values at admission and termination.
    pub times: QueueTimes,
    /// Percentage of the batch's clock this task spent running.
    pub occupancy: f64,
}

impl TaskReport {
    /// `exit − enter`.
    pub fn turnaround(&self) -> u32 {
        self.times.turnaround()
    }

    /// Turnaround not spent running.
    pub fn wait(&self) -> u32 {
        self.turnaround().saturating_sub(self.cpu_time)
    }
}

// ---------------------------------------------------------------------------
// Per-batch figures
// ---------------------------------------------------------------------------

/// Figures of one finished batch, rendered as the operator report.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// Session-wide batch number, starting at 1.
    pub batch: u32,
    /// Total time units the machine ran.
    pub clock: u32,
    /// Quantum preemptions performed.
    pub preemptions: u32,
    pub tasks: Vec<TaskReport>,
    /// Faults that terminated tasks of this batch, in order.
    pub faults: Vec<ExecutionError>,
}

impl BatchReport {
    /// Collects the figures of a finished machine.
    pub fn collect(batch: u32, machine: &ExecutionMachine, rr: &RoundRobin) -> Self {
        let tasks = machine
            .tasks
            .iter()
            .enumerate()
            .map(|(index, task)| TaskReport {
                name: task.name().to_owned(),
                cpu_time: task.cpu_time,
                io_time: task.io_time,
                times: rr.times[index],
                occupancy: occupancy(task.cpu_time, rr.clock),
            })
            .collect();

        Self {
            batch,
            clock: rr.clock,
            preemptions: rr.preemptions,
            tasks,
            faults: rr.faults.clone(),
        }
    }

    /// Mean of `exit − enter`.
    pub fn average_turnaround(&self) -> f64 {
        self.mean(TaskReport::turnaround)
    }

    /// Mean of `exit − enter − cpu_time`.
    pub fn average_wait(&self) -> f64 {
        self.mean(TaskReport::wait)
    }

    fn mean(&self, figure: impl Fn(&TaskReport) -> u32) -> f64 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        let total: u64 = self.tasks.iter().map(|t| u64::from(figure(t))).sum();
        total as f64 / self.tasks.len() as f64
    }
}

/// `cpu_time` as a percentage of `clock`; zero when no time elapsed.
pub fn occupancy(cpu_time: u32, clock: u32) -> f64 {
    if clock == 0 {
        0.0
    } else {
        f64::from(cpu_time) / f64::from(clock) * 100.0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "- Process tes{}", self.batch)?;

        for task in &self.tasks {
            writeln!(f)?;
            writeln!(f, "\t- Task: {}{}", task.name, PROGRAM_EXTENSION)?;
            writeln!(f, "\tCPU time = {} ut", task.cpu_time)?;
            writeln!(f, "\tIO time = {} ut", task.io_time)?;
            writeln!(f, "\tCPU occupancy = {:.2}%", task.occupancy)?;
        }

        if !self.faults.is_empty() {
            writeln!(f)?;
            writeln!(f, "\t- Faults")?;
            for fault in &self.faults {
                writeln!(f, "\t{fault}")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "\t- Round-Robin")?;
        writeln!(f, "\tAverage turnaround time = {:.2} ut", self.average_turnaround())?;
        write!(f, "\tAverage wait time = {:.2} ut", self.average_wait())
    }
}
