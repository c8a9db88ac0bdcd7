//! # Batch Dispatcher
//!
//! Splits the programs of a command into batches of at most
//! `BATCH_CAPACITY`, and runs each batch to completion on its own worker
//! thread with a private execution machine. Workers share nothing but the
//! console.
//!
//! ## Worker Policy
//!
//! ```text
//! Sequential:  spawn(tes1) ─ join ─ spawn(tes2) ─ join ─ ...
//! Parallel:    spawn(tes1) ─ spawn(tes2) ─ ... ─ join(tes1) ─ join(tes2) ─ ...
//! ```
//!
//! Either way the dispatcher returns only after every worker of the command
//! has finished, and reports come back in batch order. Failing to spawn a
//! worker aborts the whole run.

use std::sync::Arc;
use std::thread::{self, Scope, ScopedJoinHandle};

use tracing::{debug, info};

use crate::config::{DispatchMode, MachineConfig, BATCH_CAPACITY};
use crate::console::Console;
use crate::error::DispatchError;
use crate::interpreter::Interpreter;
use crate::machine::ExecutionMachine;
use crate::metrics::BatchReport;
use crate::program::Program;
use crate::scheduler::RoundRobin;

/// Splits `programs` into consecutive groups of at most `BATCH_CAPACITY`,
/// preserving submission order.
pub fn partition(programs: Vec<Program>) -> Vec<Vec<Arc<Program>>> {
    let programs: Vec<Arc<Program>> = programs.into_iter().map(Arc::new).collect();
    programs
        .chunks(BATCH_CAPACITY)
        .map(<[Arc<Program>]>::to_vec)
        .collect()
}

/// Runs one batch to completion on the calling thread and emits its report
/// through `console`.
pub fn run_batch(
    batch: u32,
    programs: Vec<Arc<Program>>,
    config: &MachineConfig,
    console: &dyn Console,
) -> Result<BatchReport, DispatchError> {
    let size = programs.len();
    let mut machine = ExecutionMachine::with_programs(programs)
        .map_err(|_| DispatchError::BatchTooLarge { batch, size })?;

    let interpreter = Interpreter::new(console, config.zero_literal);
    let mut rr = RoundRobin::from_config(config);

    info!(batch, tasks = size, quantum = rr.quantum(), "batch started");
    rr.run(&mut machine, &interpreter, console);

    let report = BatchReport::collect(batch, &machine, &rr);
    info!(
        batch,
        clock = report.clock,
        faults = report.faults.len(),
        "batch finished"
    );
    console.report(&report);

    Ok(report)
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Hands batches to worker threads. Batch numbers keep increasing across
/// calls, so one dispatcher labels a whole session.
#[derive(Debug)]
pub struct Dispatcher {
    config: MachineConfig,
    next_batch: u32,
}

type Worker<'scope> = ScopedJoinHandle<'scope, Result<BatchReport, DispatchError>>;

impl Dispatcher {
    /// Dispatcher whose first batch will be `tes1`.
    pub fn new(config: MachineConfig) -> Self {
        Self {
            config,
            next_batch: 1,
        }
    }

    /// Runs every program, two per worker, and returns the batch reports in
    /// batch order. An empty program list forms no batch.
    pub fn dispatch(
        &mut self,
        programs: Vec<Program>,
        console: &dyn Console,
    ) -> Result<Vec<BatchReport>, DispatchError> {
        let batches: Vec<(u32, Vec<Arc<Program>>)> = partition(programs)
            .into_iter()
            .map(|group| {
                let batch = self.next_batch;
                self.next_batch += 1;
                (batch, group)
            })
            .collect();

        if batches.is_empty() {
            return Ok(Vec::new());
        }

        let config = self.config;
        debug!(batches = batches.len(), mode = ?config.dispatch, "dispatching");

        thread::scope(|scope| -> Result<Vec<BatchReport>, DispatchError> {
            match config.dispatch {
                DispatchMode::Sequential => batches
                    .into_iter()
                    .map(|(batch, group)| {
                        let worker = spawn_worker(scope, batch, group, config, console)?;
                        join_worker(batch, worker)
                    })
                    .collect(),
                DispatchMode::Parallel => {
                    let workers = batches
                        .into_iter()
                        .map(|(batch, group)| {
                            spawn_worker(scope, batch, group, config, console).map(|w| (batch, w))
                        })
                        .collect::<Result<Vec<_>, _>>()?;

                    workers
                        .into_iter()
                        .map(|(batch, worker)| join_worker(batch, worker))
                        .collect()
                }
            }
        })
    }
}

fn spawn_worker<'scope, 'env>(
    scope: &'scope Scope<'scope, 'env>,
    batch: u32,
    programs: Vec<Arc<Program>>,
    config: MachineConfig,
    console: &'env dyn Console,
) -> Result<Worker<'scope>, DispatchError> {
    thread::Builder::new()
        .name(format!("tes{batch}"))
        .spawn_scoped(scope, move || run_batch(batch, programs, &config, console))
        .map_err(|source| DispatchError::Spawn { batch, source })
}

fn join_worker(batch: u32, worker: Worker<'_>) -> Result<BatchReport, DispatchError> {
    worker
        .join()
        .map_err(|_| DispatchError::WorkerPanicked { batch })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use crate::program::parse_source;

    fn programs(n: usize) -> Vec<Program> {
        (1..=n)
            .map(|i| parse_source(&format!("T{i}"), "LOAD 1\nHALT\n"))
            .collect()
    }

    #[test]
    fn test_partition_sizes() {
        let sizes: Vec<usize> = partition(programs(3)).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 1]);

        let sizes: Vec<usize> = partition(programs(4)).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2]);

        assert!(partition(Vec::new()).is_empty());
    }

    #[test]
    fn test_partition_keeps_order() {
        let groups = partition(programs(3));
        let names: Vec<&str> = groups.iter().flatten().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["T1", "T2", "T3"]);
    }

    #[test]
    fn test_batch_numbers_continue_across_commands() {
        let console = ScriptedConsole::default();
        let mut dispatcher = Dispatcher::new(MachineConfig::default());

        let first = dispatcher.dispatch(programs(3), &console).unwrap();
        let second = dispatcher.dispatch(programs(1), &console).unwrap();

        assert_eq!(first.iter().map(|r| r.batch).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(second[0].batch, 3);
        assert_eq!(console.reports(), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_dispatch_forms_no_batch() {
        let console = ScriptedConsole::default();
        let mut dispatcher = Dispatcher::new(MachineConfig::default());
        assert!(dispatcher.dispatch(Vec::new(), &console).unwrap().is_empty());

        let reports = dispatcher.dispatch(programs(1), &console).unwrap();
        assert_eq!(reports[0].batch, 1, "An empty command consumes no batch number");
    }

    #[test]
    fn test_parallel_mode_reports_in_batch_order() {
        let console = ScriptedConsole::default();
        let config = MachineConfig {
            dispatch: DispatchMode::Parallel,
            ..MachineConfig::default()
        };
        let mut dispatcher = Dispatcher::new(config);

        let reports = dispatcher.dispatch(programs(4), &console).unwrap();
        assert_eq!(reports.iter().map(|r| r.batch).collect::<Vec<_>>(), vec![1, 2]);
        assert!(reports.iter().all(|r| r.clock == 4));
    }

    #[test]
    fn test_run_batch_rejects_oversized_batch() {
        let console = ScriptedConsole::default();
        let group: Vec<Arc<Program>> = programs(3).into_iter().map(Arc::new).collect();

        let err = run_batch(9, group, &MachineConfig::default(), &console).unwrap_err();
        assert!(matches!(err, DispatchError::BatchTooLarge { batch: 9, size: 3 }));
    }
}
