//! End-to-end runs: programs written to disk, loaded, dispatched and
//! reported through a scripted console.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use tes::config::{DispatchMode, MachineConfig, ZeroLiteral};
use tes::console::{ConsoleEvent, ScriptedConsole};
use tes::dispatch::Dispatcher;
use tes::error::{ErrorKind, LoadError};
use tes::loader::{load_batch, parse_command, Command};
use tes::metrics::BatchReport;

fn write_program(dir: &Path, name: &str, source: &str) {
    fs::write(dir.join(format!("{name}.lpas")), source).unwrap();
}

/// Runs one command line against the programs in `dir`.
fn run(
    dir: &Path,
    line: &str,
    config: MachineConfig,
    console: &ScriptedConsole,
) -> (Vec<BatchReport>, Vec<LoadError>) {
    let Command::Run(names) = parse_command(line) else {
        panic!("not a run command: {line:?}");
    };
    let (programs, failures) = load_batch(dir, &names);
    let reports = Dispatcher::new(config).dispatch(programs, console).unwrap();
    (reports, failures)
}

#[test]
fn test_single_task_owns_the_processor() {
    let dir = TempDir::new().unwrap();
    write_program(dir.path(), "calc", "LOAD 5\nADD 3\nWRITE\nHALT\n");

    let console = ScriptedConsole::default();
    let (reports, _) = run(dir.path(), "calc", MachineConfig::default(), &console);

    assert_eq!(console.written(), vec![8]);
    assert_eq!(reports.len(), 1);

    let task = &reports[0].tasks[0];
    assert_eq!(task.cpu_time, 4);
    assert_eq!(task.io_time, 0);
    assert_eq!(task.occupancy, 100.0);
    assert_eq!(reports[0].preemptions, 0);
}

#[test]
fn test_read_charges_io_time() {
    let dir = TempDir::new().unwrap();
    write_program(dir.path(), "echo", "READ X\nWRITE X\nHALT\n");

    let console = ScriptedConsole::new(["7"]);
    let (reports, _) = run(dir.path(), "echo", MachineConfig::default(), &console);

    assert_eq!(console.written(), vec![7]);
    let task = &reports[0].tasks[0];
    assert_eq!(task.cpu_time, 3);
    assert_eq!(task.io_time, 3);
    assert!(reports[0].faults.is_empty());
}

#[test]
fn test_two_tasks_interleave_by_quantum() {
    let dir = TempDir::new().unwrap();
    write_program(dir.path(), "t1", "LOAD 1\nADD 1\nADD 1\nHALT\n");
    write_program(dir.path(), "t2", "LOAD 2\nADD 2\nADD 2\nHALT\n");

    let console = ScriptedConsole::default();
    let (reports, _) = run(dir.path(), "t1 t2", MachineConfig::default(), &console);

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.clock, 8);
    assert_eq!(report.preemptions, 2);

    let exits: Vec<u32> = report.tasks.iter().map(|t| t.times.exit).collect();
    assert_eq!(exits, vec![6, 8]);
    assert!(report.tasks.iter().all(|t| t.cpu_time == 4));
    assert_eq!(report.average_turnaround(), 7.0);
    assert_eq!(report.average_wait(), 3.0);
}

#[test]
fn test_three_programs_form_two_batches() {
    let dir = TempDir::new().unwrap();
    for name in ["t1", "t2", "t3"] {
        write_program(dir.path(), name, "LOAD 1\nWRITE\nHALT\n");
    }

    let console = ScriptedConsole::default();
    let (reports, failures) = run(dir.path(), "t1 t2 t3", MachineConfig::default(), &console);

    assert!(failures.is_empty());
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].tasks.len(), 2);
    assert_eq!(reports[1].tasks.len(), 1);
    assert_eq!(reports[1].tasks[0].name, "t3");
    assert_eq!(console.reports(), vec![1, 2]);
}

#[test]
fn test_parallel_batches_report_independently() {
    let dir = TempDir::new().unwrap();
    for name in ["a", "b", "c", "d"] {
        write_program(dir.path(), name, "LOAD 2\nMUL 3\nWRITE\nHALT\n");
    }

    let config = MachineConfig {
        dispatch: DispatchMode::Parallel,
        ..MachineConfig::default()
    };
    let console = ScriptedConsole::default();
    let (reports, _) = run(dir.path(), "a b c d", config, &console);

    assert_eq!(reports.iter().map(|r| r.batch).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(console.written(), vec![6; 4]);
    let mut reported = console.reports();
    reported.sort_unstable();
    assert_eq!(reported, vec![1, 2]);
}

#[test]
fn test_missing_program_is_dropped() {
    let dir = TempDir::new().unwrap();
    write_program(dir.path(), "real", "LOAD 1\nHALT\n");

    let console = ScriptedConsole::default();
    let (reports, failures) = run(dir.path(), "ghost real", MachineConfig::default(), &console);

    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], LoadError::NotFound { .. }));
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].tasks.len(), 1);
    assert_eq!(reports[0].tasks[0].name, "real");
}

#[test]
fn test_fault_terminates_only_its_task() {
    let dir = TempDir::new().unwrap();
    write_program(dir.path(), "bad", "LOAD 4\nDIV Y\nWRITE\nHALT\n");
    write_program(dir.path(), "good", "LOAD 4\nADD 1\nWRITE\nHALT\n");

    let console = ScriptedConsole::default();
    let (reports, _) = run(dir.path(), "bad good", MachineConfig::default(), &console);

    assert_eq!(console.written(), vec![5]);

    let faults = console.faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].program, "bad");
    assert_eq!(faults[0].kind, ErrorKind::InvalidArgument);
    assert_eq!(faults[0].instruction, "DIV Y");
    assert_eq!(faults[0].pc, 1);
    assert_eq!(faults[0].line(), 2);
    assert_eq!(reports[0].faults, faults);
}

#[test]
fn test_missing_halt_faults_past_last_instruction() {
    let dir = TempDir::new().unwrap();
    write_program(dir.path(), "open", "LOAD 1\nWRITE\n");

    let console = ScriptedConsole::default();
    run(dir.path(), "open", MachineConfig::default(), &console);

    let faults = console.faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind, ErrorKind::InvalidInstruction);
    assert_eq!(faults[0].pc, 2);
    assert!(faults[0].instruction.is_empty());
}

#[test]
fn test_zero_literal_policy() {
    let dir = TempDir::new().unwrap();
    write_program(dir.path(), "zero", "LOAD 0\nWRITE\nHALT\n");

    let console = ScriptedConsole::default();
    run(dir.path(), "zero", MachineConfig::default(), &console);
    assert_eq!(console.faults()[0].kind, ErrorKind::InvalidArgument);

    let config = MachineConfig {
        zero_literal: ZeroLiteral::Literal,
        ..MachineConfig::default()
    };
    let console = ScriptedConsole::default();
    run(dir.path(), "zero", config, &console);
    assert!(console.faults().is_empty());
    assert_eq!(console.written(), vec![0]);
}

#[test]
fn test_comments_and_blank_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    write_program(
        dir.path(),
        "notes",
        "; header comment\r\n\r\nLOAD 9 ; nine\r\n   \r\nWRITE\r\nHALT",
    );

    let console = ScriptedConsole::default();
    let (reports, _) = run(dir.path(), "notes", MachineConfig::default(), &console);

    assert_eq!(console.written(), vec![9]);
    assert_eq!(reports[0].tasks[0].cpu_time, 3);
}

#[test]
fn test_events_are_recorded_in_order() {
    let dir = TempDir::new().unwrap();
    write_program(dir.path(), "io", "READ A\nWRITE A\nHALT\n");

    let console = ScriptedConsole::new(["12"]);
    run(dir.path(), "io", MachineConfig::default(), &console);

    assert_eq!(
        console.events(),
        vec![
            ConsoleEvent::Read {
                program: "io".into(),
                value: Some(12),
            },
            ConsoleEvent::Write {
                program: "io".into(),
                value: 12,
            },
            ConsoleEvent::Report(1),
        ]
    );
}

#[test]
fn test_read_answer_with_trailing_text() {
    let dir = TempDir::new().unwrap();
    write_program(dir.path(), "rd", "READ X\nWRITE X\nHALT\n");

    let console = ScriptedConsole::new(["7abc", "abc"]);
    let config = MachineConfig::default();
    run(dir.path(), "rd", config, &console);
    assert_eq!(console.written(), vec![7], "Leading digits are read like %d");
    assert!(console.faults().is_empty());

    run(dir.path(), "rd", config, &console);
    let faults = console.faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].kind, ErrorKind::InvalidSymbol);
    assert_eq!(faults[0].line(), 1);
}
