//! # tes
//!
//! Interactive front end for the task execution simulator.
//!
//! ```text
//! tes > calc loop
//! calc -> READ: 7
//! calc -> WRITE: 14
//! ...
//! tes > exit
//! ```
//!
//! Each line names up to four programs (`<name>.lpas` in `--dir`). They are
//! run in batches of two and a report is printed per batch. Program names
//! given on the command line are run once, without a prompt.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use argh::FromArgs;
use tracing::{error, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use tes::config::{
    DispatchMode, MachineConfig, ZeroLiteral, DEFAULT_QUANTUM, MAX_PROGRAMS_PER_COMMAND, PROMPT,
};
use tes::console::StdConsole;
use tes::dispatch::Dispatcher;
use tes::error::{DispatchError, LoadError};
use tes::loader::{load_batch, parse_command, Command};

const WELCOME: &str = "\n\tTask Execution and Scheduling\n\tType up to four program names, or `exit`.\n";

/// Runs `.lpas` programs on a simulated machine under Round-Robin
/// scheduling.
#[derive(FromArgs)]
struct Arguments {
    /// directory holding the `.lpas` programs,
    /// defaults to the current directory
    #[argh(option, default = "PathBuf::from(\".\")")]
    dir: PathBuf,

    /// time units a task runs before it may be preempted
    #[argh(option, default = "DEFAULT_QUANTUM")]
    quantum: u32,

    /// whether a literal `0` argument is treated as the number zero
    /// instead of a variable name
    #[argh(switch)]
    zero_literal: bool,

    /// whether all batches of a command run at the same time
    #[argh(switch)]
    parallel: bool,

    /// whether debug logging should be written to stderr
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// programs to run once instead of starting the prompt
    #[argh(positional)]
    programs: Vec<String>,
}

impl Arguments {
    fn machine_config(&self) -> MachineConfig {
        let zero_literal = if self.zero_literal {
            ZeroLiteral::Literal
        } else {
            ZeroLiteral::Lookup
        };
        let dispatch = if self.parallel {
            DispatchMode::Parallel
        } else {
            DispatchMode::Sequential
        };

        MachineConfig {
            zero_literal,
            dispatch,
            ..MachineConfig::default()
        }
        .with_quantum(self.quantum)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "tes=debug" } else { "tes=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Loads and runs one command's worth of programs.
fn run_command(
    dispatcher: &mut Dispatcher,
    console: &StdConsole,
    dir: &Path,
    names: &[String],
) -> Result<(), DispatchError> {
    let (programs, failures) = load_batch(dir, names);

    for failure in &failures {
        match failure {
            LoadError::NotFound { path } => {
                console.print(&format!("Program {} does not exist!", path.display()))
            }
            other => console.print(&other.to_string()),
        }
    }

    dispatcher.dispatch(programs, console)?;
    Ok(())
}

fn prompt_loop(
    dispatcher: &mut Dispatcher,
    console: &StdConsole,
    dir: &Path,
) -> Result<(), DispatchError> {
    loop {
        let line = match console.read_command(PROMPT) {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(err) => {
                warn!(%err, "failed to read command line");
                return Ok(());
            }
        };

        match parse_command(&line) {
            Command::Empty => continue,
            Command::Exit => return Ok(()),
            Command::Run(names) => run_command(dispatcher, console, dir, &names)?,
        }
    }
}

fn main() -> ExitCode {
    let arguments = argh::from_env::<Arguments>();
    init_logging(arguments.verbose);

    let mut dispatcher = Dispatcher::new(arguments.machine_config());
    let console = StdConsole::stdio();

    let result = if arguments.programs.is_empty() {
        console.print(WELCOME);
        prompt_loop(&mut dispatcher, &console, &arguments.dir)
    } else {
        let names = &arguments.programs;
        if names.len() > MAX_PROGRAMS_PER_COMMAND {
            warn!(given = names.len(), "only the first {MAX_PROGRAMS_PER_COMMAND} programs are run");
        }
        let names = &names[..names.len().min(MAX_PROGRAMS_PER_COMMAND)];
        run_command(&mut dispatcher, &console, &arguments.dir, names)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "dispatch failed");
            ExitCode::FAILURE
        }
    }
}
