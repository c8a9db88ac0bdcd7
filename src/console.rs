//! # Operator Console
//!
//! The only device the simulated machine knows: READ blocks on it for one
//! integer, WRITE prints to it, and task faults are echoed to it as they
//! happen. Batches may run on parallel workers that share one console, so
//! every implementation serialises access internally and takes `&self`.
//!
//! ## Output Format
//!
//! ```text
//! calc -> READ: 7
//! calc -> WRITE: 14
//!
//! ERROR - 2
//!     Task       : calc
//!     Instruction: DIV Y
//!     Line       : 4
//! ```

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::{Mutex, MutexGuard};

use crate::error::ExecutionError;
use crate::interpreter::leading_integer;
use crate::metrics::BatchReport;

/// Operator I/O shared by every worker of a session.
pub trait Console: Sync {
    /// Prompts on behalf of `program` and reads one integer. Returns `None`
    /// when the answer is not an integer or input is exhausted.
    fn read(&self, program: &str) -> Option<i32>;

    /// Prints `value` on behalf of `program`.
    fn write(&self, program: &str, value: i32);

    /// Reports a fault that terminated a task.
    fn fault(&self, error: &ExecutionError);

    /// Emits the report of a finished batch.
    fn report(&self, report: &BatchReport);
}

/// Locks `mutex`, recovering the guard if another worker panicked while
/// holding it. Console state stays usable after a worker failure.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reads an integer the way `%d` does: optional leading whitespace and
/// sign, then at least one digit. Trailing characters are ignored, so
/// `7abc` reads as 7 while `abc` reads as nothing.
pub fn scan_integer(token: &str) -> Option<i32> {
    let token = token.trim_start();
    let unsigned = token.strip_prefix(['+', '-']).unwrap_or(token);

    unsigned
        .starts_with(|c: char| c.is_ascii_digit())
        .then(|| leading_integer(token))
}

// ---------------------------------------------------------------------------
// Standard console
// ---------------------------------------------------------------------------

struct Terminal<R, W> {
    input: R,
    output: W,
    /// Tokens typed on the current READ line and not consumed yet.
    pending: VecDeque<String>,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    fn next_token(&mut self) -> Option<String> {
        while self.pending.is_empty() {
            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => return None,
                Ok(_) => self
                    .pending
                    .extend(line.split_whitespace().map(str::to_owned)),
            }
        }

        self.pending.pop_front()
    }
}

/// Line-oriented console over a reader and a writer, normally the
/// process's stdin and stdout.
///
/// READ answers are consumed one whitespace-delimited token at a time, so
/// several answers may be typed on one line. Tokens left over when the next
/// command line is read are discarded.
pub struct StdConsole<R = BufReader<Stdin>, W = Stdout> {
    terminal: Mutex<Terminal<R, W>>,
}

impl StdConsole {
    /// Console on the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> StdConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            terminal: Mutex::new(Terminal {
                input,
                output,
                pending: VecDeque::new(),
            }),
        }
    }

    /// Prints `text` as-is, for banners and loader messages.
    pub fn print(&self, text: &str) {
        let mut terminal = lock(&self.terminal);
        let _ = writeln!(terminal.output, "{text}");
    }

    /// Shows `prompt` and reads one command line. Returns `Ok(None)` at end
    /// of input. Unconsumed READ answers are dropped first so they cannot
    /// leak into a later program.
    pub fn read_command(&self, prompt: &str) -> io::Result<Option<String>> {
        let mut terminal = lock(&self.terminal);
        terminal.pending.clear();

        write!(terminal.output, "{prompt}")?;
        terminal.output.flush()?;

        let mut line = String::new();
        match terminal.input.read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line)),
        }
    }
}

impl<R, W> Console for StdConsole<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn read(&self, program: &str) -> Option<i32> {
        // Held across prompt and answer so parallel workers cannot
        // interleave their prompts.
        let mut terminal = lock(&self.terminal);

        let _ = write!(terminal.output, "{program} -> READ: ");
        let _ = terminal.output.flush();

        scan_integer(&terminal.next_token()?)
    }

    fn write(&self, program: &str, value: i32) {
        let mut terminal = lock(&self.terminal);
        let _ = writeln!(terminal.output, "{program} -> WRITE: {value}");
    }

    fn fault(&self, error: &ExecutionError) {
        let mut terminal = lock(&self.terminal);
        let _ = write!(
            terminal.output,
            "\nERROR - {}\n\tTask       : {}\n\tInstruction: {}\n\tLine       : {}\n",
            error.kind.code(),
            error.program,
            error.instruction,
            error.line(),
        );
    }

    fn report(&self, report: &BatchReport) {
        let mut terminal = lock(&self.terminal);
        let _ = write!(terminal.output, "\n{report}\n\n");
        let _ = terminal.output.flush();
    }
}

// ---------------------------------------------------------------------------
// Scripted console
// ---------------------------------------------------------------------------

/// What a [`ScriptedConsole`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Read { program: String, value: Option<i32> },
    Write { program: String, value: i32 },
    Fault(ExecutionError),
    /// Batch number of an emitted report.
    Report(u32),
}

/// Console fed from a fixed list of answers. Records every interaction in
/// order. Answers are raw text so malformed input can be scripted too.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    inputs: Mutex<VecDeque<String>>,
    events: Mutex<Vec<ConsoleEvent>>,
}

impl ScriptedConsole {
    /// Console answering READs with `inputs`, in order.
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: Mutex::new(inputs.into_iter().map(Into::into).collect()),
            events: Mutex::default(),
        }
    }

    /// Every interaction so far, in order.
    pub fn events(&self) -> Vec<ConsoleEvent> {
        lock(&self.events).clone()
    }

    /// Batch numbers of emitted reports, in order.
    pub fn reports(&self) -> Vec<u32> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ConsoleEvent::Report(batch) => Some(*batch),
                _ => None,
            })
            .collect()
    }

    /// Values printed by WRITE, in order.
    pub fn written(&self) -> Vec<i32> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ConsoleEvent::Write { value, .. } => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Faults echoed so far, in order.
    pub fn faults(&self) -> Vec<ExecutionError> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                ConsoleEvent::Fault(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Console for ScriptedConsole {
    fn read(&self, program: &str) -> Option<i32> {
        let value = lock(&self.inputs)
            .pop_front()
            .and_then(|s| scan_integer(&s));

        lock(&self.events).push(ConsoleEvent::Read {
            program: program.to_owned(),
            value,
        });
        value
    }

    fn write(&self, program: &str, value: i32) {
        lock(&self.events).push(ConsoleEvent::Write {
            program: program.to_owned(),
            value,
        });
    }

    fn fault(&self, error: &ExecutionError) {
        lock(&self.events).push(ConsoleEvent::Fault(error.clone()));
    }

    fn report(&self, report: &BatchReport) {
        lock(&self.events).push(ConsoleEvent::Report(report.batch));
    }
}
