//! # Loader
//!
//! Reads program files from disk and interprets command lines typed at the
//! prompt. A missing program is reported and dropped; it never aborts the
//! rest of the command.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{EXIT_COMMAND, MAX_PROGRAMS_PER_COMMAND, PROGRAM_EXTENSION};
use crate::error::LoadError;
use crate::program::{parse_source, Program};

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Nothing but whitespace was typed.
    Empty,
    /// End the session.
    Exit,
    /// Run the named programs (base names, without extension).
    Run(Vec<String>),
}

/// Splits a command line into at most `MAX_PROGRAMS_PER_COMMAND` program
/// names. Names past the limit are ignored.
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if line == EXIT_COMMAND {
        return Command::Exit;
    }

    let names = line
        .split_whitespace()
        .take(MAX_PROGRAMS_PER_COMMAND)
        .map(str::to_owned)
        .collect();

    Command::Run(names)
}

/// Path of the file backing program `name` inside `dir`.
pub fn program_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}{PROGRAM_EXTENSION}"))
}

/// Loads and parses `<dir>/<name>.lpas`.
pub fn load_program(dir: &Path, name: &str) -> Result<Program, LoadError> {
    let path = program_path(dir, name);

    let source = fs::read_to_string(&path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound { path: path.clone() },
        _ => LoadError::Io {
            path: path.clone(),
            source,
        },
    })?;

    let program = parse_source(name, &source);
    if program.is_empty() {
        debug!(program = name, "program has no instructions");
    } else {
        debug!(program = name, instructions = program.len(), "loaded program");
    }

    Ok(program)
}

/// Loads every named program, keeping submission order. Programs that fail
/// to load are returned separately so the caller can report them.
pub fn load_batch<S: AsRef<str>>(dir: &Path, names: &[S]) -> (Vec<Program>, Vec<LoadError>) {
    let mut programs = Vec::with_capacity(names.len());
    let mut failures = Vec::new();

    for name in names {
        match load_program(dir, name.as_ref()) {
            Ok(program) => programs.push(program),
            Err(err) => {
                debug!(%err, "dropping program");
                failures.push(err);
            }
        }
    }

    (programs, failures)
}
