//! Standard-stream seams for `print` and `input`.
//!
//! Both directions go through a trait so embedders and tests can capture
//! output and script input without touching the process streams.

use std::{
    collections::VecDeque,
    io::{self, BufRead as _, Write as _},
};

use crate::error::{ErrorKind, RunResult};

/// Trait for handling output from the `print` statement.
///
/// Implement this to capture or redirect print output. The default
/// implementation [`StdPrint`] writes to stdout.
pub trait PrintWriter {
    /// Called once for each operand of a `print` statement, with that
    /// operand's formatted text. `print` emits no separators and no trailing
    /// newline; any line structure comes from the script itself.
    fn stdout_write(&mut self, output: &str) -> RunResult<()>;
}

/// Default `PrintWriter` that writes to stdout and flushes after each write.
#[derive(Debug, Default)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn stdout_write(&mut self, output: &str) -> RunResult<()> {
        let mut stdout = io::stdout();
        stdout
            .write_all(output.as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|err| ErrorKind::SystemError.msg(format!("cannot write to stdout: {err}")))
    }
}

/// A `PrintWriter` that collects all output into a string.
///
/// Useful for testing or capturing print output programmatically.
#[derive(Debug, Default)]
pub struct CollectStringPrint(String);

impl CollectStringPrint {
    /// Creates a new empty `CollectStringPrint`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected output so far.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.0
    }

    /// Consumes the writer and returns the collected output.
    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl PrintWriter for CollectStringPrint {
    fn stdout_write(&mut self, output: &str) -> RunResult<()> {
        self.0.push_str(output);
        Ok(())
    }
}

/// `PrintWriter` that ignores all output.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn stdout_write(&mut self, _output: &str) -> RunResult<()> {
        Ok(())
    }
}

/// Trait supplying lines to the `input` statement.
///
/// One call per `input` item; the returned line has no trailing newline.
/// End of input reads as an empty line, which the statement's kind
/// conversion then accepts or rejects.
pub trait LineSource {
    fn read_line(&mut self) -> RunResult<String>;
}

/// Reads lines from the process stdin.
#[derive(Debug, Default)]
pub struct StdinSource;

impl LineSource for StdinSource {
    fn read_line(&mut self) -> RunResult<String> {
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|err| ErrorKind::SystemError.msg(format!("cannot read from stdin: {err}")))?;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

/// A `LineSource` fed from a fixed queue of lines; reads past the end yield
/// empty lines. Useful for testing `input` statements.
#[derive(Debug, Default)]
pub struct QueuedLines(VecDeque<String>);

impl QueuedLines {
    /// Creates a source that yields the given lines in order.
    #[must_use]
    pub fn from_lines(lines: &[&str]) -> Self {
        Self(lines.iter().map(|line| (*line).to_owned()).collect())
    }
}

impl LineSource for QueuedLines {
    fn read_line(&mut self) -> RunResult<String> {
        Ok(self.0.pop_front().unwrap_or_default())
    }
}
