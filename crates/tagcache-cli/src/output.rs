//! Colored terminal output utilities.

use std::io::Write;

use console::{Style, Term};

/// Terminal output formatter.
///
/// Messages go to stderr; cached payloads and paths go to stdout so they can
/// be piped.
pub(crate) struct Output {
    term: Term,
    stdout: Term,
    green: Style,
    red: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            stdout: Term::stdout(),
            green: Style::new().green(),
            red: Style::new().red(),
        }
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Write raw bytes to stdout.
    pub(crate) fn payload(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut stdout = &self.stdout;
        stdout.write_all(bytes)?;
        stdout.flush()
    }

    /// Write one line to stdout.
    pub(crate) fn line(&self, line: &str) -> std::io::Result<()> {
        self.stdout.write_line(line)
    }
}
