//! Terminal output for command status and results.

use console::{Color, Style, Term};

/// Writes status lines to stderr and command results to stdout.
///
/// Status lines are colored by tone; results stay plain so they can be piped.
pub(crate) struct Output {
    status: Term,
    results: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            status: Term::stderr(),
            results: Term::stdout(),
        }
    }

    pub(crate) fn info(&self, msg: &str) {
        self.status_line(msg, None);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.status_line(msg, Some(Color::Green));
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.status_line(msg, Some(Color::Yellow));
    }

    pub(crate) fn error(&self, msg: &str) {
        self.status_line(msg, Some(Color::Red));
    }

    /// Print a command result to stdout.
    pub(crate) fn result(&self, msg: &str) {
        let _ = self.results.write_line(msg);
    }

    fn status_line(&self, msg: &str, tone: Option<Color>) {
        let line = match tone {
            Some(color) => Style::new().fg(color).apply_to(msg).to_string(),
            None => msg.to_owned(),
        };
        let _ = self.status.write_line(&line);
    }
}
