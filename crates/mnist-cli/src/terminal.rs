//! Terminal rendering of the device screen.

use console::{style, Term};
use mnist_session::{TextDisplay, SCREEN_COLUMNS, SCREEN_ROWS};
use tracing::debug;

/// Draws each flushed frame as a boxed grid of [`SCREEN_ROWS`] by
/// [`SCREEN_COLUMNS`] characters.
pub struct TerminalDisplay {
    term: Term,
    rows: Vec<String>,
}

impl TerminalDisplay {
    pub fn new(term: Term) -> Self {
        Self { term, rows: vec![String::new(); SCREEN_ROWS] }
    }

    /// Frames go to stderr so stdout carries only the console stream.
    pub fn stderr() -> Self {
        Self::new(Term::stderr())
    }

    /// Box the current rows, padding each to the full width.
    pub fn frame(&self) -> Vec<String> {
        let edge = "─".repeat(SCREEN_COLUMNS);
        let mut lines = Vec::with_capacity(SCREEN_ROWS + 2);
        lines.push(format!("┌{edge}┐"));
        for row in &self.rows {
            lines.push(format!("│{row:<SCREEN_COLUMNS$}│"));
        }
        lines.push(format!("└{edge}┘"));
        lines
    }
}

impl TextDisplay for TerminalDisplay {
    fn clear(&mut self) {
        self.rows.iter_mut().for_each(String::clear);
    }

    fn draw_text(&mut self, row: usize, text: &str) {
        if let Some(slot) = self.rows.get_mut(row) {
            *slot = text.chars().take(SCREEN_COLUMNS).collect();
        }
    }

    fn flush(&mut self) {
        for line in self.frame() {
            if let Err(e) = self.term.write_line(&style(line).cyan().to_string()) {
                debug!(error = %e, "display write failed");
                return;
            }
        }
    }
}
