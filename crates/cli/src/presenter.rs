//! Terminal presentation of a session: answer on stdout, status on stderr

use smart_explain_common::SessionObserver;
use std::io::Write;

pub struct TerminalPresenter {
    selection: String,
}

impl TerminalPresenter {
    pub fn new(selection: impl Into<String>) -> Self {
        Self {
            selection: selection.into(),
        }
    }

    fn status(&self, message: &str) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", message);
    }
}

impl SessionObserver for TerminalPresenter {
    fn on_loading(&self) {
        self.status(&format!("Explaining \"{}\"...", preview(&self.selection)));
    }

    fn on_chunk(&self, delta: &str, _accumulated: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(delta.as_bytes());
        let _ = out.flush();
    }

    fn on_finished(&self, _text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out);
        let _ = out.flush();
    }

    fn on_error(&self, message: &str) {
        self.status(&format!("\nError: {}", message));
    }

    fn on_cancelled(&self) {
        self.status("\nExplanation dismissed.");
    }
}

/// First line of the selection, shortened for the status line
fn preview(selection: &str) -> String {
    const MAX_CHARS: usize = 60;

    let line = selection.trim().lines().next().unwrap_or_default();
    if line.chars().count() > MAX_CHARS {
        let cut: String = line.chars().take(MAX_CHARS).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}
