//! Presentation-side signals emitted by a session

/// Receives lifecycle signals from an explain session.
///
/// A session calls `on_loading` once, then any number of `on_chunk`, then
/// exactly one of `on_finished`, `on_error` or `on_cancelled`.
pub trait SessionObserver: Send + Sync {
    /// Request sent, nothing received yet
    fn on_loading(&self);

    /// A chunk arrived; `accumulated` includes it
    fn on_chunk(&self, delta: &str, accumulated: &str);

    /// Stream ended normally
    fn on_finished(&self, text: &str);

    /// Session failed with a user-facing message
    fn on_error(&self, message: &str);

    /// Session dismissed before completion
    fn on_cancelled(&self) {}
}

/// Observer that ignores every signal
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn on_loading(&self) {}
    fn on_chunk(&self, _delta: &str, _accumulated: &str) {}
    fn on_finished(&self, _text: &str) {}
    fn on_error(&self, _message: &str) {}
}

/// A signal as seen by `RecordingObserver`
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Loading,
    Chunk { delta: String, accumulated: String },
    Finished(String),
    Error(String),
    Cancelled,
}

/// Observer that keeps every signal, in order
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: std::sync::Mutex<Vec<SessionEvent>>,
}

#[cfg(test)]
impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals received so far
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn push(&self, event: SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
impl SessionObserver for RecordingObserver {
    fn on_loading(&self) {
        self.push(SessionEvent::Loading);
    }

    fn on_chunk(&self, delta: &str, accumulated: &str) {
        self.push(SessionEvent::Chunk {
            delta: delta.to_string(),
            accumulated: accumulated.to_string(),
        });
    }

    fn on_finished(&self, text: &str) {
        self.push(SessionEvent::Finished(text.to_string()));
    }

    fn on_error(&self, message: &str) {
        self.push(SessionEvent::Error(message.to_string()));
    }

    fn on_cancelled(&self) {
        self.push(SessionEvent::Cancelled);
    }
}
