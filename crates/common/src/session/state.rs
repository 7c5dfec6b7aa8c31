//! Session states and the report left behind when a session ends

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Lifecycle state of an explain session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, not started
    Idle,
    /// Request sent, no chunk yet
    Loading,
    /// At least one chunk received
    Streaming,
    /// Stream ended normally
    Done,
    /// Source failed or the session timed out
    Errored,
    /// Dismissed by the user
    Cancelled,
}

impl SessionState {
    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Errored | Self::Cancelled)
    }

    /// Request in flight
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Loading | Self::Streaming)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Streaming => "streaming",
            Self::Done => "done",
            Self::Errored => "errored",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a finished session leaves behind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Session ID
    pub id: Uuid,

    /// Final state
    pub state: SessionState,

    /// Text accumulated before the session ended
    pub text: String,

    /// User-facing error message, only when `state` is `Errored`
    pub error: Option<String>,

    /// Chunks received
    pub chunks: usize,

    /// Time from start to terminal state
    pub elapsed: Duration,
}

impl SessionReport {
    pub fn is_done(&self) -> bool {
        self.state == SessionState::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Done.is_terminal());
        assert!(SessionState::Errored.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Loading.is_terminal());
        assert!(SessionState::Streaming.is_active());
        assert!(!SessionState::Idle.is_active());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&SessionState::Streaming).unwrap();
        assert_eq!(json, "\"streaming\"");
        assert_eq!(SessionState::Cancelled.to_string(), "cancelled");
    }
}
