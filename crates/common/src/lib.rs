//! Smart Explain Common Library
//!
//! Core of Smart Explain, shared by every host:
//! - Context extraction (selection, surrounding window, heading path)
//! - Streaming completion sources (Gemini, scripted mock)
//! - Explain sessions and the trigger-point `Explainer`
//! - Error types and handling
//! - Configuration management
//! - Popup placement
//! - Metrics and observability

pub mod completion;
pub mod config;
pub mod context;
pub mod errors;
pub mod metrics;
pub mod presentation;
pub mod session;

// Re-export commonly used types
pub use completion::{CompletionSource, CredentialProvider};
pub use config::AppConfig;
pub use context::{DocumentSnapshot, ExplainContext};
pub use errors::{ExplainError, Result};
pub use session::{Explainer, SessionObserver, SessionReport, SessionState};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Characters of context kept on each side of the selection
pub const DEFAULT_CONTEXT_RADIUS: usize = 100;

/// Note title used when the host has none
pub const DEFAULT_NOTE_TITLE: &str = "Untitled";
