//! Explain sessions
//!
//! - `ExplainSession`: state machine for one streamed explanation
//! - `Explainer`: trigger guards, trigger policy, dismissal
//! - `SessionObserver`: signals for the presentation side

mod explainer;
mod lifecycle;
mod observer;
mod state;

pub use explainer::Explainer;
pub use lifecycle::{ExplainSession, SessionHandle};
pub use observer::{NullObserver, SessionObserver};
pub use state::{SessionReport, SessionState};
