//! Explain Session - streaming state machine for one explanation
//!
//! Provides:
//! - Guarded transitions (terminal states are final)
//! - Ordered chunk accumulation
//! - Cooperative cancellation between chunks
//! - Whole-session timeout

use crate::completion::{build_prompt, ChunkStream, CompletionSource};
use crate::context::ExplainContext;
use crate::errors::{classify, ExplainError};
use crate::metrics;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::observer::SessionObserver;
use super::state::{SessionReport, SessionState};

/// Handle the presentation side keeps to follow or dismiss a session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Latest published state
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Ask the session to stop; it reacts before consuming the next chunk
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until the state satisfies `predicate`
    pub async fn wait_until(&mut self, predicate: impl FnMut(&SessionState) -> bool) -> SessionState {
        let waited = self.state.wait_for(predicate).await.map(|state| *state);
        waited.unwrap_or_else(|_| *self.state.borrow())
    }

    /// Terminal, or the session behind the handle is gone
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal() || self.state.has_changed().is_err()
    }
}

enum Step<T> {
    Cancelled,
    TimedOut,
    Ready(T),
}

/// One user-triggered explanation
pub struct ExplainSession {
    id: Uuid,
    state: SessionState,
    text: String,
    chunks: usize,
    error: Option<ExplainError>,
    observer: Arc<dyn SessionObserver>,
    cancel: CancellationToken,
    state_tx: watch::Sender<SessionState>,
    started_at: Option<Instant>,
    elapsed: Duration,
}

impl ExplainSession {
    /// Create an idle session reporting to `observer`
    pub fn new(observer: Arc<dyn SessionObserver>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            text: String::new(),
            chunks: 0,
            error: None,
            observer,
            cancel: CancellationToken::new(),
            state_tx,
            started_at: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Concatenation of every chunk received, in arrival order
    pub fn accumulated_text(&self) -> &str {
        &self.text
    }

    /// Classified failure, only in `Errored`
    pub fn error(&self) -> Option<&ExplainError> {
        self.error.as_ref()
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            cancel: self.cancel.clone(),
            state: self.state_tx.subscribe(),
        }
    }

    /// Idle -> Loading
    pub fn begin(&mut self) -> bool {
        if self.state != SessionState::Idle {
            return false;
        }
        self.started_at = Some(Instant::now());
        self.transition(SessionState::Loading);
        self.observer.on_loading();
        true
    }

    /// Loading/Streaming -> Streaming, appending `chunk`. Empty chunks are skipped.
    pub fn append_chunk(&mut self, chunk: &str) -> bool {
        if !self.state.is_active() || chunk.is_empty() {
            return false;
        }
        self.text.push_str(chunk);
        self.chunks += 1;
        if self.state == SessionState::Loading {
            self.transition(SessionState::Streaming);
        }
        tracing::trace!(session_id = %self.id, chunk_chars = chunk.chars().count(), "Chunk appended");
        self.observer.on_chunk(chunk, &self.text);
        true
    }

    /// Loading/Streaming -> Done
    pub fn finish(&mut self) -> bool {
        if !self.state.is_active() {
            return false;
        }
        self.transition(SessionState::Done);
        self.observer.on_finished(&self.text);
        true
    }

    /// Loading/Streaming -> Errored
    pub fn fail(&mut self, error: ExplainError) -> bool {
        if !self.state.is_active() {
            return false;
        }
        let message = error.user_message();
        tracing::warn!(session_id = %self.id, code = ?error.code(), error = %message, "Explain session failed");
        self.error = Some(error);
        self.transition(SessionState::Errored);
        self.observer.on_error(&message);
        true
    }

    /// Idle/Loading/Streaming -> Cancelled. Accumulated text is kept in memory only.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.cancel.cancel();
        self.transition(SessionState::Cancelled);
        self.observer.on_cancelled();
        true
    }

    /// Run the session against `source` until it reaches a terminal state
    pub async fn start(
        &mut self,
        context: &ExplainContext,
        source: &dyn CompletionSource,
        timeout: Option<Duration>,
    ) -> SessionState {
        if self.cancel.is_cancelled() {
            self.cancel();
            return self.state;
        }
        if !self.begin() {
            return self.state;
        }

        tracing::info!(
            session_id = %self.id,
            source = source.name(),
            note = %context.note_title,
            selection_chars = context.selected_text.chars().count(),
            "Explain session started"
        );

        let prompt = build_prompt(context);
        let token = self.cancel.clone();
        // deadlines too far out to represent mean no deadline
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => Step::Cancelled,
            _ = expiry(deadline) => Step::TimedOut,
            opened = source.stream(&prompt) => Step::Ready(opened),
        };

        let stream = match opened {
            Step::Ready(Ok(stream)) => stream,
            Step::Ready(Err(err)) => {
                self.fail(classify(&err));
                return self.state;
            }
            Step::Cancelled => {
                self.cancel();
                return self.state;
            }
            Step::TimedOut => {
                self.fail(timeout_error(timeout));
                return self.state;
            }
        };

        self.consume(stream, &token, deadline, timeout).await;
        self.state
    }

    async fn consume(
        &mut self,
        mut stream: ChunkStream,
        token: &CancellationToken,
        deadline: Option<Instant>,
        timeout: Option<Duration>,
    ) {
        loop {
            let step = tokio::select! {
                biased;
                _ = token.cancelled() => Step::Cancelled,
                _ = expiry(deadline) => Step::TimedOut,
                item = stream.next() => Step::Ready(item),
            };

            match step {
                Step::Ready(Some(Ok(chunk))) => {
                    self.append_chunk(&chunk);
                }
                Step::Ready(Some(Err(err))) => {
                    self.fail(classify(&err));
                    break;
                }
                Step::Ready(None) => {
                    self.finish();
                    break;
                }
                Step::Cancelled => {
                    self.cancel();
                    break;
                }
                Step::TimedOut => {
                    self.fail(timeout_error(timeout));
                    break;
                }
            }
        }
        // the stream (and any HTTP response behind it) is released here
        drop(stream);
    }

    /// Snapshot of the session for the caller
    pub fn report(&self) -> SessionReport {
        SessionReport {
            id: self.id,
            state: self.state,
            text: self.text.clone(),
            error: self.error.as_ref().map(ExplainError::user_message),
            chunks: self.chunks,
            elapsed: self.elapsed,
        }
    }

    fn transition(&mut self, next: SessionState) {
        let previous = self.state;
        self.state = next;
        self.state_tx.send_replace(next);

        if next.is_terminal() {
            self.elapsed = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
            metrics::record_session(next.as_str(), self.elapsed, self.chunks);
            tracing::info!(
                session_id = %self.id,
                state = %next,
                chunks = self.chunks,
                chars = self.text.chars().count(),
                elapsed_ms = self.elapsed.as_millis() as u64,
                "Explain session ended"
            );
        } else {
            tracing::debug!(session_id = %self.id, from = %previous, to = %next, "Session transition");
        }
    }
}

impl Drop for ExplainSession {
    // a session dropped mid-flight counts as dismissed
    fn drop(&mut self) {
        if self.state.is_active() {
            self.cancel();
        }
    }
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn timeout_error(timeout: Option<Duration>) -> ExplainError {
    let secs = timeout.map(|t| t.as_secs()).unwrap_or_default();
    ExplainError::Upstream {
        message: format!("no complete response within {} seconds", secs),
    }
}
