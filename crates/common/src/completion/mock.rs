//! Scripted completion source for tests and offline runs

use super::{ChunkStream, CompletionSource, Prompt};
use crate::errors::CompletionError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How a scripted stream ends after its chunks
#[derive(Debug, Clone)]
enum Ending {
    Complete,
    Fail(CompletionError),
    Hang,
}

/// Completion source replaying a fixed script
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    chunks: Vec<String>,
    delay: Option<Duration>,
    open_error: Option<CompletionError>,
    ending: Ending,
    opened: Arc<AtomicUsize>,
}

impl ScriptedSource {
    /// Yield `chunks` in order, then end
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            delay: None,
            open_error: None,
            ending: Ending::Complete,
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail before producing a stream
    pub fn failing_on_open(error: CompletionError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::new(Vec::<String>::new())
        }
    }

    /// Wait `delay` before each chunk
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail after the scripted chunks
    pub fn then_fail(mut self, error: CompletionError) -> Self {
        self.ending = Ending::Fail(error);
        self
    }

    /// Never end after the scripted chunks
    pub fn then_hang(mut self) -> Self {
        self.ending = Ending::Hang;
        self
    }

    /// How many streams have been opened
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Canned answer used when the `mock` provider is configured
    pub fn canned() -> Self {
        Self::new([
            "**Mock explanation.** ",
            "The completion provider is set to `mock`, ",
            "so no request left this machine.\n\n",
            "Configure `completion.provider = \"gemini\"` and an API key for real answers.",
        ])
        .with_delay(Duration::from_millis(40))
    }
}

#[async_trait]
impl CompletionSource for ScriptedSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream(&self, _prompt: &Prompt) -> Result<ChunkStream, CompletionError> {
        self.opened.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }

        let delay = self.delay;
        let chunks = stream::iter(self.chunks.clone()).then(move |chunk| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, CompletionError>(chunk)
        });

        let tail: ChunkStream = match self.ending.clone() {
            Ending::Complete => Box::pin(stream::empty::<Result<String, CompletionError>>()),
            Ending::Fail(err) => Box::pin(stream::once(async move { Err::<String, _>(err) })),
            Ending::Hang => Box::pin(stream::pending::<Result<String, CompletionError>>()),
        };

        Ok(Box::pin(chunks.chain(tail)))
    }
}
