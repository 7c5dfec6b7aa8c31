//! Completion source abstraction
//!
//! A completion source turns a prompt into a lazy, finite stream of text
//! fragments. Providers:
//! - Gemini (`streamGenerateContent` over server-sent events)
//! - Scripted mock for tests and offline runs

mod gemini;
mod mock;
mod prompt;
mod sse;

pub use gemini::GeminiClient;
pub use mock::ScriptedSource;
pub use prompt::{build_prompt, Prompt, HEADING_SEPARATOR, NO_HEADING, SYSTEM_INSTRUCTION};
pub use sse::SseDecoder;

use crate::config::CompletionConfig;
use crate::errors::{CompletionError, ExplainError, Result};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Stream of text fragments; an `Err` item ends the answer
pub type ChunkStream = Pin<Box<dyn Stream<Item = std::result::Result<String, CompletionError>> + Send>>;

/// Trait for streaming text generation
#[async_trait]
pub trait CompletionSource: Send + Sync {
    /// Provider or model name, for logs
    fn name(&self) -> &str;

    /// Open a stream for `prompt`.
    ///
    /// Dropping the returned stream must release the underlying request.
    async fn stream(&self, prompt: &Prompt) -> std::result::Result<ChunkStream, CompletionError>;
}

/// Supplies the API key a completion source is built with
pub trait CredentialProvider: Send + Sync {
    /// The configured key, None when absent or blank
    fn api_key(&self) -> Option<String>;
}

impl CredentialProvider for CompletionConfig {
    fn api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }
}

/// Builds a completion source for an API key
pub type SourceFactory = Arc<dyn Fn(&str) -> Result<Arc<dyn CompletionSource>> + Send + Sync>;

/// Create a completion source based on configuration
pub fn create_source(config: &CompletionConfig, api_key: &str) -> Result<Arc<dyn CompletionSource>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiClient::new(api_key, config)?)),
        "mock" => Ok(Arc::new(ScriptedSource::canned())),
        other => Err(ExplainError::Configuration {
            message: format!("Unknown completion provider: {}", other),
        }),
    }
}

/// Factory that builds sources from `config`
pub fn config_factory(config: CompletionConfig) -> SourceFactory {
    Arc::new(move |api_key: &str| create_source(&config, api_key))
}
