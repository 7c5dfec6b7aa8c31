//! Gemini streaming client
//!
//! Calls `models/{model}:streamGenerateContent` with `alt=sse` and turns
//! each server-sent event into one text chunk.

use super::sse::SseDecoder;
use super::{ChunkStream, CompletionSource, Prompt};
use crate::config::CompletionConfig;
use crate::errors::{CompletionError, CompletionErrorKind, ExplainError, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

impl ApiError {
    fn into_completion_error(self) -> CompletionError {
        CompletionError {
            kind: error_kind(self.code, self.status.as_deref()),
            message: self.message.or(self.status),
        }
    }
}

/// Structured kind from the HTTP status code or the Google RPC status name
fn error_kind(code: Option<u16>, status: Option<&str>) -> Option<CompletionErrorKind> {
    match (code, status) {
        (Some(401 | 403), _) | (_, Some("UNAUTHENTICATED" | "PERMISSION_DENIED")) => {
            Some(CompletionErrorKind::Credential)
        }
        (Some(429), _) | (_, Some("RESOURCE_EXHAUSTED")) => Some(CompletionErrorKind::RateLimit),
        _ => None,
    }
}

/// Gemini client for explanation requests
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    generation_config: Option<GenerationConfig>,
}

impl GeminiClient {
    /// Create a new client
    pub fn new(api_key: impl Into<String>, config: &CompletionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ExplainError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let generation_config = match (config.temperature, config.max_output_tokens) {
            (None, None) => None,
            (temperature, max_output_tokens) => Some(GenerationConfig {
                temperature,
                max_output_tokens,
            }),
        };

        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            generation_config,
        })
    }

    /// Streaming endpoint for the configured model
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.api_base, self.model
        )
    }

    fn request_body(&self, prompt: &Prompt) -> GenerateRequest {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(prompt.system.clone()),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.user.clone()),
                }],
            }],
            generation_config: self.generation_config.as_ref().map(|g| GenerationConfig {
                temperature: g.temperature,
                max_output_tokens: g.max_output_tokens,
            }),
        }
    }
}

#[async_trait]
impl CompletionSource for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn stream(&self, prompt: &Prompt) -> std::result::Result<ChunkStream, CompletionError> {
        tracing::debug!(model = %self.model, prompt_chars = prompt.user.len(), "Opening Gemini stream");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_error(status.as_u16(), &body));
        }

        let body = response.bytes_stream().map(|r| r.map(|b| b.to_vec())).boxed();
        Ok(event_stream(body))
    }
}

/// Error for a non-success response, preferring the JSON error envelope
fn http_error(status: u16, body: &str) -> CompletionError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let mut err = envelope.error.into_completion_error();
            if err.kind.is_none() {
                err.kind = error_kind(Some(status), None);
            }
            err
        }
        Err(_) => {
            let body = body.trim();
            CompletionError {
                kind: error_kind(Some(status), None),
                message: Some(if body.is_empty() {
                    format!("HTTP {}", status)
                } else {
                    format!("HTTP {}: {}", status, body)
                }),
            }
        }
    }
}

/// Text carried by one SSE payload, None when it has none
fn parse_stream_event(data: &str) -> std::result::Result<Option<String>, CompletionError> {
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let event: StreamResponse = serde_json::from_str(data).map_err(|e| {
        CompletionError::with_kind(
            CompletionErrorKind::Upstream,
            format!("Failed to parse stream event: {}", e),
        )
    })?;

    if let Some(err) = event.error {
        return Err(err.into_completion_error());
    }

    if event.candidates.is_empty() {
        if let Some(reason) = event.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(CompletionError::with_kind(
                CompletionErrorKind::Upstream,
                format!("Request blocked: {}", reason),
            ));
        }
    }

    let text: String = event
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    Ok((!text.is_empty()).then_some(text))
}

struct EventState {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    body_done: bool,
}

impl EventState {
    fn queue(&mut self, data: &str) -> std::result::Result<(), CompletionError> {
        if let Some(text) = parse_stream_event(data)? {
            self.pending.push_back(text);
        }
        Ok(())
    }
}

/// Turn a raw SSE body into text chunks. Dropping the stream drops the response.
fn event_stream(body: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> ChunkStream {
    let state = EventState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        body_done: false,
    };

    Box::pin(stream::try_unfold(state, next_chunk))
}

async fn next_chunk(
    mut state: EventState,
) -> std::result::Result<Option<(String, EventState)>, CompletionError> {
    loop {
        if let Some(text) = state.pending.pop_front() {
            return Ok(Some((text, state)));
        }
        if state.body_done {
            return Ok(None);
        }

        match state.body.next().await {
            Some(Ok(bytes)) => {
                for data in state.decoder.push(&bytes) {
                    state.queue(&data)?;
                }
            }
            Some(Err(e)) => return Err(CompletionError::from(e)),
            None => {
                state.body_done = true;
                if let Some(data) = state.decoder.finish() {
                    state.queue(&data)?;
                }
            }
        }
    }
}
