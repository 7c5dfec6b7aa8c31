//! Error types for Smart Explain
//!
//! Provides:
//! - Distinct error types for trigger-point and session failures
//! - Machine-readable error codes
//! - Short user-facing messages for the presentation layer
//! - Classification of raw completion-source failures

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using ExplainError
pub type Result<T> = std::result::Result<T, ExplainError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Trigger errors (1xxx)
    MissingCredential,
    EmptySelection,
    SessionActive,

    // Completion errors (2xxx)
    InvalidCredential,
    RateLimited,
    UpstreamError,
    UnknownError,

    // Internal errors (9xxx)
    ConfigurationError,
    HttpClientError,
    SerializationError,
    IoError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::MissingCredential => 1001,
            ErrorCode::EmptySelection => 1002,
            ErrorCode::SessionActive => 1003,

            ErrorCode::InvalidCredential => 2001,
            ErrorCode::RateLimited => 2002,
            ErrorCode::UpstreamError => 2003,
            ErrorCode::UnknownError => 2004,

            ErrorCode::ConfigurationError => 9001,
            ErrorCode::HttpClientError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::IoError => 9004,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum ExplainError {
    // Trigger-point errors, reported before any session exists
    #[error("Please set your Gemini API key in Smart Explain settings.")]
    MissingCredential,

    #[error("Please select some text first.")]
    EmptySelection,

    #[error("An explanation is already in progress.")]
    SessionActive,

    // Session errors, delivered to the observer
    #[error("Invalid API key. Please check your Gemini API key in settings.")]
    InvalidCredential { message: Option<String> },

    #[error("Rate limit exceeded. Please wait a moment and try again.")]
    RateLimited { message: Option<String> },

    #[error("Gemini API error: {message}")]
    Upstream { message: String },

    #[error("An unexpected error occurred while calling Gemini.")]
    Unknown,

    // Internal errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExplainError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            ExplainError::MissingCredential => ErrorCode::MissingCredential,
            ExplainError::EmptySelection => ErrorCode::EmptySelection,
            ExplainError::SessionActive => ErrorCode::SessionActive,
            ExplainError::InvalidCredential { .. } => ErrorCode::InvalidCredential,
            ExplainError::RateLimited { .. } => ErrorCode::RateLimited,
            ExplainError::Upstream { .. } => ErrorCode::UpstreamError,
            ExplainError::Unknown => ErrorCode::UnknownError,
            ExplainError::Configuration { .. } => ErrorCode::ConfigurationError,
            ExplainError::HttpClient(_) => ErrorCode::HttpClientError,
            ExplainError::Serialization(_) => ErrorCode::SerializationError,
            ExplainError::Io(_) => ErrorCode::IoError,
        }
    }

    /// Short human-readable message for the presentation layer
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether this error belongs to a running session rather than the trigger point
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            ExplainError::InvalidCredential { .. }
                | ExplainError::RateLimited { .. }
                | ExplainError::Upstream { .. }
                | ExplainError::Unknown
        )
    }

    /// Whether the user can fix this by changing settings and retrying
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            ExplainError::MissingCredential
                | ExplainError::EmptySelection
                | ExplainError::InvalidCredential { .. }
        )
    }
}

impl From<config::ConfigError> for ExplainError {
    fn from(err: config::ConfigError) -> Self {
        ExplainError::Configuration {
            message: err.to_string(),
        }
    }
}

/// Structured failure kind a completion source may know about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionErrorKind {
    /// Authentication or key problem
    Credential,
    /// Quota or rate limit
    RateLimit,
    /// Anything else reported by the upstream
    Upstream,
}

/// Raw failure reported by a completion source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .message.as_deref().unwrap_or("completion source failed"))]
pub struct CompletionError {
    pub kind: Option<CompletionErrorKind>,
    pub message: Option<String>,
}

impl CompletionError {
    /// Failure known only by its text
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            kind: None,
            message: Some(message.into()),
        }
    }

    /// Failure with a structured kind
    pub fn with_kind(kind: CompletionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            message: Some(message.into()),
        }
    }

    /// Failure with nothing to say about itself
    pub fn opaque() -> Self {
        Self {
            kind: None,
            message: None,
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::message(err.to_string())
    }
}

const CREDENTIAL_PATTERNS: &[&str] = &[
    "api key",
    "api_key",
    "unauthenticated",
    "permission denied",
    "permission_denied",
];

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit",
    "rate-limit",
    "ratelimit",
    "quota",
    "resource exhausted",
    "resource_exhausted",
    "too many requests",
];

/// Map a raw completion failure onto the session error taxonomy.
///
/// A structured kind wins. Without one the message text is matched
/// case-insensitively against known credential and rate-limit wording.
pub fn classify(err: &CompletionError) -> ExplainError {
    let message = err
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    if let Some(kind) = err.kind {
        return match kind {
            CompletionErrorKind::Credential => ExplainError::InvalidCredential { message },
            CompletionErrorKind::RateLimit => ExplainError::RateLimited { message },
            CompletionErrorKind::Upstream => match message {
                Some(message) => ExplainError::Upstream { message },
                None => ExplainError::Unknown,
            },
        };
    }

    let Some(message) = message else {
        return ExplainError::Unknown;
    };

    let lower = message.to_lowercase();
    if CREDENTIAL_PATTERNS.iter().any(|p| lower.contains(p)) {
        ExplainError::InvalidCredential {
            message: Some(message),
        }
    } else if RATE_LIMIT_PATTERNS.iter().any(|p| lower.contains(p)) {
        ExplainError::RateLimited {
            message: Some(message),
        }
    } else {
        ExplainError::Upstream { message }
    }
}
