//! Error types for channel-insights
//!
//! This module provides the error handling for the library:
//! - [`ExecutorFailure`] - why a single timeout-bounded request failed
//! - [`PipelineError`] - which stage failed and why, with its user-facing message
//! - [`Error`] - the crate-wide error returned by fallible operations
//! - HTTP status code mapping and a JSON error envelope for the REST surface

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{Phase, Stage};

/// Result type alias for channel-insights operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of one timeout-bounded request
///
/// The three causes are local to one stage and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExecutorFailure {
    /// The stage's own deadline elapsed and the in-flight request was aborted
    #[error("request timed out")]
    Timeout,

    /// The remote answered with a non-success status
    #[error("Status {code}")]
    HttpStatus {
        /// Numeric HTTP status code
        code: u16,
    },

    /// Network or parse fault below the HTTP layer
    #[error("{message}")]
    Transport {
        /// Underlying error text
        message: String,
    },
}

impl ExecutorFailure {
    /// Build a transport failure from any displayable error
    pub fn transport(err: impl std::fmt::Display) -> Self {
        ExecutorFailure::Transport {
            message: err.to_string(),
        }
    }

    /// Whether this failure came from the request's deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutorFailure::Timeout)
    }
}

impl From<reqwest::Error> for ExecutorFailure {
    fn from(err: reqwest::Error) -> Self {
        ExecutorFailure::transport(err)
    }
}

/// The single error a failed run produces
///
/// `Display` renders the user-facing message: a stage-specific "timed out" text for
/// [`ExecutorFailure::Timeout`], and `"<stage prefix>: <detail>"` for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineError {
    /// Stage that failed
    pub stage: Stage,
    /// Why it failed
    pub cause: ExecutorFailure,
}

impl PipelineError {
    /// Tag an executor failure with the stage it happened in
    pub fn new(stage: Stage, cause: ExecutorFailure) -> Self {
        Self { stage, cause }
    }

    /// Human-readable message for display
    pub fn message(&self) -> String {
        match &self.cause {
            ExecutorFailure::Timeout => self.stage.timeout_message().to_string(),
            cause => format!("{}: {}", self.stage.failure_prefix(), cause),
        }
    }

    /// Whether the stage failed because its deadline elapsed
    pub fn is_timeout(&self) -> bool {
        self.cause.is_timeout()
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Main error type for channel-insights
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "timeouts.channel_fetch_ms")
        key: Option<String>,
    },

    /// Submitted text was empty or whitespace only
    #[error("input is blank")]
    BlankInput,

    /// A run is already in flight
    #[error("a run is already in progress (phase: {phase})")]
    Busy {
        /// Phase of the run in flight
        phase: Phase,
    },

    /// A stage of the run failed
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error outside a stage request (client construction, etc.)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

impl Error {
    /// Configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "busy",
///     "message": "a run is already in progress (phase: fetchingChannels)",
///     "details": { "phase": "fetchingChannels" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "blank_input", "busy")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::BlankInput => 400,
            Error::Busy { .. } => 409,

            // A stage timing out is a gateway timeout; everything else is a bad gateway
            Error::Pipeline(e) if e.is_timeout() => 504,
            Error::Pipeline(_) => 502,
            Error::Network(_) => 502,

            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::BlankInput => "blank_input",
            Error::Busy { .. } => "busy",
            Error::Pipeline(e) => match e.cause {
                ExecutorFailure::Timeout => "stage_timeout",
                ExecutorFailure::HttpStatus { .. } => "stage_http_status",
                ExecutorFailure::Transport { .. } => "stage_transport",
            },
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::Busy { phase } => Some(serde_json::json!({ "phase": phase })),
            Error::Pipeline(e) => Some(serde_json::json!({
                "stage": e.stage,
                "cause": e.cause,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
