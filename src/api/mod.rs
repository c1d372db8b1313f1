//! Backend access for the dashboard.
//!
//! The backend is an external collaborator. [`Backend`] is the seam the rest
//! of the crate talks through. [`http::HttpBackend`] is the real
//! implementation; tests substitute in-memory fakes.

pub mod http;
pub mod types;

use serde_json::Value;
use thiserror::Error;

pub use http::HttpBackend;
pub use types::{ChatReply, HealthReport};

/// Why a backend request did not produce usable data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Connection refused, DNS failure, timeout, reset...
    #[error("network error: {0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("server responded with status {code}: {message}")]
    Status { code: u16, message: String },
    /// The body was not the JSON shape we expected.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RequestError {
    /// Short label used in the activity log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// The four endpoints the dashboard consumes.
///
/// Implementations are shared with worker threads, hence `Send + Sync`.
pub trait Backend: Send + Sync + 'static {
    /// `GET /api/system-stats`. Returns the JSON object as-is; field
    /// validation is the poller's job.
    fn system_stats(&self) -> Result<Value, RequestError>;

    /// `GET /api/miner-stats`.
    fn miner_stats(&self) -> Result<Value, RequestError>;

    /// `POST /api/chat` with `{"message": message}`.
    fn chat(&self, message: &str) -> Result<ChatReply, RequestError>;

    /// `GET /health`.
    fn health(&self) -> Result<HealthReport, RequestError>;
}

/// Require a stats body to be a JSON object.
pub(crate) fn expect_object(body: Value) -> Result<Value, RequestError> {
    if body.is_object() {
        Ok(body)
    } else {
        Err(RequestError::Malformed(format!(
            "expected a JSON object, got {}",
            json_type_name(&body)
        )))
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
