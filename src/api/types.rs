//! Wire types for the chat and health endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST /api/chat`.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

/// What a successful `POST /api/chat` said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    /// `{"response": {"content": "..."}}`
    Content(String),
    /// `{"error": "..."}`
    Error(String),
    /// Valid JSON, but neither shape.
    Unrecognized,
}

impl ChatReply {
    /// Interpret a chat response body.
    ///
    /// A bare string under `response` is accepted too; some backends skip
    /// the `content` wrapper.
    pub fn from_json(body: &Value) -> Self {
        match body.get("response") {
            Some(Value::Object(response)) => {
                if let Some(Value::String(content)) = response.get("content") {
                    return Self::Content(content.clone());
                }
            }
            Some(Value::String(content)) => return Self::Content(content.clone()),
            _ => {}
        }

        match body.get("error") {
            Some(Value::String(error)) => Self::Error(error.clone()),
            _ => Self::Unrecognized,
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: Option<f64>,
    pub modules: BTreeMap<String, bool>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Pull the backend's `{"error": "..."}` message out of an error body.
pub fn error_message(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}
