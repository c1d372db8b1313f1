/// HTTP implementation of [`Backend`] using the synchronous `ureq` client.
///
/// One `ureq::Agent` is shared by every request so connections to the
/// backend are pooled across polls. Stats and health calls carry the
/// configured request timeout. Chat calls only carry a timeout when one is
/// configured explicitly.
use std::time::Duration;

use serde_json::Value;

use super::types::{ChatReply, ChatRequest, HealthReport, error_message};
use super::{Backend, RequestError, expect_object};
use crate::config::schema::BackendConfig;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: String,
    request_timeout: Duration,
    chat_timeout: Option<Duration>,
}

impl HttpBackend {
    /// Build a backend from the resolved config.
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            base_url: normalize_base_url(&config.base_url),
            request_timeout: config.request_timeout(),
            chat_timeout: config.chat_timeout(),
        }
    }

    /// Backend at `base_url` with default timeouts.
    pub fn new(base_url: &str) -> Self {
        let config = BackendConfig {
            base_url: base_url.to_string(),
            ..BackendConfig::default()
        };
        Self::from_config(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_json(&self, path: &str) -> Result<Value, RequestError> {
        let response = self
            .agent
            .get(&self.url(path))
            .timeout(self.request_timeout)
            .call()
            .map_err(map_ureq_error)?;
        read_json(response)
    }
}

impl Backend for HttpBackend {
    fn system_stats(&self) -> Result<Value, RequestError> {
        self.get_json("/api/system-stats").and_then(expect_object)
    }

    fn miner_stats(&self) -> Result<Value, RequestError> {
        self.get_json("/api/miner-stats").and_then(expect_object)
    }

    fn chat(&self, message: &str) -> Result<ChatReply, RequestError> {
        let mut request = self.agent.post(&self.url("/api/chat"));
        if let Some(timeout) = self.chat_timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send_json(ChatRequest { message })
            .map_err(map_ureq_error)?;
        let body = read_json(response)?;

        Ok(ChatReply::from_json(&body))
    }

    fn health(&self) -> Result<HealthReport, RequestError> {
        let body = self.get_json("/health")?;
        serde_json::from_value(body).map_err(|e| RequestError::Malformed(e.to_string()))
    }
}

/// Strip trailing slashes and pin `localhost` to IPv4.
///
/// The backend usually binds `0.0.0.0`; resolving `localhost` to `::1`
/// first stalls every poll until the IPv6 attempt fails.
fn normalize_base_url(raw: &str) -> String {
    let url = raw.trim().trim_end_matches('/');

    // Exact host only; `localhost.lan` is a different machine.
    if let Some((scheme, rest)) = url.split_once("://")
        && let Some(after_host) = rest.strip_prefix("localhost")
        && (after_host.is_empty() || after_host.starts_with([':', '/']))
    {
        return format!("{scheme}://127.0.0.1{after_host}");
    }

    url.to_string()
}

fn map_ureq_error(error: ureq::Error) -> RequestError {
    match error {
        ureq::Error::Status(code, response) => {
            let status_text = response.status_text().to_string();
            let message = response
                .into_json::<Value>()
                .ok()
                .as_ref()
                .and_then(error_message)
                .unwrap_or(status_text);
            RequestError::Status { code, message }
        }
        ureq::Error::Transport(transport) => RequestError::Transport(transport.to_string()),
    }
}

fn read_json(response: ureq::Response) -> Result<Value, RequestError> {
    response
        .into_json::<Value>()
        .map_err(|e| RequestError::Malformed(e.to_string()))
}
