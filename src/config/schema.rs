/// Configuration schema and defaults for minerdash.
///
/// Defines the TOML-serializable configuration structure with the sections
/// `[backend]`, `[poller]`, `[chat]` and `[logging]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level minerdash configuration.
///
/// Maps directly to the `~/.minerdash/config.toml` and `.minerdash.toml`
/// file schemas. Missing sections fall back to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerdashConfig {
    pub backend: BackendConfig,
    pub poller: PollerConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

/// Where the dashboard backend lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend, e.g. `http://raspberrypi.local:5000`.
    pub base_url: String,
    /// Timeout for stats and health requests (milliseconds).
    pub request_timeout_ms: u64,
    /// Timeout for chat requests (milliseconds). `0` leaves the request
    /// bounded only by the transport defaults.
    pub chat_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_ms: 5_000,
            chat_timeout_ms: 0,
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// `None` when no explicit chat timeout is configured.
    pub fn chat_timeout(&self) -> Option<Duration> {
        (self.chat_timeout_ms > 0).then(|| Duration::from_millis(self.chat_timeout_ms))
    }
}

// ---------------------------------------------------------------------------
// [poller]
// ---------------------------------------------------------------------------

/// Stats poller settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Period between stats refreshes (milliseconds).
    pub interval_ms: u64,
    /// Clear the refresh timer while the dashboard is hidden.
    pub pause_when_hidden: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 3_000,
            pause_when_hidden: true,
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

// ---------------------------------------------------------------------------
// [chat]
// ---------------------------------------------------------------------------

/// Chat client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Longest message (in characters, after trimming) that will be sent.
    pub max_message_chars: usize,
    /// Render assistant replies as markdown. When `false` every reply is
    /// shown as plain text.
    pub render_markdown: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_chars: 2_000,
            render_markdown: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Activity log settings (`~/.minerdash/activity.jsonl`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Detail strings longer than this are cut before being written.
    pub max_detail_chars: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_detail_chars: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl MinerdashConfig {
    /// The annotated TOML written by `minerdash config init`.
    pub fn default_toml() -> &'static str {
        r#"# minerdash configuration
#
# Precedence (highest last): built-in defaults, ~/.minerdash/config.toml,
# ./.minerdash.toml, MINERDASH_* environment variables.

[backend]
# Base URL of the dashboard backend.
base_url = "http://127.0.0.1:5000"
# Timeout for stats and health requests (ms).
request_timeout_ms = 5000
# Timeout for chat requests (ms). 0 = transport default.
chat_timeout_ms = 0

[poller]
# Stats refresh period (ms).
interval_ms = 3000
# Stop refreshing while the dashboard is hidden (/hide).
pause_when_hidden = true

[chat]
# Longest message that will be sent, in characters.
max_message_chars = 2000
# Render assistant replies as markdown.
render_markdown = true

[logging]
# Append activity to ~/.minerdash/activity.jsonl.
enabled = true
max_detail_chars = 500
"#
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
