//! Activity log: one JSON object per line in `~/.minerdash/activity.jsonl`.
//!
//! The dashboard never surfaces stats failures on screen, so this log is
//! where they end up. Chat outcomes and visibility changes are recorded too.
//! Writes are best-effort; a failure to log never affects the dashboard.

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::schema::LoggingConfig;

/// Which part of the client produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    SystemStats,
    MinerStats,
    Chat,
    Poller,
    Health,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SystemStats => write!(f, "system-stats"),
            Self::MinerStats => write!(f, "miner-stats"),
            Self::Chat => write!(f, "chat"),
            Self::Poller => write!(f, "poller"),
            Self::Health => write!(f, "health"),
        }
    }
}

/// A single line of the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    pub source: Source,
    /// `"ok"`, `"error"`, `"rejected"`, `"paused"` or `"resumed"`.
    pub outcome: String,
    #[serde(default)]
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latency_ms: Option<u64>,
}

/// Handle used by the rest of the crate to append to the log.
///
/// Cheap to clone; worker threads get their own copy.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: Option<PathBuf>,
    max_detail_chars: usize,
}

impl ActivityLog {
    /// Log to `~/.minerdash/activity.jsonl`, or nowhere when disabled.
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            path: if config.enabled { activity_log_path() } else { None },
            max_detail_chars: config.max_detail_chars,
        }
    }

    /// Log to an explicit file.
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            max_detail_chars: LoggingConfig::default().max_detail_chars,
        }
    }

    /// A log that drops everything.
    pub fn disabled() -> Self {
        Self {
            path: None,
            max_detail_chars: 0,
        }
    }

    pub fn record(&self, source: Source, outcome: &str, detail: &str, latency_ms: Option<u64>) {
        let Some(path) = &self.path else {
            return;
        };

        let entry = ActivityEntry {
            timestamp: Utc::now().to_rfc3339(),
            source,
            outcome: outcome.to_string(),
            detail: clip(detail, self.max_detail_chars),
            latency_ms,
        };

        let _ = append_entry(path, &entry);
    }

    pub fn ok(&self, source: Source, detail: &str, latency_ms: Option<u64>) {
        self.record(source, "ok", detail, latency_ms);
    }

    pub fn error(&self, source: Source, detail: &str, latency_ms: Option<u64>) {
        self.record(source, "error", detail, latency_ms);
    }

    /// Read back every entry in this log. Malformed lines are skipped.
    pub fn read_all(&self) -> Vec<ActivityEntry> {
        self.path.as_deref().map(read_entries).unwrap_or_default()
    }

    /// The last `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> Vec<ActivityEntry> {
        let mut entries = self.read_all();
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
        entries
    }
}

fn clip(detail: &str, max_chars: usize) -> String {
    let single_line = detail.replace(['\r', '\n'], " ");
    if single_line.chars().count() > max_chars {
        let cut: String = single_line.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        single_line
    }
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

fn append_entry(path: &Path, entry: &ActivityEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

fn read_entries(path: &Path) -> Vec<ActivityEntry> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str::<ActivityEntry>(&line).ok())
        .collect()
}

/// Return the path to the activity log file.
pub fn activity_log_path() -> Option<PathBuf> {
    crate::config::data_dir().map(|dir| dir.join("activity.jsonl"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
