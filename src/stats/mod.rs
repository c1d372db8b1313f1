//! Stat fields shown on the dashboard and how payloads map onto them.
//!
//! A payload is applied field by field. Only values that are present *and*
//! JSON numbers produce an update; anything else leaves the field alone so
//! the previous reading stays on screen.

use serde_json::Value;

/// Text shown in a field that has never been updated.
pub const PLACEHOLDER: &str = "--";

/// Which endpoint a group of fields comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsGroup {
    System,
    Mining,
}

impl StatsGroup {
    pub fn fields(self) -> &'static [StatField] {
        match self {
            Self::System => &[
                StatField::CpuUsage,
                StatField::MemoryUsage,
                StatField::Temperature,
                StatField::Uptime,
            ],
            Self::Mining => &[
                StatField::Hashrate,
                StatField::TotalMined,
                StatField::MinerUptime,
                StatField::DailyYield,
            ],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Mining => "mining",
        }
    }
}

/// One on-screen stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatField {
    CpuUsage,
    MemoryUsage,
    Temperature,
    Uptime,
    Hashrate,
    TotalMined,
    MinerUptime,
    DailyYield,
}

impl StatField {
    pub const ALL: [StatField; 8] = [
        Self::CpuUsage,
        Self::MemoryUsage,
        Self::Temperature,
        Self::Uptime,
        Self::Hashrate,
        Self::TotalMined,
        Self::MinerUptime,
        Self::DailyYield,
    ];

    /// Stable element id, as used by the backend's own web page.
    pub fn id(self) -> &'static str {
        match self {
            Self::CpuUsage => "cpu-usage",
            Self::MemoryUsage => "memory-usage",
            Self::Temperature => "temperature",
            Self::Uptime => "uptime",
            Self::Hashrate => "hashrate",
            Self::TotalMined => "total-mined",
            Self::MinerUptime => "miner-uptime",
            Self::DailyYield => "daily-yield",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::CpuUsage => "CPU",
            Self::MemoryUsage => "Memory",
            Self::Temperature => "Temp",
            Self::Uptime => "Uptime",
            Self::Hashrate => "Hashrate",
            Self::TotalMined => "Mined",
            Self::MinerUptime => "Miner uptime",
            Self::DailyYield => "Daily yield",
        }
    }

    /// JSON key this field is read from.
    pub fn source_key(self) -> &'static str {
        match self {
            Self::CpuUsage => "cpu_usage",
            Self::MemoryUsage => "memory_usage",
            Self::Temperature => "temperature",
            Self::Uptime | Self::MinerUptime => "uptime",
            Self::Hashrate => "hashrate",
            Self::TotalMined => "total_mined",
            Self::DailyYield => "estimated_daily_yield",
        }
    }

    pub fn group(self) -> StatsGroup {
        match self {
            Self::CpuUsage | Self::MemoryUsage | Self::Temperature | Self::Uptime => {
                StatsGroup::System
            }
            _ => StatsGroup::Mining,
        }
    }

    /// Render a raw reading for display.
    pub fn format(self, value: f64) -> String {
        match self {
            Self::CpuUsage | Self::MemoryUsage => format!("{value:.1}%"),
            Self::Temperature => format!("{value:.1}°C"),
            Self::Uptime => format!("{value:.1} hrs"),
            Self::Hashrate => format!("{} H/s", value.round()),
            Self::TotalMined | Self::DailyYield => format!("{value:.8} XMR"),
            // Miner uptime arrives in seconds.
            Self::MinerUptime => format!("{:.1} hrs", value / 3600.0),
        }
    }
}

/// Typed view of a system stats payload. `None` marks a field that was
/// missing or not a number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemStats {
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub temperature: Option<f64>,
    pub uptime: Option<f64>,
}

impl SystemStats {
    pub fn from_json(payload: &Value) -> Self {
        Self {
            cpu_usage: numeric(payload, "cpu_usage"),
            memory_usage: numeric(payload, "memory_usage"),
            temperature: numeric(payload, "temperature"),
            uptime: numeric(payload, "uptime"),
        }
    }
}

/// Typed view of a miner stats payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiningStats {
    pub hashrate: Option<f64>,
    pub total_mined: Option<f64>,
    pub uptime: Option<f64>,
    pub estimated_daily_yield: Option<f64>,
}

impl MiningStats {
    pub fn from_json(payload: &Value) -> Self {
        Self {
            hashrate: numeric(payload, "hashrate"),
            total_mined: numeric(payload, "total_mined"),
            uptime: numeric(payload, "uptime"),
            estimated_daily_yield: numeric(payload, "estimated_daily_yield"),
        }
    }
}

/// The display updates a payload produces, in field order.
pub fn updates(group: StatsGroup, payload: &Value) -> Vec<(StatField, String)> {
    group
        .fields()
        .iter()
        .filter_map(|&field| {
            numeric(payload, field.source_key()).map(|value| (field, field.format(value)))
        })
        .collect()
}

/// A finite JSON number under `key`, or `None`.
fn numeric(payload: &Value, key: &str) -> Option<f64> {
    match payload.get(key) {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        _ => None,
    }
}
