//! CLI command implementations.
//!
//! - `minerdash watch`: interactive dashboard (stats panel + chat)
//! - `minerdash stats`: one-shot stats snapshot
//! - `minerdash ask "message"`: one-shot chat
//! - `minerdash health`: backend module availability
//! - `minerdash config show|init|set|reset|path`: configuration management
//! - `minerdash log`: recent activity log entries

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::activity::{self, ActivityLog, Source};
use crate::api::{Backend, HttpBackend};
use crate::chat::{ChatClient, Rejection};
use crate::config::{self, MinerdashConfig};
use crate::dashboard::Dashboard;
use crate::page::{Change, Page, Renderer};
use crate::poller::StatsPoller;
use crate::stats::{StatField, StatsGroup};
use crate::terminal::{self, TerminalRenderer};

/// Output format for snapshot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            _ => Self::Table,
        }
    }
}

/// Load config and apply a `--url` override.
pub fn resolve_config(url: Option<String>) -> MinerdashConfig {
    let mut config = config::load();
    if let Some(url) = url {
        config.backend.base_url = url;
    }
    config
}

// ---------------------------------------------------------------------------
// minerdash watch
// ---------------------------------------------------------------------------

/// Run the interactive dashboard until `/quit` or EOF.
pub fn run_watch(config: &MinerdashConfig, transcript: Option<PathBuf>) -> Result<()> {
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::from_config(&config.backend));
    let log = ActivityLog::from_config(&config.logging);

    println!(
        "{} {}",
        "minerdash".bold().cyan(),
        format!(
            "→ {} (refresh every {} ms)",
            config.backend.base_url, config.poller.interval_ms
        )
        .dimmed()
    );
    println!("{}", terminal::HELP.dimmed());

    let mut dashboard = Dashboard::new(config, backend, TerminalRenderer::stdout(), log);
    // The input thread stays blocked on stdin after /quit; the process exit
    // takes it down.
    let _input = terminal::spawn_input(dashboard.sender());
    dashboard.run();

    if let Some(path) = transcript {
        fs::write(&path, dashboard.page().transcript_html())
            .with_context(|| format!("failed to write transcript to {}", path.display()))?;
        println!("transcript written to {}", path.display());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// minerdash stats
// ---------------------------------------------------------------------------

/// Fetch both stats endpoints once and print the result.
///
/// Fails only when both endpoints fail.
pub fn run_stats(config: &MinerdashConfig, format: OutputFormat) -> Result<()> {
    let backend = HttpBackend::from_config(&config.backend);
    let log = ActivityLog::from_config(&config.logging);
    let (page, failures) = snapshot(&backend, &log);

    for (group, error) in &failures {
        eprintln!(
            "{}",
            format!("warning: {} stats unavailable: {error}", group.label()).yellow()
        );
    }
    if failures.len() == 2 {
        anyhow::bail!("no stats available from {}", config.backend.base_url);
    }

    match format {
        OutputFormat::Json => print_stats_json(&page)?,
        OutputFormat::Table => print_stats_table(&page),
    }

    Ok(())
}

/// Fetch both groups into a fresh page. Returns the page and the groups
/// that failed.
pub fn snapshot(backend: &dyn Backend, log: &ActivityLog) -> (Page, Vec<(StatsGroup, String)>) {
    let mut page = Page::new();
    let mut failures = Vec::new();

    for group in [StatsGroup::System, StatsGroup::Mining] {
        let started = Instant::now();
        let result = match group {
            StatsGroup::System => backend.system_stats(),
            StatsGroup::Mining => backend.miner_stats(),
        };
        let latency_ms = Some(started.elapsed().as_millis() as u64);
        let source = match group {
            StatsGroup::System => Source::SystemStats,
            StatsGroup::Mining => Source::MinerStats,
        };

        match result {
            Ok(payload) => {
                log.ok(source, "snapshot", latency_ms);
                match group {
                    StatsGroup::System => StatsPoller::apply_system(&mut page, &payload),
                    StatsGroup::Mining => StatsPoller::apply_miner(&mut page, &payload),
                };
            }
            Err(error) => {
                log.error(source, &format!("{}: {error}", error.kind()), latency_ms);
                failures.push((group, error.to_string()));
            }
        }
    }

    (page, failures)
}

fn print_stats_table(page: &Page) {
    for group in [StatsGroup::System, StatsGroup::Mining] {
        let title = match group {
            StatsGroup::System => "System",
            StatsGroup::Mining => "Mining",
        };
        println!("{}", title.bold().cyan());
        for &field in group.fields() {
            println!("  {:<14} {}", field.label(), page.field_text(field));
        }
    }
}

fn print_stats_json(page: &Page) -> Result<()> {
    let fields: serde_json::Map<String, serde_json::Value> = StatField::ALL
        .iter()
        .map(|&field| {
            (
                field.id().to_string(),
                serde_json::Value::String(page.field_text(field).to_string()),
            )
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// minerdash ask
// ---------------------------------------------------------------------------

/// Send one chat message with the same rules as the dashboard and print the
/// reply.
pub fn run_ask(config: &MinerdashConfig, message: &str) -> Result<()> {
    let backend = HttpBackend::from_config(&config.backend);
    let log = ActivityLog::from_config(&config.logging);
    let mut renderer = TerminalRenderer::stdout();
    let mut page = Page::new();

    ask(&backend, config, &mut page, &mut renderer, &log, message)
}

/// The body of `minerdash ask`, parameterized for tests.
pub fn ask<R: Renderer>(
    backend: &dyn Backend,
    config: &MinerdashConfig,
    page: &mut Page,
    renderer: &mut R,
    log: &ActivityLog,
    message: &str,
) -> Result<()> {
    let mut chat = ChatClient::new(&config.chat);

    // The user entry and placeholder are not worth painting for a one-shot.
    let submission = chat.submit(page, message);

    let Some(message) = submission.send else {
        if let Some(Rejection::TooLong { max, actual }) = submission.rejection {
            log.record(Source::Chat, "rejected", "message too long", None);
            anyhow::bail!("message too long: {actual} characters (max {max})");
        }
        anyhow::bail!("nothing to send: message is empty");
    };

    let outcome = backend.chat(&message);
    let settlement = chat.settle(page, &outcome);
    match &outcome {
        Ok(_) => log.ok(Source::Chat, "ask", settlement.latency_ms),
        Err(error) => log.error(
            Source::Chat,
            &format!("{}: {error}", error.kind()),
            settlement.latency_ms,
        ),
    }

    // Only the reply is interesting here; the prompt change is skipped.
    for change in &settlement.changes {
        if matches!(change, Change::EntryAdded(_)) {
            renderer.paint(page, change);
        }
    }

    if outcome.is_err() {
        anyhow::bail!("chat request failed");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// minerdash health
// ---------------------------------------------------------------------------

pub fn run_health(config: &MinerdashConfig) -> Result<()> {
    let backend = HttpBackend::from_config(&config.backend);
    let log = ActivityLog::from_config(&config.logging);

    println!("{}", "minerdash Health Check".bold().cyan());
    println!("{}", "=".repeat(40));
    println!("  {:<14} {}", "Backend:", config.backend.base_url);

    let report = match backend.health() {
        Ok(report) => report,
        Err(error) => {
            log.error(Source::Health, &error.to_string(), None);
            println!("  {:<14} {}", "Status:", "unreachable".red());
            anyhow::bail!("backend health check failed: {error}");
        }
    };
    log.ok(Source::Health, &report.status, None);

    let status = if report.is_healthy() {
        report.status.green()
    } else {
        report.status.yellow()
    };
    println!("  {:<14} {}", "Status:", status);

    if !report.modules.is_empty() {
        println!();
        println!("{}", "Modules".bold().cyan());
        for (name, available) in &report.modules {
            let mark = if *available {
                "available".green()
            } else {
                "missing".red()
            };
            println!("  {name:<14} {mark}");
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// minerdash config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    Show,
    Init { force: bool },
    Set { key: String, value: String },
    Reset,
    Path,
}

pub fn run_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => print!("{}", config::show_effective_config()?),
        ConfigAction::Init { force } => {
            let path = config::init_config(force)?;
            println!("{} {}", "Wrote".green(), path.display());
        }
        ConfigAction::Set { key, value } => {
            config::set_config_value(&key, &value)?;
            println!("{} {key} = {value}", "Set".green());
        }
        ConfigAction::Reset => {
            let path = config::reset_config()?;
            println!("{} {}", "Reset".green(), path.display());
        }
        ConfigAction::Path => {
            let show = |label: &str, path: Option<PathBuf>| match path {
                Some(path) => {
                    let state = if path.exists() { "" } else { " (not present)" };
                    println!("  {label:<8} {}{}", path.display(), state.dimmed());
                }
                None => println!("  {label:<8} {}", "unknown".dimmed()),
            };
            show("global", config::global_config_file());
            show("project", config::project_config_file());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// minerdash log
// ---------------------------------------------------------------------------

/// Print the newest `lines` entries. Entries written before logging was
/// turned off are still shown.
pub fn run_log(config: &MinerdashConfig, lines: usize) -> Result<()> {
    let path = activity::activity_log_path();
    let log = path
        .clone()
        .map(ActivityLog::to_file)
        .unwrap_or_else(ActivityLog::disabled);
    let entries = log.tail(lines);

    if !config.logging.enabled {
        println!("{}", logging_disabled_note().yellow());
    }
    if entries.is_empty() {
        if config.logging.enabled {
            println!("{}", empty_log_note(path.as_deref()).yellow());
        }
        return Ok(());
    }

    for entry in entries {
        let outcome = match entry.outcome.as_str() {
            "ok" => entry.outcome.green(),
            "error" => entry.outcome.red(),
            _ => entry.outcome.yellow(),
        };
        let latency = entry
            .latency_ms
            .map(|ms| format!(" {ms}ms"))
            .unwrap_or_default();
        println!(
            "{} {:<13} {:<8} {}{}",
            entry.timestamp.dimmed(),
            entry.source.to_string(),
            outcome,
            entry.detail,
            latency.dimmed()
        );
    }

    Ok(())
}

fn logging_disabled_note() -> &'static str {
    "Activity logging is disabled (logging.enabled = false)."
}

fn empty_log_note(path: Option<&Path>) -> String {
    let location = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "the activity log".to_string());
    format!("No activity recorded in {location}.")
}
