/// Dashboard controller tests.
///
/// Drive a `Dashboard` against an in-memory backend and check the page the
/// way a user would see it: stat field text, chat entries, input state and
/// whether polling is running. Events are pumped by hand with
/// `Dashboard::step`, so nothing here depends on a real terminal.
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use minerdash::activity::ActivityLog;
use minerdash::api::{Backend, ChatReply, HealthReport, RequestError};
use minerdash::config::MinerdashConfig;
use minerdash::dashboard::{Dashboard, Event};
use minerdash::page::{Change, Format, Page, Renderer, Sender};
use minerdash::stats::StatField;
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeBackend {
    system: Mutex<VecDeque<Result<Value, RequestError>>>,
    miner: Mutex<VecDeque<Result<Value, RequestError>>>,
    chat: Mutex<VecDeque<Result<ChatReply, RequestError>>>,
    system_calls: AtomicUsize,
    miner_calls: AtomicUsize,
    sent: Mutex<Vec<String>>,
}

impl FakeBackend {
    fn script_system(&self, response: Result<Value, RequestError>) {
        self.system.lock().unwrap().push_back(response);
    }

    fn script_miner(&self, response: Result<Value, RequestError>) {
        self.miner.lock().unwrap().push_back(response);
    }

    fn script_chat(&self, response: Result<ChatReply, RequestError>) {
        self.chat.lock().unwrap().push_back(response);
    }

    fn system_calls(&self) -> usize {
        self.system_calls.load(Ordering::SeqCst)
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl Backend for FakeBackend {
    fn system_stats(&self) -> Result<Value, RequestError> {
        self.system_calls.fetch_add(1, Ordering::SeqCst);
        self.system
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({})))
    }

    fn miner_stats(&self) -> Result<Value, RequestError> {
        self.miner_calls.fetch_add(1, Ordering::SeqCst);
        self.miner
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({})))
    }

    fn chat(&self, message: &str) -> Result<ChatReply, RequestError> {
        self.sent.lock().unwrap().push(message.to_string());
        self.chat
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(ChatReply::Unrecognized))
    }

    fn health(&self) -> Result<HealthReport, RequestError> {
        Ok(HealthReport::default())
    }
}

#[derive(Default)]
struct RecordingRenderer {
    changes: Vec<Change>,
}

impl Renderer for RecordingRenderer {
    fn paint(&mut self, _page: &Page, change: &Change) {
        self.changes.push(change.clone());
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config(interval_ms: u64) -> MinerdashConfig {
    let mut config = MinerdashConfig::default();
    config.poller.interval_ms = interval_ms;
    config
}

fn dashboard(
    backend: &Arc<FakeBackend>,
    interval_ms: u64,
) -> Dashboard<RecordingRenderer> {
    let backend: Arc<dyn Backend> = Arc::clone(backend) as Arc<dyn Backend>;
    Dashboard::new(
        &config(interval_ms),
        backend,
        RecordingRenderer::default(),
        ActivityLog::disabled(),
    )
}

/// Handle events until none arrive for `idle`.
fn pump(dashboard: &mut Dashboard<RecordingRenderer>, idle: Duration) {
    while dashboard.step(idle).is_some() {}
}

/// Handle events until `done` holds or `limit` passes.
fn pump_until<F>(dashboard: &mut Dashboard<RecordingRenderer>, limit: Duration, mut done: F) -> bool
where
    F: FnMut(&Dashboard<RecordingRenderer>) -> bool,
{
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if done(dashboard) {
            return true;
        }
        dashboard.step(Duration::from_millis(10));
    }
    done(dashboard)
}

const IDLE: Duration = Duration::from_millis(150);
const LONG_INTERVAL: u64 = 60_000;

// ---------------------------------------------------------------------------
// Stats poller
// ---------------------------------------------------------------------------

#[test]
fn init_fetches_both_groups_immediately() {
    let backend = Arc::new(FakeBackend::default());
    backend.script_system(Ok(json!({
        "cpu_usage": 12.34,
        "memory_usage": 48.0,
        "temperature": 51.24,
        "uptime": 5.5
    })));
    backend.script_miner(Ok(json!({
        "hashrate": 1530.6,
        "total_mined": 0.00012,
        "uptime": 9000,
        "estimated_daily_yield": 0.0004
    })));

    let mut dash = dashboard(&backend, LONG_INTERVAL);
    dash.init();
    pump(&mut dash, IDLE);

    let page = dash.page();
    assert_eq!(page.field_text(StatField::CpuUsage), "12.3%");
    assert_eq!(page.field_text(StatField::MemoryUsage), "48.0%");
    assert_eq!(page.field_text(StatField::Temperature), "51.2°C");
    assert_eq!(page.field_text(StatField::Uptime), "5.5 hrs");
    assert_eq!(page.field_text(StatField::Hashrate), "1531 H/s");
    assert_eq!(page.field_text(StatField::TotalMined), "0.00012000 XMR");
    assert_eq!(page.field_text(StatField::MinerUptime), "2.5 hrs");
    assert_eq!(page.field_text(StatField::DailyYield), "0.00040000 XMR");
    assert!(dash.poller().is_armed());
}

#[test]
fn missing_or_mistyped_fields_keep_previous_text() {
    let backend = Arc::new(FakeBackend::default());
    backend.script_system(Ok(json!({"cpu_usage": 10.0, "memory_usage": 20.0})));
    backend.script_system(Ok(json!({"cpu_usage": "busy", "memory_usage": null})));

    let mut dash = dashboard(&backend, LONG_INTERVAL);
    dash.init();
    pump(&mut dash, IDLE);
    assert_eq!(dash.page().field_text(StatField::CpuUsage), "10.0%");

    dash.handle(Event::Tick(dash.poller().generation()));
    pump(&mut dash, IDLE);
    assert_eq!(backend.system_calls(), 2);
    assert_eq!(dash.page().field_text(StatField::CpuUsage), "10.0%");
    assert_eq!(dash.page().field_text(StatField::MemoryUsage), "20.0%");
}

#[test]
fn stats_failures_are_silent_and_polling_continues() {
    let backend = Arc::new(FakeBackend::default());
    backend.script_system(Err(RequestError::Transport("connection refused".to_string())));
    backend.script_miner(Err(RequestError::Status {
        code: 500,
        message: "Failed to get miner stats".to_string(),
    }));

    let mut dash = dashboard(&backend, LONG_INTERVAL);
    dash.init();
    pump(&mut dash, IDLE);

    assert_eq!(dash.page().entry_count(), 0);
    assert_eq!(dash.page().field_text(StatField::CpuUsage), "--");
    assert!(dash.poller().is_armed());
    assert!(
        !dash
            .renderer()
            .changes
            .iter()
            .any(|c| matches!(c, Change::Fields(..) | Change::EntryAdded(_)))
    );
}

#[test]
fn hiding_stops_fetches_and_showing_resumes_them() {
    let backend = Arc::new(FakeBackend::default());
    let mut dash = dashboard(&backend, 50);
    dash.init();
    dash.handle(Event::Visibility(false));
    assert!(!dash.poller().is_armed());

    // Only the initial fetch happens while hidden.
    pump(&mut dash, Duration::from_millis(250));
    assert_eq!(backend.system_calls(), 1);

    dash.handle(Event::Visibility(true));
    assert!(dash.poller().is_armed());
    // No catch-up fetch on show...
    assert_eq!(backend.system_calls(), 1);
    // ...but the next tick arrives within about one period.
    assert!(pump_until(&mut dash, Duration::from_millis(500), |_| {
        backend.system_calls() >= 2
    }));
}

#[test]
fn stale_tick_after_hide_is_ignored() {
    let backend = Arc::new(FakeBackend::default());
    let mut dash = dashboard(&backend, LONG_INTERVAL);
    dash.init();
    pump(&mut dash, IDLE);
    let queued = dash.poller().generation();
    dash.handle(Event::Visibility(false));

    dash.handle(Event::Tick(queued));
    pump(&mut dash, IDLE);
    assert_eq!(backend.system_calls(), 1);
}

#[test]
fn tick_queued_before_hide_is_dropped_after_quick_show() {
    let backend = Arc::new(FakeBackend::default());
    let mut dash = dashboard(&backend, LONG_INTERVAL);
    dash.init();
    pump(&mut dash, IDLE);
    let queued = dash.poller().generation();

    dash.handle(Event::Visibility(false));
    dash.handle(Event::Visibility(true));
    assert!(dash.poller().is_armed());

    // No catch-up: the old timer's tick does not fetch.
    dash.handle(Event::Tick(queued));
    pump(&mut dash, IDLE);
    assert_eq!(backend.system_calls(), 1);

    // The new timer's ticks do.
    dash.handle(Event::Tick(dash.poller().generation()));
    pump(&mut dash, IDLE);
    assert_eq!(backend.system_calls(), 2);
}

#[test]
fn teardown_cancels_the_timer() {
    let backend = Arc::new(FakeBackend::default());
    let mut dash = dashboard(&backend, 20);
    dash.init();
    dash.teardown();
    assert!(!dash.poller().is_armed());
    pump(&mut dash, Duration::from_millis(150));
    assert_eq!(backend.system_calls(), 1);
}

// ---------------------------------------------------------------------------
// Chat client
// ---------------------------------------------------------------------------

#[test]
fn whitespace_submission_appends_nothing() {
    let backend = Arc::new(FakeBackend::default());
    let mut dash = dashboard(&backend, LONG_INTERVAL);
    dash.init();

    dash.handle(Event::Submit("   \t ".to_string()));
    dash.handle(Event::Submit(String::new()));
    pump(&mut dash, IDLE);

    assert_eq!(dash.page().entry_count(), 0);
    assert!(backend.sent().is_empty());
    assert!(dash.page().input().enabled);
}

#[test]
fn message_of_2001_chars_is_rejected_and_2000_is_sent() {
    let backend = Arc::new(FakeBackend::default());
    backend.script_chat(Ok(ChatReply::Content("ok".to_string())));
    let mut dash = dashboard(&backend, LONG_INTERVAL);
    dash.init();

    dash.handle(Event::Submit("a".repeat(2001)));
    pump(&mut dash, IDLE);
    let notice = dash.page().last_entry().unwrap();
    assert_eq!(notice.format, Format::Notice);
    assert_eq!(notice.content, "Message too long (max 2000 characters)");
    assert!(backend.sent().is_empty());
    assert!(dash.page().input().enabled);

    dash.handle(Event::Submit("a".repeat(2000)));
    pump(&mut dash, IDLE);
    assert_eq!(backend.sent(), vec!["a".repeat(2000)]);
}

#[test]
fn one_loading_bubble_between_submit_and_reply() {
    let backend = Arc::new(FakeBackend::default());
    backend.script_chat(Ok(ChatReply::Content("Hashrate is **fine**.".to_string())));
    let mut dash = dashboard(&backend, LONG_INTERVAL);
    dash.init();
    pump(&mut dash, IDLE);

    dash.handle(Event::Submit("  how is the rig?  ".to_string()));
    assert_eq!(dash.page().loading_count(), 1);
    assert!(!dash.page().input().enabled);
    assert!(dash.chat().is_sending());

    // A second submission while sending is ignored.
    dash.handle(Event::Submit("again".to_string()));
    assert_eq!(dash.page().loading_count(), 1);

    assert!(pump_until(&mut dash, Duration::from_secs(2), |d| {
        !d.chat().is_sending()
    }));

    let page = dash.page();
    assert_eq!(page.loading_count(), 0);
    assert!(page.input().enabled);
    assert!(page.input().focused);
    assert_eq!(backend.sent(), vec!["how is the rig?".to_string()]);

    let entries: Vec<_> = page.entries().collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].sender, Sender::User);
    assert_eq!(entries[0].content, "how is the rig?");
    assert_eq!(entries[1].format, Format::Markdown);
    assert!(entries[1].to_html().contains("<strong>fine</strong>"));
}

#[test]
fn failure_removes_placeholder_and_shows_sanitized_error() {
    let backend = Arc::new(FakeBackend::default());
    backend.script_chat(Err(RequestError::Status {
        code: 500,
        message: "Failed to process <b>chat</b>\nrequest".to_string(),
    }));
    let mut dash = dashboard(&backend, LONG_INTERVAL);
    dash.init();

    dash.handle(Event::Submit("hi".to_string()));
    assert!(pump_until(&mut dash, Duration::from_secs(2), |d| {
        !d.chat().is_sending()
    }));

    let page = dash.page();
    assert_eq!(page.loading_count(), 0);
    assert!(page.input().enabled);
    let error = page.last_entry().unwrap();
    assert_eq!(error.format, Format::PlainText);
    assert_eq!(
        error.content,
        "Error: Failed to process <b>chat</b> request (HTTP 500)"
    );
    assert!(error.to_html().contains("&lt;b&gt;chat&lt;/b&gt;"));

    // The placeholder was removed before the error was appended.
    let changes = &dash.renderer().changes;
    let removed = changes
        .iter()
        .position(|c| matches!(c, Change::EntryRemoved(_)))
        .unwrap();
    let last_added = changes
        .iter()
        .rposition(|c| matches!(c, Change::EntryAdded(_)))
        .unwrap();
    assert!(removed < last_added);
}

#[test]
fn network_failure_keeps_form_usable() {
    let backend = Arc::new(FakeBackend::default());
    backend.script_chat(Err(RequestError::Transport("connection reset".to_string())));
    backend.script_chat(Ok(ChatReply::Content("back online".to_string())));
    let mut dash = dashboard(&backend, LONG_INTERVAL);
    dash.init();

    for message in ["first", "second"] {
        dash.handle(Event::Submit(message.to_string()));
        assert!(pump_until(&mut dash, Duration::from_secs(2), |d| {
            !d.chat().is_sending()
        }));
    }

    let contents: Vec<_> = dash.page().entries().map(|e| e.content.clone()).collect();
    assert_eq!(
        contents,
        vec![
            "first".to_string(),
            "Error: network error: connection reset".to_string(),
            "second".to_string(),
            "back online".to_string(),
        ]
    );
}

#[test]
fn script_content_is_rendered_as_escaped_text() {
    let backend = Arc::new(FakeBackend::default());
    backend.script_chat(Ok(ChatReply::Content(
        "Try <script>alert('x')</script> or [this](javascript:alert(1))".to_string(),
    )));
    let mut dash = dashboard(&backend, LONG_INTERVAL);
    dash.init();

    dash.handle(Event::Submit("show me something".to_string()));
    assert!(pump_until(&mut dash, Duration::from_secs(2), |d| {
        !d.chat().is_sending()
    }));

    let reply = dash.page().last_entry().unwrap();
    assert_eq!(reply.format, Format::PlainText);
    let html = reply.to_html();
    assert!(!html.contains("<script"));
    assert!(!html.contains("href="));
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn backend_error_and_unrecognized_replies() {
    let backend = Arc::new(FakeBackend::default());
    backend.script_chat(Ok(ChatReply::Error("AI client module not available".to_string())));
    backend.script_chat(Ok(ChatReply::Unrecognized));
    let mut dash = dashboard(&backend, LONG_INTERVAL);
    dash.init();

    for message in ["one", "two"] {
        dash.handle(Event::Submit(message.to_string()));
        assert!(pump_until(&mut dash, Duration::from_secs(2), |d| {
            !d.chat().is_sending()
        }));
    }

    let replies: Vec<_> = dash
        .page()
        .entries()
        .filter(|e| e.sender == Sender::Assistant)
        .map(|e| e.content.clone())
        .collect();
    assert_eq!(
        replies,
        vec![
            "Error: AI client module not available".to_string(),
            "Sorry, I did not understand that.".to_string(),
        ]
    );
}

#[test]
fn quit_ends_the_loop() {
    let backend = Arc::new(FakeBackend::default());
    let mut dash = dashboard(&backend, LONG_INTERVAL);
    let sender = dash.sender();
    sender.send(Event::Quit).unwrap();
    // run() returns once Quit is handled.
    dash.run();
    assert!(!dash.poller().is_armed());
}
