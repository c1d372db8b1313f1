//! Stats poller: refreshes the system and mining panels on a fixed period.
//!
//! Each refresh fires two independent requests on worker threads. Results
//! come back to the dashboard loop as [`Event::Stats`] and are applied with
//! [`StatsPoller::apply`]. Failures only reach the activity log; the panel
//! keeps its previous readings.
//!
//! While the page is hidden the timer is cancelled outright. Showing the
//! page re-arms it; the next refresh happens on the first tick, with no
//! catch-up for ticks missed while hidden.

pub mod ticker;

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::activity::{ActivityLog, Source};
use crate::api::{Backend, RequestError};
use crate::config::schema::PollerConfig;
use crate::dashboard::Event;
use crate::page::{Change, Page};
use crate::stats::{self, StatsGroup};

use ticker::Ticker;

pub struct StatsPoller {
    backend: Arc<dyn Backend>,
    events: Sender<Event>,
    interval: Duration,
    pause_when_hidden: bool,
    ticker: Option<Ticker>,
    generation: u64,
    log: ActivityLog,
}

impl StatsPoller {
    pub fn new(
        config: &PollerConfig,
        backend: Arc<dyn Backend>,
        events: Sender<Event>,
        log: ActivityLog,
    ) -> Self {
        Self {
            backend,
            events,
            interval: config.interval(),
            pause_when_hidden: config.pause_when_hidden,
            ticker: None,
            generation: 0,
            log,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arm the timer and refresh immediately.
    pub fn start(&mut self) {
        self.arm();
        self.fetch_now();
    }

    /// Cancel the timer. Requests already in flight still report back.
    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.ticker.is_some()
    }

    /// Bumped every time the timer is armed. Ticks carry the value current
    /// when their timer was armed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a tick of `generation` comes from the running timer.
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_armed() && generation == self.generation
    }

    /// React to the page being shown or hidden.
    pub fn set_visible(&mut self, visible: bool) {
        if !self.pause_when_hidden {
            return;
        }
        if visible {
            self.arm();
            self.log.record(Source::Poller, "resumed", "page visible", None);
        } else {
            self.stop();
            self.log.record(Source::Poller, "paused", "page hidden", None);
        }
    }

    /// A timer tick: refresh both panels.
    pub fn on_tick(&self) {
        self.fetch_now();
    }

    /// Fire both stats requests without waiting for either.
    pub fn fetch_now(&self) {
        self.spawn_fetch(StatsGroup::System);
        self.spawn_fetch(StatsGroup::Mining);
    }

    /// Apply a finished stats request to the page.
    ///
    /// Only numeric fields are written. Returns the change to paint, if any
    /// field's text actually changed.
    pub fn apply(
        &self,
        page: &mut Page,
        group: StatsGroup,
        result: Result<Value, RequestError>,
        latency_ms: u64,
    ) -> Option<Change> {
        let source = log_source(group);
        match result {
            Ok(payload) => {
                let change = match group {
                    StatsGroup::System => Self::apply_system(page, &payload),
                    StatsGroup::Mining => Self::apply_miner(page, &payload),
                };
                let detail = match &change {
                    Some(Change::Fields(_, fields)) => format!("{} field(s) changed", fields.len()),
                    _ => "no change".to_string(),
                };
                self.log.ok(source, &detail, Some(latency_ms));
                change
            }
            Err(error) => {
                self.log.error(
                    source,
                    &format!("{}: {error}", error.kind()),
                    Some(latency_ms),
                );
                None
            }
        }
    }

    /// Write the numeric fields of a system stats payload into the page.
    pub fn apply_system(page: &mut Page, payload: &Value) -> Option<Change> {
        page.set_fields(
            StatsGroup::System,
            stats::updates(StatsGroup::System, payload),
        )
    }

    /// Write the numeric fields of a miner stats payload into the page.
    pub fn apply_miner(page: &mut Page, payload: &Value) -> Option<Change> {
        page.set_fields(
            StatsGroup::Mining,
            stats::updates(StatsGroup::Mining, payload),
        )
    }

    fn arm(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        self.generation += 1;
        let generation = self.generation;
        let events = self.events.clone();
        self.ticker = Some(Ticker::spawn(self.interval, move || {
            events.send(Event::Tick(generation)).is_ok()
        }));
    }

    fn spawn_fetch(&self, group: StatsGroup) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        thread::spawn(move || {
            let started = Instant::now();
            let result = match group {
                StatsGroup::System => backend.system_stats(),
                StatsGroup::Mining => backend.miner_stats(),
            };
            let latency_ms = started.elapsed().as_millis() as u64;
            // The dashboard may have shut down; nothing to do then.
            let _ = events.send(Event::Stats {
                group,
                result,
                latency_ms,
            });
        });
    }
}

impl Drop for StatsPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn log_source(group: StatsGroup) -> Source {
    match group {
        StatsGroup::System => Source::SystemStats,
        StatsGroup::Mining => Source::MinerStats,
    }
}
