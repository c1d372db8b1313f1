//! The dashboard controller.
//!
//! Owns the [`Page`], the [`StatsPoller`], the [`ChatClient`] and the event
//! channel everything reports into. [`Dashboard::run`] drains that channel
//! on the calling thread, so page state never needs a lock.

mod event;

pub use event::{Event, Flow};

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crate::activity::{ActivityLog, Source};
use crate::api::{Backend, ChatReply, RequestError};
use crate::chat::{ChatClient, Rejection};
use crate::config::MinerdashConfig;
use crate::page::{Change, Page, Renderer};
use crate::poller::StatsPoller;

pub struct Dashboard<R: Renderer> {
    page: Page,
    renderer: R,
    poller: StatsPoller,
    chat: ChatClient,
    backend: Arc<dyn Backend>,
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
    log: ActivityLog,
    running: bool,
}

impl<R: Renderer> Dashboard<R> {
    pub fn new(
        config: &MinerdashConfig,
        backend: Arc<dyn Backend>,
        renderer: R,
        log: ActivityLog,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let poller = StatsPoller::new(
            &config.poller,
            Arc::clone(&backend),
            events_tx.clone(),
            log.clone(),
        );

        Self {
            page: Page::new(),
            renderer,
            poller,
            chat: ChatClient::new(&config.chat),
            backend,
            events_tx,
            events_rx,
            log,
            running: false,
        }
    }

    /// A handle for feeding events in from other threads (e.g. the input
    /// reader).
    pub fn sender(&self) -> Sender<Event> {
        self.events_tx.clone()
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn poller(&self) -> &StatsPoller {
        &self.poller
    }

    pub fn chat(&self) -> &ChatClient {
        &self.chat
    }

    /// Paint the initial page, arm the poller and fetch stats immediately.
    pub fn init(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.paint(Change::Input);
        self.poller.start();
    }

    /// Cancel the poll timer. Safe to call more than once.
    pub fn teardown(&mut self) {
        self.poller.stop();
        self.running = false;
    }

    /// Run until a [`Event::Quit`] arrives.
    pub fn run(&mut self) {
        self.init();
        while let Ok(event) = self.events_rx.recv() {
            if self.handle(event) == Flow::Quit {
                break;
            }
        }
        self.teardown();
    }

    /// Wait up to `timeout` for the next event and handle it.
    ///
    /// Returns `None` when nothing arrived in time.
    pub fn step(&mut self, timeout: Duration) -> Option<Flow> {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => Some(self.handle(event)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Apply one event to the page.
    pub fn handle(&mut self, event: Event) -> Flow {
        match event {
            Event::Tick(generation) => {
                // Ticks from a cancelled timer may still be queued.
                if self.poller.is_current(generation) {
                    self.poller.on_tick();
                }
            }
            Event::Stats {
                group,
                result,
                latency_ms,
            } => {
                if let Some(change) = self.poller.apply(&mut self.page, group, result, latency_ms)
                {
                    self.paint(change);
                }
            }
            Event::Submit(raw) => self.submit(&raw),
            Event::ChatSettled(outcome) => self.settle(outcome),
            Event::Visibility(visible) => {
                if let Some(change) = self.page.set_visible(visible) {
                    self.poller.set_visible(visible);
                    self.paint(change);
                }
            }
            Event::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn submit(&mut self, raw: &str) {
        let submission = self.chat.submit(&mut self.page, raw);
        self.paint_all(submission.changes);

        match (submission.send, submission.rejection) {
            (Some(message), _) => self.send_chat(message),
            (None, Some(rejection @ Rejection::TooLong { .. })) => {
                self.log
                    .record(Source::Chat, "rejected", &rejection.to_string(), None);
            }
            _ => {}
        }
    }

    fn send_chat(&self, message: String) {
        let backend = Arc::clone(&self.backend);
        let events = self.events_tx.clone();
        thread::spawn(move || {
            let outcome = backend.chat(&message);
            let _ = events.send(Event::ChatSettled(outcome));
        });
    }

    fn settle(&mut self, outcome: Result<ChatReply, RequestError>) {
        let settlement = self.chat.settle(&mut self.page, &outcome);
        if settlement.changes.is_empty() {
            return;
        }

        match &outcome {
            Ok(ChatReply::Content(_)) => self.log.ok(Source::Chat, "reply", settlement.latency_ms),
            Ok(ChatReply::Error(error)) => {
                self.log
                    .error(Source::Chat, &format!("backend: {error}"), settlement.latency_ms)
            }
            Ok(ChatReply::Unrecognized) => {
                self.log
                    .error(Source::Chat, "unrecognized reply", settlement.latency_ms)
            }
            Err(error) => self.log.error(
                Source::Chat,
                &format!("{}: {error}", error.kind()),
                settlement.latency_ms,
            ),
        }

        self.paint_all(settlement.changes);
    }

    fn paint(&mut self, change: Change) {
        self.renderer.paint(&self.page, &change);
    }

    fn paint_all(&mut self, changes: Vec<Change>) {
        for change in changes {
            self.paint(change);
        }
    }
}

impl<R: Renderer> Drop for Dashboard<R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
