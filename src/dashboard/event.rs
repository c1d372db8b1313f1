use serde_json::Value;

use crate::api::{ChatReply, RequestError};
use crate::stats::StatsGroup;

/// Everything that can wake the dashboard loop.
///
/// Timers, request workers and the input reader only ever *send* these;
/// the page itself is touched solely by the thread draining the channel.
#[derive(Debug)]
pub enum Event {
    /// The poll timer fired. Carries the generation of the timer that sent
    /// it, see [`crate::poller::StatsPoller::generation`].
    Tick(u64),
    /// A stats request finished.
    Stats {
        group: StatsGroup,
        result: Result<Value, RequestError>,
        latency_ms: u64,
    },
    /// The chat form was submitted with this raw text.
    Submit(String),
    /// The in-flight chat request finished.
    ChatSettled(Result<ChatReply, RequestError>),
    /// The page became visible (`true`) or hidden (`false`).
    Visibility(bool),
    Quit,
}

/// Whether the loop should keep going after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}
