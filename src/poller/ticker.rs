//! A cancellable repeating timer on its own thread.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Calls `on_tick` once per period until cancelled.
///
/// Cancelling (or dropping) the handle wakes the thread immediately and
/// joins it, so no tick fires after [`Ticker::cancel`] returns. Ticks that
/// would have fired while the timer was cancelled are simply lost.
#[derive(Debug)]
pub struct Ticker {
    cancel: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Start ticking. `on_tick` returning `false` stops the timer, which is
    /// how it notices that nobody is listening any more.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            loop {
                match cancel_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {
                        if !on_tick() {
                            break;
                        }
                    }
                    // Explicit cancel or the handle was dropped.
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Self {
            cancel: Some(cancel_tx),
            handle: Some(handle),
        }
    }

    /// Stop the timer and wait for its thread to exit.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
