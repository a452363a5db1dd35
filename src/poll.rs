//! Background polling of the live-update endpoint.
//!
//! Runs on a dedicated thread: one fetch immediately, then one per interval,
//! each result sent to the UI thread over an [`mpsc`] channel.  The UI
//! thread owns the page and does all reconciliation, so the poller never
//! touches shared state.
//!
//! ## For contributors
//!
//! Fetches are sequential on the one thread, so two cycles never overlap.
//! A failed fetch is reported and the next tick simply tries again; there is
//! no backoff.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::source::{FeedPayload, FeedSource};

/// Messages sent from the poller thread to the UI thread.
#[derive(Debug)]
pub enum PollMsg {
    /// A successful fetch returned this payload.
    Payload(FeedPayload),
    /// A fetch failed with this error description.
    Error(String),
}

/// Spawn the background polling thread.
///
/// With `interval == None` only the initial fetch is made.  Returns a
/// receiver that the main loop should drain on every tick; the thread stops
/// once that receiver is dropped.
pub fn spawn(source: Box<dyn FeedSource>, interval: Option<Duration>) -> mpsc::Receiver<PollMsg> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || loop {
        let msg = match source.fetch() {
            Ok(payload) => PollMsg::Payload(payload),
            Err(e) => PollMsg::Error(format!("{}: {e:#}", source.name())),
        };
        // If the receiver is gone the main thread has exited;
        // silently stop polling.
        if tx.send(msg).is_err() {
            return;
        }

        match interval {
            Some(interval) => thread::sleep(interval),
            None => return,
        }
    });

    rx
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
