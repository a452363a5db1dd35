//! Feed endpoint abstraction layer.
//!
//! This module defines the [`FeedSource`] trait and the payload types it
//! produces.  The only concrete implementation is [`HttpFeed`], which asks
//! the site's live-update endpoint for the latest headlines of every source
//! at once.
//!
//! ## For contributors — adding a new endpoint kind
//!
//! 1. Create a new file in this directory (e.g. `file.rs`).
//! 2. Define a struct and implement [`FeedSource`] for it.
//! 3. Add `mod file;` below and re-export your struct.
//! 4. Construct it in `main.rs` and hand it to [`crate::poll::spawn`].
//!
//! Reconciliation, persistence, and the UI never see where a payload came
//! from.

mod article;
mod http;

pub use article::{Article, FeedPayload};
pub use http::HttpFeed;

use anyhow::Result;

/// Anything that can produce a [`FeedPayload`] on demand.
///
/// The polling loop calls [`fetch()`](FeedSource::fetch) periodically on a
/// background thread, so implementations must be [`Send`].
pub trait FeedSource: Send {
    /// Human-readable label used in log lines and status messages.
    fn name(&self) -> &str;

    /// Fetch the latest payload.
    ///
    /// Any failure (transport, HTTP status, body parsing) is returned as an
    /// error; the poller reports it and tries again on the next tick.
    fn fetch(&self) -> Result<FeedPayload>;
}
