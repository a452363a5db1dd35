//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through a `LIVEFEED_*` variable.
//! Values are taken as plain strings and validated here rather than by
//! `clap`, because a bad value falls back to a default instead of aborting.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use url::Url;

/// Poll interval used when none (or garbage) is configured.
pub const DEFAULT_FETCH_INTERVAL_MS: i64 = 80_000;

const FALLBACK_ORIGIN: &str = "http://localhost/";

/// Command-line arguments.
///
/// ```sh
/// livefeed --fetch-url http://localhost:8000/fetch-latest/ \
///          --detail-url /news-detail/ --fetch-interval 60000
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Endpoint returning the latest headlines as JSON; empty disables polling
    #[arg(long, env = "LIVEFEED_FETCH_URL", default_value = "")]
    pub fetch_url: String,

    /// Poll interval in milliseconds; zero or less fetches once
    #[arg(long, env = "LIVEFEED_FETCH_INTERVAL", allow_hyphen_values = true)]
    pub fetch_interval: Option<String>,

    /// Detail-view path that internal articles link to; empty keeps raw links
    #[arg(long, env = "LIVEFEED_DETAIL_URL", default_value = "")]
    pub detail_url: String,

    /// File holding the seen and read link sets
    #[arg(long, env = "LIVEFEED_STORAGE")]
    pub storage: Option<PathBuf>,

    /// Log file (the terminal itself is taken by the UI)
    #[arg(long, env = "LIVEFEED_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Do not ring the terminal bell on new articles
    #[arg(long)]
    pub no_sound: bool,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Empty when polling is disabled.
    pub fetch_url: String,
    /// `None` when only the initial fetch should run.
    pub poll_interval: Option<Duration>,
    pub detail_url: String,
    /// Origin the site is served from; relative links resolve against it.
    pub origin: Url,
    pub storage_path: PathBuf,
    pub log_path: PathBuf,
    pub sound: bool,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let interval_ms = parse_interval(cli.fetch_interval.as_deref());
        let poll_interval = u64::try_from(interval_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        let storage_path = cli.storage.unwrap_or_else(default_storage_path);
        let log_path = cli.log_file.unwrap_or_else(|| {
            storage_path
                .parent()
                .map(|dir| dir.join("livefeed.log"))
                .unwrap_or_else(|| PathBuf::from("livefeed.log"))
        });

        Ok(Self {
            origin: origin_of(&cli.fetch_url)?,
            fetch_url: cli.fetch_url.trim().to_string(),
            poll_interval,
            detail_url: cli.detail_url.trim().to_string(),
            storage_path,
            log_path,
            sound: !cli.no_sound,
        })
    }

    pub fn polling_enabled(&self) -> bool {
        !self.fetch_url.is_empty()
    }
}

/// Parse an interval the lenient way: leading whitespace, an optional sign,
/// then digits; anything after the digits is ignored.  No digits at all
/// yields [`DEFAULT_FETCH_INTERVAL_MS`].
pub fn parse_interval(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else {
        return DEFAULT_FETCH_INTERVAL_MS;
    };

    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return DEFAULT_FETCH_INTERVAL_MS;
    }

    let magnitude = rest[..digits_len].parse::<i64>().unwrap_or(i64::MAX);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// The origin of `fetch_url`, or `http://localhost/` when it has none.
pub fn origin_of(fetch_url: &str) -> Result<Url> {
    let origin = Url::parse(fetch_url.trim())
        .ok()
        .filter(Url::has_host)
        .map(|url| url.origin().ascii_serialization())
        .filter(|origin| origin != "null")
        .unwrap_or_else(|| FALLBACK_ORIGIN.to_string());

    Url::parse(&origin).with_context(|| format!("invalid origin {origin}"))
}

fn default_storage_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("livefeed").join("storage.json"))
        .unwrap_or_else(|| PathBuf::from("livefeed-storage.json"))
}
