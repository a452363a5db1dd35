//! livefeed — live-updating news headlines in the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐  PollMsg   ┌───────────────────────┐  draw()  ┌──────────┐
//! │  poll.rs │ ─────────► │        app.rs         │ ───────► │  ui.rs   │
//! │ (thread) │  (channel) │ Page + LiveFeedUpdater│          │ (render) │
//! └──────────┘            └───────────────────────┘          └──────────┘
//!                                     ▲
//!                                     │ handle_key_event()
//!                                ┌──────────┐
//!                                │ input.rs │
//!                                └──────────┘
//! ```
//!
//! * **`source/`** — the `FeedSource` trait, the payload types, and the HTTP
//!   endpoint implementation.
//! * **`page`** — the rendered document: one section per news source.
//! * **`updater`** — merges payloads into the page and keeps the seen and
//!   read link sets.
//! * **`storage`** — persistent key/value store behind those sets.
//! * **`notify`** — chime and toast raised when new articles arrive.
//! * **`poll`** — spawns a background thread that fetches on a timer.
//! * **`config`** — command-line / environment configuration.
//! * **`app`** — owns all application state.
//! * **`ui`** — pure rendering: reads `App` state and draws widgets.
//! * **`input`** — maps key events to `App` mutations.
//! * **`main`** — wires everything together: parse args, set up logging and
//!   the terminal, and run the event loop.

mod app;
mod config;
mod input;
mod notify;
mod page;
mod poll;
mod source;
mod storage;
mod ui;
mod updater;

use std::fs::{self, OpenOptions};
use std::io;
use std::sync::{mpsc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

use app::App;
use config::{Cli, Config};
use notify::{Chime, TerminalBell};
use page::{Page, SourceSpec};
use poll::PollMsg;
use source::HttpFeed;
use storage::FileStorage;
use updater::LiveFeedUpdater;

// ---------------------------------------------------------------------------
// RAII terminal guard — idiomatic cleanup even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before the panic message is printed.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

/// Send tracing output to `config.log_path`; the terminal belongs to the UI.
fn init_tracing(config: &Config) -> Result<()> {
    if let Some(dir) = config.log_path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
        .with_context(|| format!("failed to open log file {}", config.log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    install_panic_hook();

    // -- configuration -------------------------------------------------------
    let config = Config::from_cli(Cli::parse())?;
    init_tracing(&config)?;
    info!(
        fetch_url = %config.fetch_url,
        interval = ?config.poll_interval,
        detail_url = %config.detail_url,
        "livefeed starting up"
    );

    // -- page, storage, updater ----------------------------------------------
    let storage = FileStorage::open(&config.storage_path);
    info!(path = %storage.path().display(), "opened storage");
    let updater = LiveFeedUpdater::new(
        SourceSpec::defaults(),
        &config.detail_url,
        config.origin.clone(),
        storage,
    );
    let page = Page::for_sources(updater.sources());
    let chime: Option<Box<dyn Chime>> = if config.sound {
        Some(Box::new(TerminalBell))
    } else {
        None
    };
    let mut app = App::new(page, updater, chime);

    // -- start background polling --------------------------------------------
    let rx: Option<mpsc::Receiver<PollMsg>> = if config.polling_enabled() {
        let feed = HttpFeed::new(&config.fetch_url)?;
        Some(poll::spawn(Box::new(feed), config.poll_interval))
    } else {
        warn!("Live update endpoint is not configured.");
        app.status = "Live updates disabled (no --fetch-url)".into();
        None
    };

    // -- terminal setup (RAII — Drop restores on exit or panic) --------------
    let mut guard = TerminalGuard::new()?;

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Drain any messages from the poller.
    //   2. Open any link the user activated.
    //   3. Render the UI.
    //   4. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        let now = Instant::now();

        // 1. Process poll messages
        if let Some(rx) = &rx {
            while let Ok(msg) = rx.try_recv() {
                app.handle_poll(msg, now);
            }
        }
        app.tick(now);

        // 2. Open links
        if let Some(target) = app.take_pending_open() {
            info!(url = %target, "opening article");
            if let Err(e) = open::that(&target) {
                warn!(url = %target, error = %e, "failed to open article");
                app.status = format!("Could not open {target}");
            }
        }

        // 3. Render
        guard.terminal.draw(|f| ui::draw(&mut app, f, now))?;

        // 4. Handle input
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            break;
        }
    }

    info!("livefeed shutting down");
    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
