//! New-article notification: a chime plus a transient toast.
//!
//! The toast follows a fixed timeline measured from the moment it was
//! raised:
//!
//! ```text
//! 0 ms ── slide in ── 300 ms ── visible ── 3000 ms ── slide out ── 3300 ms (gone)
//! ```
//!
//! [`crate::ui`] asks each live toast for its [`ToastPhase`] every frame and
//! offsets it horizontally while it slides.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::Result;

const SLIDE: Duration = Duration::from_millis(300);
const VISIBLE_UNTIL: Duration = Duration::from_millis(3000);
const REMOVE_AT: Duration = Duration::from_millis(3300);

/// Something that can make a short attention sound.
pub trait Chime {
    fn play(&mut self) -> Result<()>;
}

/// Rings the terminal bell.
pub struct TerminalBell;

impl Chime for TerminalBell {
    fn play(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(b"\x07")?;
        stdout.flush()?;
        Ok(())
    }
}

/// The toast text for `count` new articles.
pub fn new_articles_message(count: usize) -> String {
    let plural = if count > 1 { "s" } else { "" };
    format!("{count} new article{plural} available!")
}

/// Where a toast is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToastPhase {
    /// Entering from the right; `progress` runs 0.0 → 1.0.
    SlidingIn { progress: f32 },
    Visible,
    /// Leaving to the right; `progress` runs 0.0 → 1.0.
    SlidingOut { progress: f32 },
    Expired,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    raised_at: Instant,
}

impl Toast {
    pub fn new(message: String, raised_at: Instant) -> Self {
        Self { message, raised_at }
    }

    pub fn phase(&self, now: Instant) -> ToastPhase {
        let age = now.saturating_duration_since(self.raised_at);
        if age < SLIDE {
            ToastPhase::SlidingIn {
                progress: age.as_secs_f32() / SLIDE.as_secs_f32(),
            }
        } else if age < VISIBLE_UNTIL {
            ToastPhase::Visible
        } else if age < REMOVE_AT {
            ToastPhase::SlidingOut {
                progress: (age - VISIBLE_UNTIL).as_secs_f32() / SLIDE.as_secs_f32(),
            }
        } else {
            ToastPhase::Expired
        }
    }

    /// Columns the toast is pushed right of its resting place, given its
    /// rendered `width`.
    pub fn offset(&self, now: Instant, width: u16) -> u16 {
        let hidden = match self.phase(now) {
            ToastPhase::SlidingIn { progress } => 1.0 - progress,
            ToastPhase::Visible => 0.0,
            ToastPhase::SlidingOut { progress } => progress,
            ToastPhase::Expired => 1.0,
        };
        (f32::from(width) * hidden).round() as u16
    }
}

/// The stack of live toasts, oldest first.
#[derive(Debug, Default)]
pub struct Toasts {
    toasts: Vec<Toast>,
}

impl Toasts {
    pub fn push(&mut self, toast: Toast) {
        self.toasts.push(toast);
    }

    /// Drop toasts whose timeline has run out.
    pub fn prune(&mut self, now: Instant) {
        self.toasts
            .retain(|toast| toast.phase(now) != ToastPhase::Expired);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

/// Tell the user `count` new articles arrived.
///
/// A chime failure is logged and otherwise ignored; the toast is raised
/// regardless.
pub fn announce(count: usize, chime: Option<&mut dyn Chime>, toasts: &mut Toasts, now: Instant) {
    if count == 0 {
        return;
    }

    if let Some(chime) = chime {
        if let Err(e) = chime.play() {
            tracing::info!(error = %e, "notification sound could not be played");
        }
    }

    let message = new_articles_message(count);
    tracing::info!(count, "announcing new articles");
    toasts.push(Toast::new(message, now));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingChime {
        plays: usize,
        fail: bool,
    }

    impl Chime for CountingChime {
        fn play(&mut self) -> Result<()> {
            self.plays += 1;
            if self.fail {
                anyhow::bail!("autoplay blocked");
            }
            Ok(())
        }
    }

    #[test]
    fn message_is_pluralised() {
        assert_eq!(new_articles_message(1), "1 new article available!");
        assert_eq!(new_articles_message(2), "2 new articles available!");
        assert_eq!(new_articles_message(17), "17 new articles available!");
    }

    #[test]
    fn toast_timeline() {
        let start = Instant::now();
        let toast = Toast::new("x".into(), start);

        assert!(matches!(toast.phase(start), ToastPhase::SlidingIn { .. }));
        assert_eq!(toast.phase(start + Duration::from_millis(300)), ToastPhase::Visible);
        assert_eq!(toast.phase(start + Duration::from_millis(2999)), ToastPhase::Visible);
        assert!(matches!(
            toast.phase(start + Duration::from_millis(3100)),
            ToastPhase::SlidingOut { .. }
        ));
        assert_eq!(toast.phase(start + Duration::from_millis(3300)), ToastPhase::Expired);
    }

    #[test]
    fn toast_offset_slides_in_and_out() {
        let start = Instant::now();
        let toast = Toast::new("x".into(), start);

        assert_eq!(toast.offset(start, 30), 30);
        assert_eq!(toast.offset(start + Duration::from_millis(150), 30), 15);
        assert_eq!(toast.offset(start + Duration::from_secs(1), 30), 0);
        assert_eq!(toast.offset(start + Duration::from_millis(3150), 30), 15);
    }

    #[test]
    fn prune_removes_expired_toasts() {
        let start = Instant::now();
        let mut toasts = Toasts::default();
        toasts.push(Toast::new("old".into(), start));
        toasts.push(Toast::new("new".into(), start + Duration::from_secs(2)));

        toasts.prune(start + Duration::from_millis(3500));

        let left: Vec<_> = toasts.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(left, vec!["new"]);
    }

    #[test]
    fn announce_plays_chime_and_raises_toast() {
        let mut chime = CountingChime { plays: 0, fail: false };
        let mut toasts = Toasts::default();

        announce(3, Some(&mut chime), &mut toasts, Instant::now());

        assert_eq!(chime.plays, 1);
        assert_eq!(toasts.iter().next().unwrap().message, "3 new articles available!");
    }

    #[test]
    fn announce_survives_chime_failure() {
        let mut chime = CountingChime { plays: 0, fail: true };
        let mut toasts = Toasts::default();

        announce(1, Some(&mut chime), &mut toasts, Instant::now());

        assert_eq!(chime.plays, 1);
        assert!(!toasts.is_empty(), "toast is still shown");
    }

    #[test]
    fn announce_zero_does_nothing() {
        let mut chime = CountingChime { plays: 0, fail: false };
        let mut toasts = Toasts::default();

        announce(0, Some(&mut chime), &mut toasts, Instant::now());

        assert_eq!(chime.plays, 0);
        assert!(toasts.is_empty());
    }

    #[test]
    fn announce_without_chime_still_toasts() {
        let mut toasts = Toasts::default();
        announce(2, None, &mut toasts, Instant::now());
        assert!(!toasts.is_empty());
    }
}
