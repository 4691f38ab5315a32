//! Playback state machine: owns the current index and the auto-advance timer
//! for one session, from the first image until cancellation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PlaybackOptions;
use crate::error::Error;
use crate::image_set::{ImageEntry, ImageSet};
use crate::render::{Renderer, SharedRenderer};
use crate::transition::cross_fade;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Running,
}

/// Why a session returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Cancellation was observed.
    Stopped,
    /// Nothing playable at start; the session never reached `Running`.
    NoImages,
    /// A reload left the library empty.
    Emptied,
}

/// State the controller publishes to, and reads from, the outside world.
#[derive(Debug)]
pub struct PlaybackLink {
    status: watch::Sender<PlaybackStatus>,
    reload_generation: AtomicU64,
}

impl Default for PlaybackLink {
    fn default() -> Self {
        Self {
            status: watch::Sender::new(PlaybackStatus::Idle),
            reload_generation: AtomicU64::new(0),
        }
    }
}

impl PlaybackLink {
    pub fn status(&self) -> PlaybackStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status.subscribe()
    }

    /// Ask a running session to rebuild its image set at the next tick.
    pub fn request_reload(&self) {
        self.reload_generation.fetch_add(1, Ordering::AcqRel);
    }

    fn reload_generation(&self) -> u64 {
        self.reload_generation.load(Ordering::Acquire)
    }

    pub(crate) fn publish(&self, status: PlaybackStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            info!(?status, "playback status changed");
        }
    }
}

/// Index of the image after `current` in a set of `count`, wrapping.
#[must_use]
pub fn next_index(current: usize, count: usize) -> usize {
    if count == 0 { 0 } else { (current + 1) % count }
}

/// Current index plus the time it was shown. Lives only inside a session.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackState {
    current: usize,
    last_advance: Instant,
}

impl PlaybackState {
    pub fn new(now: Instant) -> Self {
        Self {
            current: 0,
            last_advance: now,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// The index to advance to, once `display` has elapsed since the last advance.
    pub fn due(&self, now: Instant, display: Duration, count: usize) -> Option<usize> {
        if count == 0 || now.duration_since(self.last_advance) < display {
            return None;
        }
        Some(next_index(self.current, count))
    }

    pub fn advance_to(&mut self, index: usize, now: Instant) {
        self.current = index;
        self.last_advance = now;
    }

    /// Move to `index` after a reload without restarting the display timer.
    pub fn rebase(&mut self, index: usize) {
        self.current = index;
    }
}

/// Where the image that was showing before a reload ends up in `fresh`: the
/// same file if it survived, otherwise the old index clamped to the new count.
fn reconcile_index<S>(fresh: &ImageSet<S>, shown: &str, previous: usize) -> usize {
    fresh
        .position(shown)
        .unwrap_or_else(|| previous.min(fresh.count().saturating_sub(1)))
}

async fn show<R: Renderer>(
    renderer: &SharedRenderer<R>,
    entry: &ImageEntry<R::Surface>,
    background: [u8; 3],
) {
    let frame = entry.clone();
    let res = renderer
        .run(move |r| {
            r.clear(background);
            r.draw(&frame.surface, frame.placement, 255)?;
            r.present()
        })
        .await;
    match res {
        Ok(()) => debug!(name = %entry.name, "displayed image"),
        Err(err) => warn!(name = %entry.name, error = %err, "failed to display image"),
    }
}

async fn show_idle<R: Renderer>(renderer: &SharedRenderer<R>, background: [u8; 3]) {
    let res = renderer
        .run(move |r| {
            r.clear(background);
            r.present()
        })
        .await;
    if let Err(err) = res {
        warn!(error = %err, "failed to present idle frame");
    }
}

/// Decode the library on the render worker.
async fn load_set<R: Renderer>(
    renderer: &SharedRenderer<R>,
    opts: &PlaybackOptions,
) -> Result<ImageSet<R::Surface>, Error> {
    let (library, ext, size) = (opts.library.clone(), opts.extension.clone(), opts.image_size);
    renderer
        .run(move |r| Ok(ImageSet::load(r, &library, &ext, size)))
        .await?
}

/// Run one playback session until `cancel` fires or nothing is left to show.
///
/// Loads the image set, shows the first image and then wakes every
/// `poll_interval` to check for cancellation, pending reloads and the
/// auto-advance timer. Leaves the idle placeholder on screen and the status
/// at [`PlaybackStatus::Idle`] on return.
///
/// Every `Ok` return leaves `cancel` cancelled before the status goes back to
/// idle, so whoever launched the session can use the token as its liveness flag.
pub async fn run_session<R: Renderer>(
    renderer: &SharedRenderer<R>,
    opts: &PlaybackOptions,
    link: &PlaybackLink,
    cancel: &CancellationToken,
) -> Result<SessionEnd> {
    let mut seen_generation = link.reload_generation();
    let mut set = match load_set(renderer, opts).await {
        Ok(set) if cancel.is_cancelled() => {
            debug!(count = set.count(), "stopped while loading; nothing shown");
            return Ok(SessionEnd::Stopped);
        }
        Ok(set) if set.is_empty() => {
            warn!(dir = %opts.library.display(), "no images found; staying idle");
            cancel.cancel();
            return Ok(SessionEnd::NoImages);
        }
        Ok(set) => set,
        Err(err) => {
            warn!(error = %err, "cannot load image library; staying idle");
            cancel.cancel();
            return Ok(SessionEnd::NoImages);
        }
    };

    let mut state = PlaybackState::new(Instant::now());
    show(renderer, set.at(0)?, opts.background).await;
    link.publish(PlaybackStatus::Running);
    info!(count = set.count(), "starting playback loop");

    let mut ticker = interval(opts.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let end = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break SessionEnd::Stopped,
            _ = ticker.tick() => {}
        }

        let generation = link.reload_generation();
        if generation != seen_generation {
            seen_generation = generation;
            let shown = set.at(state.current())?.name.clone();
            let reloaded = load_set(renderer, opts).await;
            if cancel.is_cancelled() {
                break SessionEnd::Stopped;
            }
            match reloaded {
                Ok(fresh) if fresh.is_empty() => {
                    warn!("library is empty after reload; stopping playback");
                    break SessionEnd::Emptied;
                }
                Ok(fresh) => {
                    let index = reconcile_index(&fresh, &shown, state.current());
                    set = fresh;
                    state.rebase(index);
                    let entry = set.at(index)?;
                    if entry.name != shown {
                        show(renderer, entry, opts.background).await;
                    }
                    info!(count = set.count(), index, "reloaded image set");
                }
                Err(err) => warn!(error = %err, "reload failed; keeping current images"),
            }
        }

        let now = Instant::now();
        if let Some(next) = state.due(now, opts.display_duration, set.count()) {
            if next != state.current() {
                let from = set.at(state.current())?;
                let to = set.at(next)?;
                match cross_fade(renderer, from, to, &opts.transition, cancel).await {
                    Ok(outcome) => debug!(?outcome, "transition finished"),
                    Err(err) => warn!(error = %err, "transition failed to present final frame"),
                }
                info!(index = next, name = %to.name, "set image");
            }
            state.advance_to(next, now);
        }
    };

    show_idle(renderer, opts.background).await;
    cancel.cancel();
    link.publish(PlaybackStatus::Idle);
    info!(?end, "playback loop stopped");
    Ok(end)
}
