//! Thread-safe start/stop handshake between control surfaces and the
//! playback task.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::config::PlaybackOptions;
use crate::controller::{PlaybackLink, PlaybackStatus, SessionEnd, run_session};
use crate::render::{Renderer, SharedRenderer};

#[derive(Default)]
struct ControlSignal {
    /// Token of the most recently launched session. It is cancelled once a
    /// stop is requested or the session ends by itself, so a live token means
    /// "running".
    cancel: Option<CancellationToken>,
    /// Launched sessions, kept so shutdown can wait for them.
    tasks: Vec<JoinHandle<()>>,
    /// Set by shutdown; no session is launched afterwards.
    closed: bool,
}

impl ControlSignal {
    fn running(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| !c.is_cancelled())
    }
}

struct Inner<R> {
    renderer: SharedRenderer<R>,
    /// Held for a whole session: a new session waits here until the previous
    /// one has put up the idle frame.
    session: AsyncMutex<()>,
    opts: PlaybackOptions,
    link: PlaybackLink,
    signal: Mutex<ControlSignal>,
    runtime: Handle,
}

/// Shared handle used by every control surface to drive playback.
///
/// Cloning is cheap; all clones talk to the same playback session.
pub struct ControlBridge<R: Renderer> {
    inner: Arc<Inner<R>>,
}

impl<R: Renderer> Clone for ControlBridge<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R: Renderer> ControlBridge<R> {
    /// Sessions are spawned onto `runtime`, so the bridge may be driven from
    /// threads that are not part of it.
    pub fn new(renderer: R, opts: PlaybackOptions, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                renderer: SharedRenderer::new(renderer),
                session: AsyncMutex::new(()),
                opts,
                link: PlaybackLink::default(),
                signal: Mutex::new(ControlSignal::default()),
                runtime,
            }),
        }
    }

    /// Launch a playback session unless one is already running.
    ///
    /// Returns whether a session was launched.
    pub fn request_start(&self) -> bool {
        let mut signal = self.inner.signal.lock();
        self.start_locked(&mut signal)
    }

    /// Signal the running session to stop. Does not wait for it.
    ///
    /// Returns whether a stop was signalled.
    pub fn request_stop(&self) -> bool {
        let signal = self.inner.signal.lock();
        Self::stop_locked(&signal)
    }

    /// Start when idle, stop when running, as one step.
    pub fn toggle(&self) -> bool {
        let mut signal = self.inner.signal.lock();
        if signal.running() {
            Self::stop_locked(&signal)
        } else {
            self.start_locked(&mut signal)
        }
    }

    fn start_locked(&self, signal: &mut ControlSignal) -> bool {
        if signal.closed {
            debug!("start requested after shutdown; ignoring");
            return false;
        }
        if signal.running() {
            debug!("start requested while running; ignoring");
            return false;
        }
        let cancel = CancellationToken::new();
        signal.cancel = Some(cancel.clone());
        signal.tasks.retain(|task| !task.is_finished());
        let task = self
            .inner
            .runtime
            .spawn(playback_task(self.inner.clone(), cancel));
        signal.tasks.push(task);
        info!("playback start requested");
        true
    }

    fn stop_locked(signal: &ControlSignal) -> bool {
        match &signal.cancel {
            Some(cancel) if !cancel.is_cancelled() => {
                cancel.cancel();
                info!("playback stop requested");
                true
            }
            _ => {
                debug!("stop requested while idle; ignoring");
                false
            }
        }
    }

    /// Rebuild the image set of the running session at its next tick.
    /// Idle sessions pick up library changes when they next start.
    pub fn reload(&self) {
        self.inner.link.request_reload();
        debug!("reload requested");
    }

    /// What the playback loop is doing right now.
    pub fn status(&self) -> PlaybackStatus {
        self.inner.link.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.inner.link.subscribe()
    }

    /// Whether a session has been launched and has neither been asked to stop
    /// nor ended by itself.
    pub fn is_running(&self) -> bool {
        self.inner.signal.lock().running()
    }

    /// Stop playback, refuse further starts and wait for every launched
    /// session to finish.
    pub async fn shutdown(&self) {
        let tasks = {
            let mut signal = self.inner.signal.lock();
            signal.closed = true;
            Self::stop_locked(&signal);
            std::mem::take(&mut signal.tasks)
        };
        for task in tasks {
            if let Err(err) = task.await {
                error!(error = %err, "playback task panicked");
            }
        }
        info!("playback shut down");
    }
}

#[instrument(skip_all)]
async fn playback_task<R: Renderer>(inner: Arc<Inner<R>>, cancel: CancellationToken) {
    let _session = inner.session.lock().await;
    if cancel.is_cancelled() {
        debug!("stopped before playback began");
        return;
    }

    match run_session(&inner.renderer, &inner.opts, &inner.link, &cancel).await {
        Ok(SessionEnd::Stopped) => {}
        Ok(end) => info!(?end, "playback ended without a stop request"),
        Err(err) => {
            error!(error = ?err, "playback session failed");
            cancel.cancel();
            inner.link.publish(PlaybackStatus::Idle);
        }
    }
}
