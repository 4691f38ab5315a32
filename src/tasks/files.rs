use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc::{self, Sender};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::events::ControlCommand;
use crate::image_set::has_extension;

/// Quiet period after the last library change before a reload is requested,
/// so a batch of uploads or deletes costs one reload.
pub const SETTLE: Duration = Duration::from_millis(500);

/// Whether `event` touches a file the slideshow would load.
fn affects_library(event: &Event, ext: &str) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Name(_) | ModifyKind::Data(_) | ModifyKind::Any)
    );
    relevant_kind && event.paths.iter().any(|p| has_extension(p, ext))
}

/// Watch `library` and send [`ControlCommand::Reload`] once changes settle.
#[instrument(skip(control, cancel), fields(library = %library.display()))]
pub async fn run(
    library: PathBuf,
    ext: String,
    control: Sender<ControlCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    // Bridge notify callback -> async channel
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Result<Event>>(128);
    let mut watcher = recommended_watcher(move |res| {
        let _ = watch_tx.blocking_send(res);
    })
    .context("failed to create library watcher")?;
    watcher
        .watch(&library, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", library.display()))?;
    info!("library watcher initialized");

    let mut reload_at: Option<Instant> = None;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting files task");
                break;
            }

            _ = sleep_until(reload_at.unwrap_or_else(Instant::now)), if reload_at.is_some() => {
                reload_at = None;
                info!("library changed; requesting reload");
                if control.send(ControlCommand::Reload).await.is_err() {
                    debug!("control channel closed; exiting files task");
                    break;
                }
            }

            Some(res) = watch_rx.recv() => match res {
                Ok(event) => {
                    debug!(kind = ?event.kind, paths = ?event.paths, "notify event");
                    if affects_library(&event, &ext) {
                        reload_at = Some(Instant::now() + SETTLE);
                    }
                }
                Err(err) => error!("watch error: {err}"),
            },
        }
    }
    Ok(())
}
