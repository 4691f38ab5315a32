use anyhow::Result;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::bridge::ControlBridge;
use crate::events::ControlCommand;
use crate::render::Renderer;

/// Apply one command to the bridge.
pub fn apply<R: Renderer>(bridge: &ControlBridge<R>, command: ControlCommand) {
    let acted = match command {
        ControlCommand::Start => bridge.request_start(),
        ControlCommand::Stop => bridge.request_stop(),
        ControlCommand::Toggle => bridge.toggle(),
        ControlCommand::Reload => {
            bridge.reload();
            true
        }
    };
    debug!(?command, acted, "control command applied");
}

/// Single consumer for every control path, so they all go through one bridge.
#[instrument(skip_all)]
pub async fn run<R: Renderer>(
    bridge: ControlBridge<R>,
    mut commands: Receiver<ControlCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => apply(&bridge, command),
                None => {
                    info!("all control senders dropped; exiting control task");
                    break;
                }
            },
        }
    }
    Ok(())
}
