//! Daily automatic start/stop window.

use std::time::Duration;

use anyhow::{Context, Result, ensure};
use chrono::{DateTime, Local, TimeZone, Timelike};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::events::ControlCommand;

/// Playback should run from `start_hour` (inclusive) to `stop_hour`
/// (exclusive), local time. Windows may wrap past midnight; equal hours mean
/// always on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AutoSchedule {
    pub start_hour: u32,
    pub stop_hour: u32,
}

impl Default for AutoSchedule {
    fn default() -> Self {
        Self {
            start_hour: 7,
            stop_hour: 22,
        }
    }
}

impl AutoSchedule {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.start_hour < 24, "start-hour must be in 0..24");
        ensure!(self.stop_hour < 24, "stop-hour must be in 0..24");
        Ok(())
    }

    #[must_use]
    pub fn is_active_at(&self, hour: u32) -> bool {
        let (start, stop) = (self.start_hour, self.stop_hour);
        if start == stop {
            true
        } else if start < stop {
            (start..stop).contains(&hour)
        } else {
            hour >= start || hour < stop
        }
    }
}

/// Time left until the next top of the hour after `now`.
pub fn until_next_hour<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    let into_hour = Duration::from_secs(u64::from(now.minute() * 60 + now.second()))
        + Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000));
    Duration::from_secs(3600)
        .saturating_sub(into_hour)
        .max(Duration::from_secs(1))
}

/// Send `Start`/`Stop` whenever the desired state changes: once at startup
/// and then at hour boundaries. Only edges are sent, so a manual toggle holds
/// until the next boundary.
#[instrument(skip(control, cancel))]
pub async fn run(
    schedule: AutoSchedule,
    control: mpsc::Sender<ControlCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut last_active: Option<bool> = None;
    loop {
        let now = Local::now();
        let active = schedule.is_active_at(now.hour());
        if last_active != Some(active) {
            let command = if active {
                ControlCommand::Start
            } else {
                ControlCommand::Stop
            };
            info!(hour = now.hour(), ?command, "schedule enforcing playback state");
            control
                .send(command)
                .await
                .context("failed to send scheduled control command")?;
            last_active = Some(active);
        }

        let wait = until_next_hour(&now);
        debug!(?wait, "schedule sleeping until next hour");
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(wait) => {}
        }
    }
    Ok(())
}
