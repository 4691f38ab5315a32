use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::schedule::AutoSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 720,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Directory holding the slideshow images (not scanned recursively).
    pub photo_library_path: PathBuf,
    /// Accepted file extension, matched case-insensitively, without the dot.
    pub extension: String,
    /// How long an image stays on screen before the next transition starts.
    #[serde(with = "humantime_serde")]
    pub display_duration: Duration,
    /// Cross-fade duration.
    #[serde(with = "humantime_serde")]
    pub transition_duration: Duration,
    /// Upper bound on frames presented per second during a transition.
    pub frame_rate_cap: u32,
    /// How often the playback loop wakes to check its timer.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Visible canvas dimensions in pixels.
    pub canvas: CanvasSize,
    /// Side of the square every image is scaled to fit. Defaults to the
    /// smaller canvas side.
    pub image_size: Option<u32>,
    /// Fill color behind images and for the idle placeholder.
    pub background: [u8; 3],
    /// Start playback as soon as the process is up.
    pub autostart: bool,
    /// Reload the image set when files with the accepted extension change.
    pub watch_library: bool,
    /// Write each presented frame to this PNG file.
    pub snapshot_path: Option<PathBuf>,
    /// Daily automatic start/stop window.
    pub schedule: Option<AutoSchedule>,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        ensure!(
            !self.display_duration.is_zero(),
            "display-duration must be greater than zero"
        );
        ensure!(
            !self.transition_duration.is_zero(),
            "transition-duration must be greater than zero"
        );
        ensure!(
            !self.poll_interval.is_zero(),
            "poll-interval must be greater than zero"
        );
        ensure!(self.frame_rate_cap > 0, "frame-rate-cap must be greater than zero");
        ensure!(
            self.canvas.width > 0 && self.canvas.height > 0,
            "canvas dimensions must be greater than zero"
        );
        ensure!(
            self.image_size != Some(0),
            "image-size must be greater than zero"
        );
        let ext = self.extension.trim().trim_start_matches('.').to_ascii_lowercase();
        ensure!(!ext.is_empty(), "extension must not be empty");
        self.extension = ext;
        if let Some(schedule) = &self.schedule {
            schedule.validate().context("invalid schedule")?;
        }
        Ok(self)
    }

    /// Side of the square images are scaled into.
    pub fn target_image_size(&self) -> u32 {
        self.image_size
            .unwrap_or_else(|| self.canvas.width.min(self.canvas.height))
    }

    /// Settings the playback loop consumes.
    pub fn playback(&self) -> PlaybackOptions {
        PlaybackOptions {
            library: self.photo_library_path.clone(),
            extension: self.extension.clone(),
            image_size: self.target_image_size(),
            display_duration: self.display_duration,
            poll_interval: self.poll_interval,
            background: self.background,
            transition: TransitionOptions {
                duration: self.transition_duration,
                frame_rate_cap: self.frame_rate_cap,
                background: self.background,
            },
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_library_path: PathBuf::from("media"),
            extension: "jpg".to_string(),
            display_duration: Duration::from_secs(10),
            transition_duration: Duration::from_millis(1000),
            frame_rate_cap: 60,
            poll_interval: Duration::from_millis(100),
            canvas: CanvasSize::default(),
            image_size: None,
            background: [0, 0, 0],
            autostart: true,
            watch_library: true,
            snapshot_path: None,
            schedule: None,
        }
    }
}

/// Everything one playback session needs, detached from the file format.
#[derive(Debug, Clone)]
pub struct PlaybackOptions {
    pub library: PathBuf,
    pub extension: String,
    pub image_size: u32,
    pub display_duration: Duration,
    pub poll_interval: Duration,
    pub background: [u8; 3],
    pub transition: TransitionOptions,
}

#[derive(Debug, Clone, Copy)]
pub struct TransitionOptions {
    pub duration: Duration,
    pub frame_rate_cap: u32,
    pub background: [u8; 3],
}

impl Default for TransitionOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(1000),
            frame_rate_cap: 60,
            background: [0, 0, 0],
        }
    }
}
