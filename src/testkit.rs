//! Deterministic renderer used by unit and integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::render::{Placement, RenderError, Renderer};

/// One call observed by [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    Clear([u8; 3]),
    Draw { name: String, opacity: u8 },
    Present,
}

/// Surface handed out by [`RecordingRenderer`]: just the file name and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeSurface {
    pub name: String,
    pub size: (u32, u32),
}

#[derive(Debug, Default)]
struct Journal {
    ops: Vec<RenderOp>,
    /// What the canvas showed at each present, bottom layer first.
    presented: Vec<Vec<(String, u8)>>,
    pending: Vec<(String, u8)>,
    fail_draws: usize,
}

/// Renderer that never touches pixels and records every call instead.
///
/// Files whose content is empty fail to load, so tests can create broken
/// images with `std::fs::write(path, b"")`.
#[derive(Debug, Clone)]
pub struct RecordingRenderer {
    canvas: (u32, u32),
    load_delay: Duration,
    journal: Arc<Mutex<Journal>>,
}

impl RecordingRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: (width, height),
            load_delay: Duration::ZERO,
            journal: Arc::new(Mutex::new(Journal::default())),
        }
    }

    /// Block the calling thread for `delay` on every image load, like a slow
    /// decoder would.
    #[must_use]
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Make the next `n` draw calls fail.
    pub fn fail_next_draws(&self, n: usize) {
        self.journal.lock().fail_draws = n;
    }

    pub fn ops(&self) -> Vec<RenderOp> {
        self.journal.lock().ops.clone()
    }

    pub fn present_count(&self) -> usize {
        self.journal.lock().presented.len()
    }

    /// Layers visible after the most recent present.
    pub fn last_frame(&self) -> Option<Vec<(String, u8)>> {
        self.journal.lock().presented.last().cloned()
    }

    /// The image shown fully opaque on top of the last frame, if any.
    pub fn visible_image(&self) -> Option<String> {
        self.last_frame()?
            .into_iter()
            .rev()
            .find(|(_, opacity)| *opacity == 255)
            .map(|(name, _)| name)
    }

    /// Names of images that ended up fully opaque on top of a presented
    /// frame, with consecutive duplicates collapsed.
    pub fn shown_sequence(&self) -> Vec<String> {
        let journal = self.journal.lock();
        let mut out: Vec<String> = Vec::new();
        for frame in &journal.presented {
            let top = frame
                .last()
                .filter(|(_, opacity)| *opacity == 255)
                .map(|(name, _)| name.clone());
            if let Some(name) = top
                && out.last() != Some(&name)
            {
                out.push(name);
            }
        }
        out
    }
}

impl Renderer for RecordingRenderer {
    type Surface = FakeSurface;

    fn load_image(&mut self, path: &Path, target: u32) -> Result<Self::Surface, RenderError> {
        if !self.load_delay.is_zero() {
            std::thread::sleep(self.load_delay);
        }
        let meta = std::fs::metadata(path).map_err(|source| RenderError::Read {
            path: PathBuf::from(path),
            source,
        })?;
        if meta.len() == 0 {
            return Err(RenderError::Read {
                path: PathBuf::from(path),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, "empty file"),
            });
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FakeSurface {
            name,
            size: (target, target),
        })
    }

    fn surface_size(&self, surface: &Self::Surface) -> (u32, u32) {
        surface.size
    }

    fn canvas_size(&self) -> (u32, u32) {
        self.canvas
    }

    fn clear(&mut self, rgb: [u8; 3]) {
        let mut journal = self.journal.lock();
        journal.ops.push(RenderOp::Clear(rgb));
        journal.pending.clear();
    }

    fn draw(
        &mut self,
        surface: &Self::Surface,
        _placement: Placement,
        opacity: u8,
    ) -> Result<(), RenderError> {
        let mut journal = self.journal.lock();
        if journal.fail_draws > 0 {
            journal.fail_draws -= 1;
            return Err(RenderError::Present("injected draw failure".into()));
        }
        journal.ops.push(RenderOp::Draw {
            name: surface.name.clone(),
            opacity,
        });
        journal.pending.push((surface.name.clone(), opacity));
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let mut journal = self.journal.lock();
        journal.ops.push(RenderOp::Present);
        let frame = journal.pending.clone();
        journal.presented.push(frame);
        Ok(())
    }
}
