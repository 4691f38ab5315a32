//! Display capability consumed by the slideshow.
//!
//! The engine never touches pixels directly; it asks a [`Renderer`] to decode
//! images into surfaces, composite them onto the canvas and flip the frame.

pub mod software;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::task;

pub use software::SoftwareRenderer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to present frame: {0}")]
    Present(String),

    #[error("render worker failed: {0}")]
    Worker(String),
}

/// Destination rectangle of a surface on the canvas, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Center a `size` rectangle on a `canvas` of the given dimensions.
    ///
    /// Surfaces larger than the canvas get a negative origin and are clipped
    /// evenly on both sides.
    #[must_use]
    pub fn centered(canvas: (u32, u32), size: (u32, u32)) -> Self {
        let (cw, ch) = canvas;
        let (w, h) = size;
        Self {
            x: (i64::from(cw) - i64::from(w)).div_euclid(2) as i32,
            y: (i64::from(ch) - i64::from(h)).div_euclid(2) as i32,
            width: w,
            height: h,
        }
    }
}

/// Something that can turn files into displayable surfaces and show them.
///
/// Calls are synchronous and are only ever issued from the playback task.
pub trait Renderer: Send + 'static {
    type Surface: Send + Sync + 'static;

    /// Decode `path` and scale it to fit inside a `target` x `target` square.
    fn load_image(&mut self, path: &Path, target: u32) -> Result<Self::Surface, RenderError>;

    /// Pixel dimensions of a loaded surface.
    fn surface_size(&self, surface: &Self::Surface) -> (u32, u32);

    /// Pixel dimensions of the visible canvas.
    fn canvas_size(&self) -> (u32, u32);

    /// Fill the whole back buffer with an opaque color.
    fn clear(&mut self, rgb: [u8; 3]);

    /// Composite `surface` at `placement` with `opacity` (0 = invisible, 255 = opaque).
    fn draw(
        &mut self,
        surface: &Self::Surface,
        placement: Placement,
        opacity: u8,
    ) -> Result<(), RenderError>;

    /// Make the back buffer visible.
    fn present(&mut self) -> Result<(), RenderError>;
}

/// Handle to a [`Renderer`] that hands its synchronous work to tokio's
/// blocking pool.
///
/// Decoding, scaling and presenting can take a long time; running them here
/// keeps them off the async workers that serve the control surface.
pub struct SharedRenderer<R> {
    inner: Arc<Mutex<R>>,
}

impl<R> Clone for SharedRenderer<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R: Renderer> SharedRenderer<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(renderer)),
        }
    }

    /// Run `f` with exclusive access to the renderer on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T, RenderError>
    where
        T: Send + 'static,
        F: FnOnce(&mut R) -> Result<T, RenderError> + Send + 'static,
    {
        let inner = self.inner.clone();
        task::spawn_blocking(move || f(&mut inner.lock()))
            .await
            .map_err(|err| RenderError::Worker(err.to_string()))?
    }

    /// Lock the renderer on the calling thread. Blocks; not for async code.
    pub fn lock(&self) -> MutexGuard<'_, R> {
        self.inner.lock()
    }
}
