//! CPU renderer backed by an RGBA canvas.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use tracing::{debug, trace};

use super::{Placement, RenderError, Renderer};

/// Headless renderer that composites into an in-memory back buffer and copies
/// it to a front buffer on [`Renderer::present`].
///
/// With a snapshot path configured, every presented frame is also written out
/// as PNG, which is handy for kiosks that display a file-backed framebuffer.
pub struct SoftwareRenderer {
    back: RgbaImage,
    front: RgbaImage,
    frames_presented: u64,
    snapshot_path: Option<PathBuf>,
}

impl SoftwareRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            back: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
            front: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
            frames_presented: 0,
            snapshot_path: None,
        }
    }

    #[must_use]
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// The last presented frame.
    pub fn front(&self) -> &RgbaImage {
        &self.front
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

fn decode_rgba8(path: &Path) -> Result<RgbaImage, RenderError> {
    let read_err = |source| RenderError::Read {
        path: path.to_path_buf(),
        source,
    };
    image::ImageReader::open(path)
        .map_err(read_err)?
        .with_guessed_format()
        .map_err(read_err)?
        .decode()
        .map(|img| img.to_rgba8())
        .map_err(|source| RenderError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

#[inline]
fn blend_channel(src: u8, dst: u8, alpha: u32) -> u8 {
    ((u32::from(src) * alpha + u32::from(dst) * (255 - alpha) + 127) / 255) as u8
}

impl Renderer for SoftwareRenderer {
    type Surface = RgbaImage;

    fn load_image(&mut self, path: &Path, target: u32) -> Result<Self::Surface, RenderError> {
        let rgba = decode_rgba8(path)?;
        let (w, h) = rgba.dimensions();
        if w == 0 || h == 0 || (w.max(h) == target) {
            return Ok(rgba);
        }
        // Fit inside the target square, preserving aspect ratio.
        let scale = f64::from(target) / f64::from(w.max(h));
        let nw = ((f64::from(w) * scale).round() as u32).max(1);
        let nh = ((f64::from(h) * scale).round() as u32).max(1);
        debug!(path = %path.display(), from = ?(w, h), to = ?(nw, nh), "scaled image");
        Ok(image::imageops::resize(&rgba, nw, nh, FilterType::Triangle))
    }

    fn surface_size(&self, surface: &Self::Surface) -> (u32, u32) {
        surface.dimensions()
    }

    fn canvas_size(&self) -> (u32, u32) {
        self.back.dimensions()
    }

    fn clear(&mut self, rgb: [u8; 3]) {
        let [r, g, b] = rgb;
        for px in self.back.pixels_mut() {
            *px = Rgba([r, g, b, 255]);
        }
    }

    fn draw(
        &mut self,
        surface: &Self::Surface,
        placement: Placement,
        opacity: u8,
    ) -> Result<(), RenderError> {
        if opacity == 0 {
            return Ok(());
        }
        let (cw, ch) = self.back.dimensions();
        let (sw, sh) = surface.dimensions();
        let w = sw.min(placement.width);
        let h = sh.min(placement.height);
        for sy in 0..h {
            let cy = i64::from(placement.y) + i64::from(sy);
            if cy < 0 || cy >= i64::from(ch) {
                continue;
            }
            for sx in 0..w {
                let cx = i64::from(placement.x) + i64::from(sx);
                if cx < 0 || cx >= i64::from(cw) {
                    continue;
                }
                let src = surface.get_pixel(sx, sy);
                let alpha = u32::from(src[3]) * u32::from(opacity) / 255;
                let dst = self.back.get_pixel_mut(cx as u32, cy as u32);
                for c in 0..3 {
                    dst[c] = blend_channel(src[c], dst[c], alpha);
                }
                dst[3] = 255;
            }
        }
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.front.copy_from_slice(&self.back);
        self.frames_presented += 1;
        trace!(frame = self.frames_presented, "presented");
        if let Some(path) = &self.snapshot_path {
            self.front
                .save_with_format(path, image::ImageFormat::Png)
                .map_err(|err| RenderError::Present(format!("{}: {err}", path.display())))?;
        }
        Ok(())
    }
}
