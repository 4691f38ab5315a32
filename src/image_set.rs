//! The ordered collection of images a playback session cycles through.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::Error;
use crate::render::{Placement, Renderer};

/// A decoded image ready to be put on the canvas.
///
/// The surface is shared so frames can be handed to the render worker
/// without copying pixels.
#[derive(Debug)]
pub struct ImageEntry<S> {
    pub surface: Arc<S>,
    pub placement: Placement,
    pub name: String,
}

impl<S> Clone for ImageEntry<S> {
    fn clone(&self) -> Self {
        Self {
            surface: self.surface.clone(),
            placement: self.placement,
            name: self.name.clone(),
        }
    }
}

/// Immutable, ordered set of loaded images. Rebuilt wholesale on reload.
#[derive(Debug)]
pub struct ImageSet<S> {
    entries: Vec<ImageEntry<S>>,
}

/// Return `true` if `path` ends in `ext` (lowercase, without dot), ignoring case.
#[must_use]
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

impl<S> ImageSet<S> {
    /// Load every `ext` file directly inside `dir`, in file-name order.
    ///
    /// Files that fail to load are logged and skipped. The result may be empty.
    ///
    /// # Errors
    /// Returns [`Error::BadDir`] if `dir` is missing or not a directory.
    pub fn load<R>(renderer: &mut R, dir: &Path, ext: &str, target: u32) -> Result<Self, Error>
    where
        R: Renderer<Surface = S>,
    {
        if !dir.is_dir() {
            return Err(Error::BadDir(dir.display().to_string()));
        }
        let canvas = renderer.canvas_size();
        let mut entries = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !has_extension(path, ext) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match renderer.load_image(path, target) {
                Ok(surface) => {
                    let placement = Placement::centered(canvas, renderer.surface_size(&surface));
                    debug!(%name, ?placement, "loaded image");
                    entries.push(ImageEntry {
                        surface: Arc::new(surface),
                        placement,
                        name,
                    });
                }
                Err(err) => warn!(%name, error = %err, "skipping image that failed to load"),
            }
        }
        info!(count = entries.len(), dir = %dir.display(), "loaded images");
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<ImageEntry<S>>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] if `index >= count()`.
    pub fn at(&self, index: usize) -> Result<&ImageEntry<S>, Error> {
        self.entries.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    /// Position of the image called `name`, if present.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}
