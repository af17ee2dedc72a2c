use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

use crate::error::{Result, ViewerError};

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tga", "tiff", "tif", "webp", "ico", "pnm", "pbm",
    "pgm", "ppm", "pam", "dds", "hdr", "exr", "ff", "qoi",
];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A specific file instance: path, modification stamp and a generation number
/// that is never reused within the process. Two snapshots of the same file
/// compare unequal, so work queued against an old snapshot cannot land on a
/// new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    path: Arc<Path>,
    modified: Option<SystemTime>,
    generation: u64,
}

impl Identity {
    pub fn stamp(path: &Path) -> std::io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            path: Arc::from(path),
            modified: meta.modified().ok(),
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[cfg(test)]
    pub(crate) fn synthetic(name: &str) -> Self {
        Self {
            path: Arc::from(Path::new(name)),
            modified: None,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Image set
// ---------------------------------------------------------------------------

/// Snapshot of the images in one folder, sorted by file name. Only explicit
/// removals change it after `open`.
#[derive(Debug, Clone)]
pub struct ImageSet {
    folder: PathBuf,
    entries: Vec<Identity>,
}

impl ImageSet {
    pub fn open(folder: &Path) -> Result<Self> {
        let folder_err = |reason: String| ViewerError::Folder {
            path: folder.to_path_buf(),
            reason,
        };

        if !folder.exists() {
            return Err(folder_err("does not exist".into()));
        }
        if !folder.is_dir() {
            return Err(folder_err("not a directory".into()));
        }

        let start_time = Instant::now();
        let folder = fs::canonicalize(folder).map_err(|e| folder_err(e.to_string()))?;
        let entries = fs::read_dir(&folder).map_err(|e| folder_err(e.to_string()))?;

        let mut names: Vec<_> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|ft| !ft.is_dir()).unwrap_or(false))
            .map(|e| e.file_name())
            .filter(|name| is_image_file(Path::new(name)))
            .collect();
        names.sort();

        let entries: Vec<Identity> = names
            .into_par_iter()
            .filter_map(|name| {
                let path = folder.join(&name);
                if !path.is_file() {
                    return None;
                }
                match Identity::stamp(&path) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        log::warn!("Skipping {}: {}", path.display(), e);
                        None
                    }
                }
            })
            .collect();

        log::info!(
            "Opened {} in {:.2}s. Found {} images.",
            folder.display(),
            start_time.elapsed().as_secs_f64(),
            entries.len()
        );

        Ok(Self { folder, entries })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn list(&self) -> &[Identity] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Identity> {
        self.entries.get(idx)
    }

    pub fn position(&self, identity: &Identity) -> Option<usize> {
        self.entries.iter().position(|e| e == identity)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.position(identity).is_some()
    }

    /// Drop `identity` from the set. Returns the position it held.
    pub fn remove(&mut self, identity: &Identity) -> Option<usize> {
        let idx = self.position(identity)?;
        self.entries.remove(idx);
        Some(idx)
    }
}
