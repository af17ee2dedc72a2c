//! Error taxonomy for the viewer core.
//!
//! [`ViewerError`] covers everything the Navigator can report to the UI.
//! [`DecodeError`] is kept separate because decoding runs on worker threads
//! and the caller has to decide between retrying and skipping.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    /// The folder could not be opened. Fatal to session start.
    #[error("Cannot open folder {path}: {reason}")]
    Folder { path: PathBuf, reason: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A same-named file already sits in the bucket folder.
    #[error("Destination exists: {path}")]
    Destination { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Busy: a file operation is still running")]
    Busy,
}

impl ViewerError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ViewerError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("cannot read {path}: {source}")]
    Unreadable { path: PathBuf, source: io::Error },

    #[error("corrupt image data in {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("unsupported format for {path}: {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },
}

impl DecodeError {
    /// I/O failures may go away on their own; bad data will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DecodeError::Unreadable { .. })
    }

    pub fn from_image(path: PathBuf, err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(source) => DecodeError::Unreadable { path, source },
            image::ImageError::Unsupported(e) => DecodeError::UnsupportedFormat {
                path,
                reason: e.to_string(),
            },
            other => DecodeError::Corrupt {
                path,
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
