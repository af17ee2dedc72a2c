//! Navigation state machine.
//!
//! The [`Navigator`] owns the current index and drives everything else: it
//! pins the current frame in the cache, tells the preloader which neighbours
//! to warm, hands file actions to the background worker and turns every
//! outcome into a status line for the UI.
//!
//! States: `Empty` when the folder has no images, `Showing(i)` normally, and
//! `Busy` while a file operation on the current image is in flight. While
//! `Busy`, further actions are rejected with [`ViewerError::Busy`]. The shared
//! listing only changes when a completion is applied, so the index stays in
//! range for the whole of a `Busy` period.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::fileops::{FileAction, FileOps, OpStatus, PendingOp, TransferMode};
use crate::files::{Identity, ImageSet};
use crate::loader::{grid_order, preload_window, DecodedImage, Preloader};
use crate::mosaic;
use crate::session::{get_or_wait, lock_session, Notify, Session, SharedSession};

pub const NO_IMAGES: &str = "No images in folder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// Discrete user actions delivered by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NavigateLeft,
    NavigateRight,
    First,
    Last,
    FileToBucket(u32),
    Delete,
}

/// Single image or a grid of thumbnails of the whole listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Single,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Empty,
    Showing(usize),
    Busy { index: usize, op: u64 },
}

/// Read-only snapshot for overlays.
#[derive(Debug, Clone, Default)]
pub struct NavigationInfo {
    pub position: Option<usize>,
    pub total: usize,
    pub file_name: Option<String>,
    pub modified: Option<SystemTime>,
    pub mode: TransferMode,
    pub view: ViewMode,
    pub thumbnails: usize,
    pub cached_frames: usize,
    pub cached_bytes: u64,
    pub cache_budget: u64,
    pub busy: bool,
}

pub struct Navigator {
    shared: SharedSession,
    preloader: Preloader,
    fileops: FileOps,
    config: ViewerConfig,
    state: NavState,
    view: ViewMode,
    direction: Direction,
    current: Option<Identity>,
    displayed: Option<Arc<DecodedImage>>,
    status: String,
}

impl Navigator {
    pub fn open(folder: &Path, config: ViewerConfig) -> Result<Self> {
        Self::with_notify(folder, config, None)
    }

    /// Like [`Navigator::open`], calling `notify` from worker threads whenever
    /// a file operation completes (so the UI can call [`poll`]) or a grid
    /// thumbnail becomes available.
    ///
    /// [`poll`]: Navigator::poll
    pub fn with_notify(folder: &Path, config: ViewerConfig, notify: Option<Notify>) -> Result<Self> {
        let images = ImageSet::open(folder)?;
        let empty = images.is_empty();
        let folder = images.folder().to_path_buf();
        let shared = Session::new(images, config.cache_budget).into_shared();
        let preloader = Preloader::spawn(Arc::clone(&shared), config.decode_workers, notify.clone());
        let fileops = FileOps::spawn(folder, notify)?;

        let mut nav = Self {
            shared,
            preloader,
            fileops,
            config,
            state: NavState::Empty,
            view: ViewMode::Single,
            direction: Direction::Forward,
            current: None,
            displayed: None,
            status: String::new(),
        };
        if empty {
            nav.status = NO_IMAGES.to_string();
        } else {
            nav.enter(0);
            nav.show();
        }
        Ok(nav)
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn index(&self) -> Option<usize> {
        match self.state {
            NavState::Empty => None,
            NavState::Showing(i) | NavState::Busy { index: i, .. } => Some(i),
        }
    }

    pub fn len(&self) -> usize {
        lock_session(&self.shared.0).images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, NavState::Busy { .. })
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    /// Switch between the single image and the thumbnail grid. Entering the
    /// grid queues a thumbnail for every listed image, nearest the selection
    /// first; leaving it drops whatever is still queued. Allowed while `Busy`.
    pub fn set_view(&mut self, view: ViewMode) {
        if self.view == view {
            return;
        }
        log::info!("[nav] view {:?} -> {:?}", self.view, view);
        self.view = view;
        let wanted = match view {
            ViewMode::Grid => {
                let current = self.index().unwrap_or(0);
                let session = lock_session(&self.shared.0);
                grid_order(current, session.images.len())
                    .into_iter()
                    .filter_map(|i| session.images.get(i).cloned())
                    .collect()
            }
            ViewMode::Single => Vec::new(),
        };
        self.preloader.request_thumbnails(wanted);
    }

    pub fn current_identity(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    pub fn status_message(&self) -> &str {
        &self.status
    }

    /// Handle one user action. `mode` is read only by bucket actions.
    /// Completed file operations are only applied by [`Navigator::poll`] or
    /// [`Navigator::wait_idle`]; until then the navigator stays `Busy`.
    pub fn handle(&mut self, action: Action, mode: TransferMode) -> Result<()> {
        let i = match self.state {
            NavState::Empty => {
                self.status = NO_IMAGES.to_string();
                return Ok(());
            }
            NavState::Busy { .. } => {
                self.status = ViewerError::Busy.to_string();
                return Err(ViewerError::Busy);
            }
            NavState::Showing(i) => i,
        };
        let n = self.len();

        match action {
            Action::NavigateRight => {
                self.direction = Direction::Forward;
                self.navigate_to((i + 1) % n);
            }
            Action::NavigateLeft => {
                self.direction = Direction::Backward;
                self.navigate_to((i + n - 1) % n);
            }
            Action::First => {
                self.direction = Direction::Forward;
                self.navigate_to(0);
            }
            Action::Last => {
                self.direction = Direction::Backward;
                self.navigate_to(n - 1);
            }
            Action::FileToBucket(bucket) => {
                self.start_op(i, FileAction::Transfer { bucket, mode })?;
            }
            Action::Delete => {
                self.start_op(i, FileAction::Delete)?;
            }
        }
        Ok(())
    }

    fn navigate_to(&mut self, idx: usize) {
        log::debug!("[nav] move {:?} -> {}", self.index(), idx);
        self.status.clear();
        self.enter(idx);
        self.show();
    }

    fn start_op(&mut self, index: usize, action: FileAction) -> Result<()> {
        let Some(identity) = self.current.clone() else {
            return Ok(());
        };
        match self.fileops.submit(identity, action) {
            Ok(op) => {
                self.state = NavState::Busy { index, op };
                Ok(())
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                Err(e)
            }
        }
    }

    fn enter(&mut self, idx: usize) {
        self.reaim(idx, None);
    }

    /// Make `idx` current: pin its frame and re-aim the preloader. A `removed`
    /// identity leaves the session under the same lock that moves the index,
    /// so no reader sees the listing shrink under an index that is past its
    /// end.
    fn reaim(&mut self, idx: usize, removed: Option<&Identity>) {
        let aimed = {
            let mut session = lock_session(&self.shared.0);
            if let Some(gone) = removed {
                session.remove(gone);
            }
            let n = session.images.len();
            if n == 0 {
                session.frames.set_current(None);
                None
            } else {
                let idx = idx % n;
                let id = session.images.get(idx).cloned();
                session.frames.set_current(id.clone());
                self.current = id;
                self.state = NavState::Showing(idx);

                let window: Vec<Identity> = preload_window(
                    idx,
                    n,
                    self.direction,
                    self.config.preload_ahead,
                    self.config.preload_behind,
                )
                .into_iter()
                .filter_map(|i| session.images.get(i).cloned())
                .collect();
                let grid: Vec<Identity> = match self.view {
                    ViewMode::Grid => grid_order(idx, n)
                        .into_iter()
                        .filter_map(|i| session.images.get(i).cloned())
                        .collect(),
                    ViewMode::Single => Vec::new(),
                };
                Some((window, grid))
            }
        };

        match aimed {
            Some((window, grid)) => {
                self.displayed = None;
                self.preloader.request(window);
                if self.view == ViewMode::Grid {
                    self.preloader.request_thumbnails(grid);
                }
            }
            None => self.set_empty(),
        }
    }

    fn set_empty(&mut self) {
        lock_session(&self.shared.0).frames.set_current(None);
        self.state = NavState::Empty;
        self.current = None;
        self.displayed = None;
        self.preloader.request(Vec::new());
        self.preloader.request_thumbnails(Vec::new());
    }

    /// The frame to draw, if any. Blocks for at most one decode when the
    /// current image is not cached yet.
    pub fn current_bitmap(&mut self) -> Option<Arc<DecodedImage>> {
        if self.displayed.is_none() {
            self.show();
        }
        self.displayed.clone()
    }

    /// Fetch the current frame. Images that cannot be decoded are dropped
    /// from the listing (not from disk) and the next one in the current
    /// direction is tried instead.
    fn show(&mut self) {
        loop {
            let Some(id) = self.current.clone() else {
                return;
            };
            let err = match get_or_wait(&self.shared, &id) {
                Ok(img) => {
                    self.displayed = Some(img);
                    return;
                }
                Err(e) => e,
            };

            if err.is_retryable() {
                self.status = format!("Error: {}", err);
                return;
            }
            let NavState::Showing(i) = self.state else {
                self.status = format!("Error: {}", err);
                return;
            };

            log::warn!("Skipping {}: {}", id.file_name(), err);
            self.status = format!("Skipped {}: {}", id.file_name(), err);
            let n = {
                let mut session = lock_session(&self.shared.0);
                session.remove(&id);
                session.images.len()
            };
            if n == 0 {
                self.set_empty();
                return;
            }
            let next = match self.direction {
                Direction::Forward => i % n,
                Direction::Backward => (i + n - 1) % n,
            };
            self.enter(next);
        }
    }

    /// Apply finished file operations. Returns true if anything changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Some(op) = self.fileops.try_completion() {
            self.complete(op);
            changed = true;
        }
        changed
    }

    /// Block until the in-flight file operation finishes or `timeout` passes.
    /// Returns true when no operation is in flight afterwards.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        if let NavState::Busy { .. } = self.state {
            if let Some(op) = self.fileops.wait_completion(timeout) {
                self.complete(op);
            }
        }
        !matches!(self.state, NavState::Busy { .. })
    }

    fn complete(&mut self, op: PendingOp) {
        let NavState::Busy { index, op: expected } = self.state else {
            log::warn!("[nav] completion #{} with no operation in flight", op.id);
            return;
        };
        if op.id != expected {
            log::warn!("[nav] completion #{} while waiting for #{}", op.id, expected);
        }

        let name = op.identity.file_name();
        match op.status {
            OpStatus::Done => {
                self.status = match op.action {
                    FileAction::Transfer {
                        bucket,
                        mode: TransferMode::Move,
                    } => format!("Moved {} to {}", name, bucket),
                    FileAction::Transfer {
                        bucket,
                        mode: TransferMode::Copy,
                    } => format!("Copied {} to {}", name, bucket),
                    FileAction::Delete => format!("Deleted {}", name),
                };
                if op.action.removes_source() {
                    let status = std::mem::take(&mut self.status);
                    self.reaim(index, Some(&op.identity));
                    self.show();
                    if self.status.is_empty() {
                        self.status = status;
                    }
                } else {
                    self.state = NavState::Showing(index);
                }
            }
            OpStatus::Failed(e) => {
                self.state = NavState::Showing(index);
                self.status = format!("Error: {}", e);
            }
            OpStatus::Queued | OpStatus::InProgress => {
                log::warn!("[nav] operation #{} returned before finishing", op.id);
                self.state = NavState::Showing(index);
            }
        }
    }

    /// Snapshot for overlays. `mode` is the caller's current transfer mode,
    /// which the navigator does not own.
    pub fn info(&self, mode: TransferMode) -> NavigationInfo {
        let session = lock_session(&self.shared.0);
        NavigationInfo {
            position: self.index(),
            total: session.images.len(),
            file_name: self.current.as_ref().map(|id| id.file_name()),
            modified: self.current.as_ref().and_then(|id| id.modified()),
            mode,
            view: self.view,
            thumbnails: session.thumbs.len(),
            cached_frames: session.frames.len(),
            cached_bytes: session.frames.used_bytes(),
            cache_budget: session.frames.budget(),
            busy: self.is_busy(),
        }
    }

    /// Grid thumbnail for `identity`, if it has been decoded.
    pub fn thumbnail(&self, identity: &Identity) -> Option<Arc<DecodedImage>> {
        lock_session(&self.shared.0).thumbs.get(identity)
    }

    /// Write a contact sheet of every listed image into `dir` under a
    /// timestamped name. Returns the file written, or `None` when there is
    /// nothing to put on it.
    pub fn save_contact_sheet(&mut self, dir: &Path) -> Result<Option<PathBuf>> {
        let images: Vec<_> = {
            let session = lock_session(&self.shared.0);
            session
                .images
                .list()
                .iter()
                .map(|id| (id.clone(), session.thumbs.get(id)))
                .collect()
        };
        if images.is_empty() {
            self.status = NO_IMAGES.to_string();
            return Ok(None);
        }

        let path = dir.join(mosaic::sheet_file_name(chrono::Local::now()));
        match mosaic::write_contact_sheet(&images, &path) {
            Ok(placed) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.status = format!("Saved {} ({} images)", name, placed);
                Ok(Some(path))
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                Err(e)
            }
        }
    }

    /// Whether the cache currently holds a frame for `identity`.
    pub fn is_cached(&self, identity: &Identity) -> bool {
        lock_session(&self.shared.0).frames.contains(identity)
    }

    /// Identities currently listed, in display order.
    pub fn listing(&self) -> Vec<Identity> {
        lock_session(&self.shared.0).images.list().to_vec()
    }
}
