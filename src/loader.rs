use image::{GenericImageView, ImageReader};
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};

use crate::cache::{FrameCache, ThumbnailStore};
use crate::error::DecodeError;
use crate::files::{Identity, ImageSet};
use crate::navigator::Direction;
use crate::session::{lock_session, Notify, SharedSession, Wake};

/// Longest side of a grid thumbnail.
pub const THUMB_SIZE: u32 = 200;

// ---------------------------------------------------------------------------
// Decoded image data
// ---------------------------------------------------------------------------

pub struct DecodedImage {
    pub rgba_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    pub format_name: String,
}

impl DecodedImage {
    pub fn mem_size(&self) -> u64 {
        self.rgba_bytes.len() as u64
    }
}

/// Decode `path` into RGBA8. Touches no shared state, so any number of
/// threads may call it at once.
pub fn decode(path: &Path) -> Result<DecodedImage, DecodeError> {
    decode_sized(path, None)
}

/// Decode and shrink to fit within `side` x `side`. Images already that small
/// keep their size.
pub fn decode_thumbnail(path: &Path, side: u32) -> Result<DecodedImage, DecodeError> {
    decode_sized(path, Some(side))
}

fn decode_sized(path: &Path, max_side: Option<u32>) -> Result<DecodedImage, DecodeError> {
    let unreadable = |source: io::Error| DecodeError::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let file_size = fs::metadata(path).map_err(unreadable)?.len();
    let reader = ImageReader::open(path)
        .map_err(unreadable)?
        .with_guessed_format()
        .map_err(unreadable)?;

    let format_name = reader
        .format()
        .map(|f| format!("{:?}", f).to_uppercase())
        .or_else(|| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_uppercase())
        })
        .unwrap_or_else(|| "UNKNOWN".to_string());

    let img = reader
        .decode()
        .map_err(|e| DecodeError::from_image(path.to_path_buf(), e))?;
    let img = match max_side {
        Some(side) if img.width() > side || img.height() > side => img.thumbnail(side, side),
        _ => img,
    };
    let (width, height) = img.dimensions();

    Ok(DecodedImage {
        rgba_bytes: img.to_rgba8().into_raw(),
        width,
        height,
        file_size,
        format_name,
    })
}

// ---------------------------------------------------------------------------
// Preload window
// ---------------------------------------------------------------------------

/// Indices to keep warm around `current`, nearest first. At each distance the
/// neighbour in the navigation direction comes before the one behind, so the
/// next image is always first. Both ends wrap.
pub fn preload_window(
    current: usize,
    len: usize,
    direction: Direction,
    ahead: usize,
    behind: usize,
) -> Vec<usize> {
    if len <= 1 {
        return Vec::new();
    }
    let step = |dist: usize, forward: bool| -> usize {
        let dist = dist % len;
        if forward {
            (current + dist) % len
        } else {
            (current + len - dist) % len
        }
    };
    let fwd = direction == Direction::Forward;

    let mut out = Vec::new();
    for dist in 1..=ahead.max(behind) {
        if dist <= ahead {
            out.push(step(dist, fwd));
        }
        if dist <= behind {
            out.push(step(dist, !fwd));
        }
    }
    let mut seen = HashSet::new();
    out.retain(|&i| i != current && seen.insert(i));
    out
}

/// Thumbnail order for the grid: the selected cell first, then outward one
/// step at a time, the earlier cell first at each distance so the grid fills
/// top to bottom around the selection. No wrapping.
pub fn grid_order(current: usize, len: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let current = current.min(len - 1);
    let mut out = Vec::with_capacity(len);
    out.push(current);
    for dist in 1..len {
        if let Some(bwd) = current.checked_sub(dist) {
            out.push(bwd);
        }
        if current + dist < len {
            out.push(current + dist);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Preload queue (lives inside the session lock)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkType {
    Full,
    Thumbnail,
}

#[derive(Default)]
pub struct PreloadQueue {
    pending: VecDeque<Identity>,
    thumbs: VecDeque<Identity>,
    in_progress: HashSet<Identity>,
    thumbs_in_progress: HashSet<Identity>,
}

impl PreloadQueue {
    /// Replace the wanted list. Anything queued but not yet started that is
    /// missing from `wanted` is cancelled. Returns how many were cancelled.
    pub fn replace(&mut self, wanted: Vec<Identity>) -> usize {
        let cancelled = self
            .pending
            .iter()
            .filter(|id| !wanted.contains(*id))
            .count();
        self.pending = wanted.into();
        cancelled
    }

    /// Replace the wanted thumbnails. Returns how many queued ones were dropped.
    pub fn replace_thumbnails(&mut self, wanted: Vec<Identity>) -> usize {
        let keep: HashSet<&Identity> = wanted.iter().collect();
        let cancelled = self.thumbs.iter().filter(|id| !keep.contains(id)).count();
        self.thumbs = wanted.into();
        cancelled
    }

    /// Pop the next job worth doing and mark it in progress. Frames for the
    /// single view always go before thumbnails.
    pub fn next_job(
        &mut self,
        frames: &FrameCache,
        thumbs: &ThumbnailStore,
        images: &ImageSet,
    ) -> Option<(Identity, WorkType)> {
        while let Some(id) = self.pending.pop_front() {
            if frames.contains(&id) || self.in_progress.contains(&id) || !images.contains(&id) {
                continue;
            }
            self.in_progress.insert(id.clone());
            return Some((id, WorkType::Full));
        }
        while let Some(id) = self.thumbs.pop_front() {
            if thumbs.is_settled(&id) || self.thumbs_in_progress.contains(&id) || !images.contains(&id) {
                continue;
            }
            self.thumbs_in_progress.insert(id.clone());
            return Some((id, WorkType::Thumbnail));
        }
        None
    }

    pub fn claim(&mut self, identity: &Identity) {
        self.in_progress.insert(identity.clone());
    }

    pub fn finish(&mut self, identity: &Identity) {
        self.in_progress.remove(identity);
    }

    pub fn finish_thumbnail(&mut self, identity: &Identity) {
        self.thumbs_in_progress.remove(identity);
    }

    pub fn is_in_progress(&self, identity: &Identity) -> bool {
        self.in_progress.contains(identity)
    }

    /// Drop a removed identity from the pending list. An in-flight decode for
    /// it is left alone; its result is discarded on completion.
    pub fn forget(&mut self, identity: &Identity) {
        self.pending.retain(|id| id != identity);
        self.thumbs.retain(|id| id != identity);
    }

    pub fn pending(&self) -> impl Iterator<Item = &Identity> {
        self.pending.iter()
    }

    pub fn pending_thumbnails(&self) -> impl Iterator<Item = &Identity> {
        self.thumbs.iter()
    }
}

// ---------------------------------------------------------------------------
// Background decode workers
// ---------------------------------------------------------------------------

pub struct Preloader {
    shared: SharedSession,
    workers: Vec<JoinHandle<()>>,
}

impl Preloader {
    /// Start `num_threads` workers. `notify` fires whenever a thumbnail lands
    /// so a grid view can redraw.
    pub fn spawn(shared: SharedSession, num_threads: usize, notify: Option<Notify>) -> Self {
        let workers = (0..num_threads)
            .map(|n| {
                let shared = Arc::clone(&shared);
                let notify = notify.clone();
                thread::Builder::new()
                    .name(format!("preload-{}", n))
                    .spawn(move || preload_worker(shared, notify))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    log::error!("Failed to spawn preload worker: {}", e);
                    None
                }
            })
            .collect();
        Self { shared, workers }
    }

    /// Schedule `wanted` (nearest first), cancelling stale pending work.
    pub fn request(&self, wanted: Vec<Identity>) {
        let (lock, cvar) = &*self.shared;
        let mut session = lock_session(lock);
        let cancelled = session.queue.replace(wanted);
        if cancelled > 0 {
            log::debug!("[preload] cancelled {} stale jobs", cancelled);
        }
        cvar.notify_all();
    }

    /// Schedule grid thumbnails in display priority order. An empty list
    /// cancels whatever is still queued.
    pub fn request_thumbnails(&self, wanted: Vec<Identity>) {
        let (lock, cvar) = &*self.shared;
        let mut session = lock_session(lock);
        let cancelled = session.queue.replace_thumbnails(wanted);
        if cancelled > 0 {
            log::debug!("[preload] dropped {} queued thumbnails", cancelled);
        }
        cvar.notify_all();
    }
}

impl Drop for Preloader {
    fn drop(&mut self) {
        {
            let (lock, cvar) = &*self.shared;
            lock_session(lock).shutdown = true;
            cvar.notify_all();
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn preload_worker(shared: SharedSession, notify: Option<Notify>) {
    loop {
        let (identity, work) = {
            let (lock, cvar) = &*shared;
            let mut session = lock_session(lock);
            loop {
                if session.shutdown {
                    return;
                }
                if let Some(job) = session.next_preload() {
                    break job;
                }
                session = cvar.wait(session).unwrap_or_else(PoisonError::into_inner);
            }
        };

        let result = match work {
            WorkType::Full => decode(identity.path()),
            WorkType::Thumbnail => decode_thumbnail(identity.path(), THUMB_SIZE),
        };

        let (lock, cvar) = &*shared;
        let mut session = lock_session(lock);
        let listed = session.images.contains(&identity);
        let mut thumb_ready = false;
        match work {
            WorkType::Full => {
                session.queue.finish(&identity);
                match result {
                    Ok(decoded) if listed => {
                        session.frames.put(identity, Arc::new(decoded));
                    }
                    Ok(_) => {
                        log::debug!("[preload] dropping stale frame for {}", identity.file_name());
                    }
                    Err(e) => log::warn!("[preload] {}", e),
                }
            }
            WorkType::Thumbnail => {
                session.queue.finish_thumbnail(&identity);
                match result {
                    Ok(thumb) if listed => {
                        session.thumbs.insert(identity, Arc::new(thumb));
                        thumb_ready = true;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        log::warn!("[preload] thumbnail: {}", e);
                        if listed {
                            session.thumbs.mark_failed(identity);
                        }
                    }
                }
            }
        }
        cvar.notify_all();
        drop(session);

        if thumb_ready {
            if let Some(notify) = &notify {
                notify(Wake::ThumbnailReady);
            }
        }
    }
}
