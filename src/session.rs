//! The one lock that guards every piece of mutable shared state.
//!
//! [`ImageSet`], [`FrameCache`], the grid thumbnails and the preload queue sit
//! behind a single mutex, so a reader never sees a listed identity whose frame has already
//! been invalidated, or the reverse. The condvar wakes preload workers when
//! new work is queued and wakes `get_or_wait` callers when a decode finishes.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::cache::{FrameCache, ThumbnailStore};
use crate::error::DecodeError;
use crate::files::{Identity, ImageSet};
use crate::loader::{decode, DecodedImage, PreloadQueue, WorkType};

pub struct Session {
    pub images: ImageSet,
    pub frames: FrameCache,
    pub thumbs: ThumbnailStore,
    pub queue: PreloadQueue,
    pub shutdown: bool,
}

pub type SharedSession = Arc<(Mutex<Session>, Condvar)>;

/// What a background thread finished, for whoever owns the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    FileOpFinished,
    ThumbnailReady,
}

/// Called from worker threads; must not block.
pub type Notify = Arc<dyn Fn(Wake) + Send + Sync>;

impl Session {
    pub fn new(images: ImageSet, budget: u64) -> Self {
        Self {
            images,
            frames: FrameCache::new(budget),
            thumbs: ThumbnailStore::default(),
            queue: PreloadQueue::default(),
            shutdown: false,
        }
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new((Mutex::new(self), Condvar::new()))
    }

    pub fn next_preload(&mut self) -> Option<(Identity, WorkType)> {
        self.queue.next_job(&self.frames, &self.thumbs, &self.images)
    }

    /// Remove `identity` from the listing, the caches and the preload queue in
    /// one step. Returns the position it held in the listing.
    pub fn remove(&mut self, identity: &Identity) -> Option<usize> {
        self.frames.invalidate(identity);
        self.thumbs.remove(identity);
        self.queue.forget(identity);
        if self.frames.current() == Some(identity) {
            self.frames.set_current(None);
        }
        self.images.remove(identity)
    }
}

/// Every critical section leaves the session consistent, so a panic on another
/// thread does not make the data unusable.
pub fn lock_session(lock: &Mutex<Session>) -> MutexGuard<'_, Session> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fetch the frame for the image being displayed. Returns a cached frame
/// immediately, waits if a preload worker is already decoding it, and
/// otherwise decodes on the calling thread and caches the result.
pub fn get_or_wait(
    shared: &SharedSession,
    identity: &Identity,
) -> Result<Arc<DecodedImage>, DecodeError> {
    let (lock, cvar) = &**shared;
    {
        let mut session = lock_session(lock);
        loop {
            if let Some(img) = session.frames.try_get(identity) {
                return Ok(img);
            }
            if !session.queue.is_in_progress(identity) {
                break;
            }
            session = cvar.wait(session).unwrap_or_else(PoisonError::into_inner);
        }
        session.queue.claim(identity);
    }

    let result = decode(identity.path());

    let mut session = lock_session(lock);
    session.queue.finish(identity);
    let out = result.map(|decoded| {
        let decoded = Arc::new(decoded);
        if session.images.contains(identity) {
            session.frames.put(identity.clone(), Arc::clone(&decoded));
        }
        decoded
    });
    cvar.notify_all();
    out
}
