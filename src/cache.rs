use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::files::Identity;
use crate::loader::DecodedImage;

// ---------------------------------------------------------------------------
// Frame cache
// ---------------------------------------------------------------------------

struct CacheEntry {
    image: Arc<DecodedImage>,
    bytes: u64,
    /// Logical access clock. Every insert and hit takes a fresh tick, so an
    /// entry never touched after insertion keeps its insertion order.
    last_access: u64,
}

/// Byte-bounded LRU of decoded frames keyed by [`Identity`].
///
/// The cache itself is plain data; callers hold the session lock around every
/// call (see [`crate::session`]). The entry for the current image is pinned
/// and never chosen for eviction.
pub struct FrameCache {
    entries: HashMap<Identity, CacheEntry>,
    current: Option<Identity>,
    used_bytes: u64,
    budget: u64,
    clock: u64,
}

impl FrameCache {
    pub fn new(budget: u64) -> Self {
        Self {
            entries: HashMap::new(),
            current: None,
            used_bytes: 0,
            budget,
            clock: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub fn set_current(&mut self, identity: Option<Identity>) {
        self.current = identity;
    }

    pub fn current(&self) -> Option<&Identity> {
        self.current.as_ref()
    }

    /// Non-blocking lookup. Counts as an access for LRU purposes.
    pub fn try_get(&mut self, identity: &Identity) -> Option<Arc<DecodedImage>> {
        let now = self.tick();
        let entry = self.entries.get_mut(identity)?;
        entry.last_access = now;
        Some(Arc::clone(&entry.image))
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.entries.contains_key(identity)
    }

    /// Insert or refresh an entry, evicting least-recently-used frames (never
    /// the current one) to stay within budget. Returns whether the frame is
    /// resident afterwards: a frame that cannot fit next to the pinned current
    /// frame is dropped instead of cached.
    pub fn put(&mut self, identity: Identity, image: Arc<DecodedImage>) -> bool {
        let bytes = image.mem_size();
        self.invalidate(&identity);

        let pinned = match &self.current {
            Some(cur) if *cur != identity => self.entries.get(cur).map(|e| e.bytes).unwrap_or(0),
            _ => 0,
        };
        if pinned + bytes > self.budget {
            log::debug!(
                "[cache] not caching {} ({} bytes, {} pinned, budget {})",
                identity.file_name(),
                bytes,
                pinned,
                self.budget
            );
            return false;
        }

        while self.used_bytes + bytes > self.budget {
            if !self.evict_lru() {
                return false;
            }
        }

        let last_access = self.tick();
        self.used_bytes += bytes;
        self.entries.insert(
            identity,
            CacheEntry {
                image,
                bytes,
                last_access,
            },
        );
        true
    }

    pub fn invalidate(&mut self, identity: &Identity) -> bool {
        match self.entries.remove(identity) {
            Some(old) => {
                self.used_bytes -= old.bytes;
                true
            }
            None => false,
        }
    }

    fn evict_lru(&mut self) -> bool {
        let victim = self
            .entries
            .iter()
            .filter(|(id, _)| Some(*id) != self.current.as_ref())
            .min_by_key(|(_, e)| e.last_access)
            .map(|(id, _)| id.clone());

        match victim {
            Some(id) => {
                log::debug!("[cache] evict {}", id.file_name());
                self.invalidate(&id)
            }
            None => false,
        }
    }

    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Thumbnails
// ---------------------------------------------------------------------------

/// Grid-view thumbnails, kept apart from the frame budget. Each one is at most
/// [`crate::loader::THUMB_SIZE`] square, so the store grows by a bounded amount
/// per listed image. Failures are remembered so they are not retried.
#[derive(Default)]
pub struct ThumbnailStore {
    thumbs: HashMap<Identity, Arc<DecodedImage>>,
    failed: HashSet<Identity>,
    bytes: u64,
}

impl ThumbnailStore {
    pub fn get(&self, identity: &Identity) -> Option<Arc<DecodedImage>> {
        self.thumbs.get(identity).cloned()
    }

    /// Whether there is nothing left to do for `identity`.
    pub fn is_settled(&self, identity: &Identity) -> bool {
        self.thumbs.contains_key(identity) || self.failed.contains(identity)
    }

    pub fn insert(&mut self, identity: Identity, thumb: Arc<DecodedImage>) {
        self.bytes += thumb.mem_size();
        if let Some(old) = self.thumbs.insert(identity, thumb) {
            self.bytes -= old.mem_size();
        }
    }

    pub fn mark_failed(&mut self, identity: Identity) {
        self.failed.insert(identity);
    }

    pub fn remove(&mut self, identity: &Identity) {
        if let Some(old) = self.thumbs.remove(identity) {
            self.bytes -= old.mem_size();
        }
        self.failed.remove(identity);
    }

    pub fn len(&self) -> usize {
        self.thumbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thumbs.is_empty()
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}
