/// Tunables for one viewer session.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Upper bound on decoded bytes held by the frame cache.
    pub cache_budget: u64,
    /// Neighbours to keep warm in the navigation direction.
    pub preload_ahead: usize,
    /// Neighbours to keep warm behind.
    pub preload_behind: usize,
    pub decode_workers: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            cache_budget: 512 * 1024 * 1024,
            preload_ahead: 2,
            preload_behind: 1,
            decode_workers: 2,
        }
    }
}
