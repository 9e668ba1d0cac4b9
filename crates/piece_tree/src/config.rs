/// Default size, in bytes, of the chunks a large insert is split into.
pub const AVERAGE_BUFFER_SIZE: usize = 64 * 1024;

/// Tunables of a [`PieceTree`](crate::PieceTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceTreeConfig {
    average_buffer_size: usize,
    search_cache_limit: usize,
}

impl Default for PieceTreeConfig {
    fn default() -> Self {
        Self {
            average_buffer_size: AVERAGE_BUFFER_SIZE,
            search_cache_limit: 1,
        }
    }
}

impl PieceTreeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts longer than this are stored as separate immutable chunks.
    /// Clamped to at least 1.
    pub fn with_average_buffer_size(mut self, size: usize) -> Self {
        self.average_buffer_size = size.max(1);
        self
    }

    /// Number of recently resolved nodes kept by the position cache.
    /// Clamped to at least 1.
    pub fn with_search_cache_limit(mut self, limit: usize) -> Self {
        self.search_cache_limit = limit.max(1);
        self
    }

    pub fn average_buffer_size(&self) -> usize {
        self.average_buffer_size
    }

    pub fn search_cache_limit(&self) -> usize {
        self.search_cache_limit
    }
}
