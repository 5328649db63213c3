//! Metrics collaborator

use std::fmt;

/// Serving cache outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEvent {
    Hit,
    Miss,
    Evicted,
}

impl CacheEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheEvent::Hit => "hit",
            CacheEvent::Miss => "miss",
            CacheEvent::Evicted => "evicted",
        }
    }
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives engine events for observability
pub trait StatsSink: Send + Sync + 'static {
    fn list_created(&self, pool_id: &str, list_uri: &str, size: u32);

    fn indices_taken(&self, pool_id: &str, list_uri: &str, amount: usize);

    fn indices_freed(&self, pool_id: &str, list_uri: &str, amount: usize);

    /// Indices handed to a caller out of the prefetch buffer
    fn indices_reserved(&self, pool_id: &str, list_uri: &str, amount: usize);

    fn status_updated(&self, pool_id: &str, list_uri: &str);

    fn cache_event(&self, event: CacheEvent);
}
