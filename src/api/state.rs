//! Application state shared across HTTP handlers

use std::sync::Arc;

use crate::service::StatusListService;
use crate::stats::TracingStats;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StatusListService>,

    /// Counters reported by the health endpoint
    pub stats: Arc<TracingStats>,
}
