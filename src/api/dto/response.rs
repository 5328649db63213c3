//! Response DTOs

use serde::{Deserialize, Serialize};

use crate::prefetch::Reference;
use crate::stats::StatsSnapshot;

/// One allocated slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDto {
    pub uri: String,
    pub index: u32,
}

impl From<Reference> for ReferenceDto {
    fn from(r: Reference) -> Self {
        Self {
            uri: r.uri,
            index: r.index,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewReferencesResponse {
    pub references: Vec<ReferenceDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AggregationResponse {
    pub status_lists: Vec<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,

    /// Storage backend name
    pub backend: String,

    pub pools: Vec<String>,

    pub stats: StatsSnapshot,

    /// Error message if unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
