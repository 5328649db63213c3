//! Aggregation id ↔ pool id mapping

use std::collections::BTreeMap;

use crate::config::Config;
use crate::error::{ServerError, ServerResult};

/// Maps aggregation ids to pools; an aggregation id defaults to its pool id
#[derive(Debug, Clone, Default)]
pub struct AggregationIds {
    base_url: String,
    by_aggregation: BTreeMap<String, String>,
    by_pool: BTreeMap<String, String>,
}

impl AggregationIds {
    pub fn from_config(config: &Config) -> ServerResult<Self> {
        let mut ids = Self {
            base_url: config.base_url().to_string(),
            ..Self::default()
        };
        for (pool_id, pool) in &config.pools {
            let aggregation_id = pool.aggregation_id.as_deref().unwrap_or(pool_id);
            if ids
                .by_aggregation
                .insert(aggregation_id.to_string(), pool_id.clone())
                .is_some()
            {
                return Err(ServerError::Config(format!(
                    "aggregation id {aggregation_id} is used by more than one pool"
                )));
            }
            ids.by_pool
                .insert(pool_id.clone(), aggregation_id.to_string());
        }
        Ok(ids)
    }

    pub fn pool_for(&self, aggregation_id: &str) -> Option<&str> {
        self.by_aggregation.get(aggregation_id).map(String::as_str)
    }

    pub fn aggregation_id(&self, pool_id: &str) -> Option<&str> {
        self.by_pool.get(pool_id).map(String::as_str)
    }

    /// URI embedded in the pool's tokens
    pub fn uri_for_pool(&self, pool_id: &str) -> Option<String> {
        self.aggregation_id(pool_id)
            .map(|id| format!("{}/aggregation/{id}", self.base_url))
    }
}
