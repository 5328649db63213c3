// File: src/background/config.rs

use std::time::Duration;

use crate::config::Config;

/// Global background jobs configuration
///
/// Per-pool periods (writer, precreation) come from each pool's config.
#[derive(Debug, Clone)]
pub struct BackgroundConfig {
    /// Disable all background jobs (for testing)
    pub disabled: bool,
    pub revival_interval: Duration,
    pub cache_sweep_interval: Duration,
    pub underflow_report_interval: Duration,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            revival_interval: Duration::from_secs(3600),
            cache_sweep_interval: Duration::from_secs(3600),
            underflow_report_interval: Duration::from_secs(1),
        }
    }
}

impl BackgroundConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            revival_interval: Duration::from_secs(config.revival_interval_secs.max(1)),
            cache_sweep_interval: Duration::from_secs(config.cache.sweep_interval_secs.max(1)),
            ..Self::default()
        }
    }

    /// Configuration with every job switched off
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }
}
