//! Server and pool configuration

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{ServerError, ServerResult};

/// What `reserve` does when the prefetch buffer runs short
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderflowPolicy {
    /// Reject the request with a backpressure error
    #[default]
    Fail,
    /// Wait until the worker has refilled the buffer
    Delay,
}

/// Background list precreation settings
#[derive(Debug, Clone, Deserialize)]
pub struct PrecreationConfig {
    /// How often to check for spare lists (seconds)
    pub check_delay_secs: u64,
    /// Target number of untouched lists to keep ready
    pub lists: u32,
}

impl Default for PrecreationConfig {
    fn default() -> Self {
        Self {
            check_delay_secs: 60,
            lists: 1,
        }
    }
}

impl PrecreationConfig {
    pub fn check_delay(&self) -> Duration {
        Duration::from_secs(self.check_delay_secs)
    }
}

/// Prefetch buffer settings
#[derive(Debug, Clone, Deserialize)]
pub struct PrefetchConfig {
    /// Low-water mark that triggers a refill
    pub threshold: u32,
    /// Buffer size the refill aims for
    pub capacity: u32,
    #[serde(default)]
    pub on_underflow: UnderflowPolicy,
    /// Upper bound for DELAY waits (None = wait indefinitely)
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            threshold: 16,
            capacity: 32,
            on_underflow: UnderflowPolicy::Fail,
            max_delay_ms: None,
        }
    }
}

/// Ed25519 key material for a pool
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignerConfig {
    /// File holding a 32-byte seed (raw or hex)
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    /// Inline hex seed
    #[serde(default)]
    pub seed_hex: Option<String>,
    /// `kid` header value
    #[serde(default)]
    pub key_id: Option<String>,
}

/// Pool entry as written in the pools file
#[derive(Debug, Deserialize)]
struct RawPoolConfig {
    size: u32,
    bits: u8,
    issuer: String,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    api_keys: Option<Vec<String>>,
    #[serde(default)]
    precreation: PrecreationConfig,
    #[serde(default)]
    prefetch: PrefetchConfig,
    update_interval_secs: u64,
    list_lifetime_secs: u64,
    #[serde(default)]
    aggregation_id: Option<String>,
    #[serde(default)]
    signer: SignerConfig,
}

/// Configuration of one status list pool
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawPoolConfig")]
pub struct PoolConfig {
    pub size: u32,
    pub bits: u8,
    pub issuer: String,
    /// Lowercase hex SHA-256 digests of the accepted api keys
    pub api_key_hashes: Vec<String>,
    pub precreation: PrecreationConfig,
    pub prefetch: PrefetchConfig,
    pub update_interval_secs: u64,
    pub list_lifetime_secs: u64,
    pub aggregation_id: Option<String>,
    pub signer: SignerConfig,
}

impl TryFrom<RawPoolConfig> for PoolConfig {
    type Error = String;

    fn try_from(raw: RawPoolConfig) -> Result<Self, Self::Error> {
        let keys = match (raw.api_key, raw.api_keys) {
            (Some(key), None) => vec![key],
            (None, Some(keys)) if !keys.is_empty() => keys,
            (None, _) => return Err("either api_key or api_keys must be set".into()),
            (Some(_), Some(_)) => return Err("api_key and api_keys are mutually exclusive".into()),
        };

        Ok(Self {
            size: raw.size,
            bits: raw.bits,
            issuer: raw.issuer,
            api_key_hashes: keys.iter().map(|k| hash_api_key(k)).collect(),
            precreation: raw.precreation,
            prefetch: raw.prefetch,
            update_interval_secs: raw.update_interval_secs,
            list_lifetime_secs: raw.list_lifetime_secs,
            aggregation_id: raw.aggregation_id,
            signer: raw.signer,
        })
    }
}

impl PoolConfig {
    /// Pool with default prefetch/precreation settings and a single api key
    pub fn new(bits: u8, size: u32, issuer: impl Into<String>, api_key: &str) -> Self {
        Self {
            size,
            bits,
            issuer: issuer.into(),
            api_key_hashes: vec![hash_api_key(api_key)],
            precreation: PrecreationConfig::default(),
            prefetch: PrefetchConfig {
                threshold: size.min(16) / 2,
                capacity: size.min(32),
                ..PrefetchConfig::default()
            },
            update_interval_secs: 60,
            list_lifetime_secs: 3600,
            aggregation_id: None,
            signer: SignerConfig::default(),
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn list_lifetime(&self) -> Duration {
        Duration::from_secs(self.list_lifetime_secs)
    }

    /// Check a presented api key against the configured hashes
    pub fn accepts_api_key(&self, api_key: &str) -> bool {
        let presented = hash_api_key(api_key);
        self.api_key_hashes.iter().any(|h| *h == presented)
    }

    /// Validate pool invariants
    pub fn validate(&self, pool_id: &str) -> ServerResult<()> {
        let fail = |msg: String| Err(ServerError::Config(format!("pool {pool_id}: {msg}")));

        if !is_valid_pool_id(pool_id) {
            return fail("pool id must match [a-z0-9_-]+".into());
        }
        if !matches!(self.bits, 1 | 2 | 4 | 8) {
            return fail(format!("bits must be one of 1, 2, 4, 8 (got {})", self.bits));
        }
        if self.size == 0 || (u64::from(self.size) * u64::from(self.bits)) % 8 != 0 {
            return fail(format!(
                "size * bits must be a positive multiple of 8 (size={}, bits={})",
                self.size, self.bits
            ));
        }
        if self.prefetch.capacity == 0 || self.prefetch.threshold > self.prefetch.capacity {
            return fail(format!(
                "prefetch threshold ({}) must not exceed a non-zero capacity ({})",
                self.prefetch.threshold, self.prefetch.capacity
            ));
        }
        if self.size < self.prefetch.capacity {
            return fail(format!(
                "size ({}) must be at least prefetch capacity ({})",
                self.size, self.prefetch.capacity
            ));
        }
        if self.list_lifetime_secs <= self.update_interval_secs {
            return fail(format!(
                "list lifetime ({}s) must exceed update interval ({}s)",
                self.list_lifetime_secs, self.update_interval_secs
            ));
        }
        if self.precreation.lists < 1 {
            return fail("precreation.lists must be at least 1".into());
        }
        if self.precreation.check_delay_secs == 0 || self.update_interval_secs == 0 {
            return fail("intervals must be greater than zero".into());
        }
        if self.api_key_hashes.is_empty() {
            return fail("at least one api key is required".into());
        }
        Ok(())
    }
}

/// Lowercase hex SHA-256 of an api key
pub fn hash_api_key(api_key: &str) -> String {
    hex::encode(Sha256::digest(api_key.as_bytes()))
}

fn is_valid_pool_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Pools file layout
#[derive(Debug, Deserialize)]
struct PoolsFile {
    #[serde(default)]
    pools: BTreeMap<String, PoolConfig>,
}

/// Parse the `[pools.<id>]` tables of a TOML document
pub fn parse_pools(content: &str) -> ServerResult<BTreeMap<String, PoolConfig>> {
    let file: PoolsFile =
        toml::from_str(content).map_err(|e| ServerError::Config(format!("pools file: {e}")))?;
    Ok(file.pools)
}

/// Serving cache settings
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entries unused for this long are swept (seconds)
    pub duration_secs: u64,
    /// Sweep period (seconds)
    pub sweep_interval_secs: u64,
    /// Upper bound on cached artifacts
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            duration_secs: 3600,
            sweep_interval_secs: 3600,
            max_entries: 10_000,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Base URL of served lists; list uri = `{public_url}/{list_id}`
    pub public_url: String,
    /// Root directory of token artifacts
    pub storage_directory: PathBuf,
    pub database_path: String,
    pub log_level: String,
    pub cache: CacheConfig,
    /// How often inactive lists are checked for spare capacity (seconds)
    pub revival_interval_secs: u64,
    /// Write-conflict retry budget
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub pools: BTreeMap<String, PoolConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
            public_url: "http://localhost:8090".to_string(),
            storage_directory: PathBuf::from("./status-lists"),
            database_path: "./status-list.db".to_string(),
            log_level: "info".to_string(),
            cache: CacheConfig::default(),
            revival_interval_secs: 3600,
            retry_attempts: 10,
            retry_backoff_ms: 500,
            pools: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from environment variables (pools from `SLS_POOLS_FILE` if set)
    pub fn from_env() -> ServerResult<Self> {
        let defaults = Self::default();
        let mut config = Self {
            host: std::env::var("SLS_SERVER_HOST").unwrap_or(defaults.host),
            port: env_or("SLS_SERVER_PORT", defaults.port),
            public_url: std::env::var("SLS_PUBLIC_URL").unwrap_or(defaults.public_url),
            storage_directory: std::env::var("SLS_STORAGE_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_directory),
            database_path: std::env::var("SLS_DATABASE_PATH").unwrap_or(defaults.database_path),
            log_level: std::env::var("SLS_LOG_LEVEL").unwrap_or(defaults.log_level),
            cache: CacheConfig {
                duration_secs: env_or("SLS_CACHE_DURATION_SECS", defaults.cache.duration_secs),
                sweep_interval_secs: env_or(
                    "SLS_CACHE_SWEEP_INTERVAL_SECS",
                    defaults.cache.sweep_interval_secs,
                ),
                max_entries: env_or("SLS_CACHE_MAX_ENTRIES", defaults.cache.max_entries),
            },
            revival_interval_secs: env_or("SLS_REVIVAL_INTERVAL_SECS", defaults.revival_interval_secs),
            retry_attempts: env_or("SLS_RETRY_ATTEMPTS", defaults.retry_attempts),
            retry_backoff_ms: env_or("SLS_RETRY_BACKOFF_MS", defaults.retry_backoff_ms),
            pools: BTreeMap::new(),
        };

        if let Ok(path) = std::env::var("SLS_POOLS_FILE") {
            config.pools = Self::load_pools(Path::new(&path))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read and parse a pools file
    pub fn load_pools(path: &Path) -> ServerResult<BTreeMap<String, PoolConfig>> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("cannot read pools file {}: {e}", path.display()))
        })?;
        parse_pools(&content)
    }

    /// Validate every pool and cross-pool constraints
    pub fn validate(&self) -> ServerResult<()> {
        if self.public_url.is_empty() {
            return Err(ServerError::Config("public_url must be set".into()));
        }
        let mut aggregation_ids = HashSet::new();
        for (id, pool) in &self.pools {
            pool.validate(id)?;
            let aggregation_id = pool.aggregation_id.as_deref().unwrap_or(id);
            if !aggregation_ids.insert(aggregation_id.to_string()) {
                return Err(ServerError::Config(format!(
                    "aggregation id {aggregation_id} is used by more than one pool"
                )));
            }
        }
        Ok(())
    }

    /// Public URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }

    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache.duration_secs)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
