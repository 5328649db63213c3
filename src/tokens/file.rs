//! File-backed token repository
//!
//! Layout under the storage directory:
//! - `<format>/<list_id>` one artifact per format
//! - `metadata/<list_id>` JSON [`ListStorageMetadata`]
//! - `locks/<pool_id>.lock` writer lease holding `<holder> <expiry millis>`

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::TokenStoreError;
use crate::statuslist::TokenFormat;
use crate::traits::{Lease, ListStorageMetadata, TokenRepository};

const METADATA_DIR: &str = "metadata";
const LOCKS_DIR: &str = "locks";

pub struct FileTokenRepository {
    root: PathBuf,
}

impl FileTokenRepository {
    /// Open the repository, creating its directories
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, TokenStoreError> {
        let root = root.into();
        for format in TokenFormat::ALL {
            std::fs::create_dir_all(root.join(format.as_str()))?;
        }
        std::fs::create_dir_all(root.join(METADATA_DIR))?;
        std::fs::create_dir_all(root.join(LOCKS_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, list_id: Uuid, format: TokenFormat) -> PathBuf {
        self.root.join(format.as_str()).join(list_id.to_string())
    }

    fn metadata_path(&self, list_id: Uuid) -> PathBuf {
        self.root.join(METADATA_DIR).join(list_id.to_string())
    }

    fn lock_path(&self, pool_id: &str) -> Result<PathBuf, TokenStoreError> {
        if pool_id.is_empty() || pool_id.contains(['/', '\\', '.']) {
            return Err(TokenStoreError::InvalidListId(pool_id.to_string()));
        }
        Ok(self.root.join(LOCKS_DIR).join(format!("{pool_id}.lock")))
    }

    /// Publish a complete lock file unless one exists; true if published
    ///
    /// The content is written to a temp file first and hard-linked into
    /// place, so a lock file is never observed half written.
    async fn try_create_lock(path: &Path, content: &str) -> Result<bool, TokenStoreError> {
        let tmp = sibling(path, "tmp")?;
        write_synced(&tmp, content.as_bytes()).await?;
        let linked = tokio::fs::hard_link(&tmp, path).await;
        let _ = tokio::fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the lock read from `path` has outlived its holder
    ///
    /// Content without an expiry is judged by the file's age against `ttl`.
    async fn is_expired(
        path: &Path,
        content: &str,
        now: i64,
        ttl: Duration,
    ) -> Result<bool, TokenStoreError> {
        if let Some(expires_at) = lock_expiry(content) {
            return Ok(expires_at <= now);
        }
        let modified = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.modified()?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        Ok(modified.elapsed().map(|age| age >= ttl).unwrap_or(false))
    }

    /// Remove an expired lock file; true if the path is now free
    ///
    /// The file is renamed aside and only discarded if it still holds the
    /// expired content; a lock another contender published in between is
    /// put back.
    async fn reclaim_expired_lock(
        path: &Path,
        now: i64,
        ttl: Duration,
    ) -> Result<bool, TokenStoreError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        if !Self::is_expired(path, &content, now, ttl).await? {
            return Ok(false);
        }

        let aside = sibling(path, "stale")?;
        match tokio::fs::rename(path, &aside).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        }

        let moved = tokio::fs::read_to_string(&aside).await?;
        if moved != content {
            tracing::debug!(path = %path.display(), "Lock replaced during reclaim, restoring");
            let restored = tokio::fs::hard_link(&aside, path).await;
            let _ = tokio::fs::remove_file(&aside).await;
            return match restored {
                Ok(()) => Ok(false),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(e.into()),
            };
        }

        tokio::fs::remove_file(&aside).await?;
        Ok(true)
    }
}

/// Lock file content: `<holder> <expiry millis>`
fn lock_content(holder: &str, expires_at: i64) -> String {
    format!("{holder} {expires_at}")
}

fn lock_holder(content: &str) -> Option<&str> {
    content.split_whitespace().next()
}

fn lock_expiry(content: &str) -> Option<i64> {
    content
        .split_whitespace()
        .nth(1)
        .and_then(|v| v.parse::<i64>().ok())
}

/// Remove the lock file if `holder` still owns it
fn release_lock(path: &Path, holder: &str) {
    match std::fs::read_to_string(path) {
        Ok(content) if lock_holder(&content) == Some(holder) => {}
        _ => return,
    }
    let Ok(aside) = sibling(path, "release") else {
        return;
    };
    if std::fs::rename(path, &aside).is_err() {
        return;
    }

    let ours = std::fs::read_to_string(&aside)
        .map(|content| lock_holder(&content) == Some(holder))
        .unwrap_or(false);
    if !ours {
        // Reclaimed and republished since the check above
        let _ = std::fs::hard_link(&aside, path);
    }
    if let Err(e) = std::fs::remove_file(&aside) {
        tracing::warn!(path = %aside.display(), error = %e, "Failed to remove lock file");
    }
}

/// Hidden, unique sibling of `path`
fn sibling(path: &Path, suffix: &str) -> Result<PathBuf, TokenStoreError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| TokenStoreError::InvalidListId(path.display().to_string()))?;
    Ok(path.with_file_name(format!(".{file_name}.{}.{suffix}", Uuid::new_v4())))
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), TokenStoreError> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

/// Write to a sibling temp file, then rename over the target
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), TokenStoreError> {
    let tmp = sibling(path, "tmp")?;
    write_synced(&tmp, bytes).await?;

    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl TokenRepository for FileTokenRepository {
    async fn obtain_pool_lock(
        &self,
        pool_id: &str,
        ttl: Duration,
    ) -> Result<Option<Lease>, TokenStoreError> {
        let path = self.lock_path(pool_id)?;
        let holder = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp_millis();
        let expires_at = now + ttl.as_millis() as i64;
        let content = lock_content(&holder, expires_at);

        let mut acquired = Self::try_create_lock(&path, &content).await?;
        if !acquired && Self::reclaim_expired_lock(&path, now, ttl).await? {
            acquired = Self::try_create_lock(&path, &content).await?;
        }
        if !acquired {
            return Ok(None);
        }

        let name = format!("writer:{pool_id}");
        Ok(Some(Lease::new(name, move || release_lock(&path, &holder))))
    }

    async fn metadata(&self, list_id: Uuid) -> Result<ListStorageMetadata, TokenStoreError> {
        match tokio::fs::read(self.metadata_path(list_id)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ListStorageMetadata::unwritten(list_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(
        &self,
        list_id: Uuid,
        format: TokenFormat,
        bytes: &[u8],
    ) -> Result<(), TokenStoreError> {
        write_atomic(&self.artifact_path(list_id, format), bytes).await
    }

    async fn store_metadata(&self, metadata: &ListStorageMetadata) -> Result<(), TokenStoreError> {
        let bytes = serde_json::to_vec(metadata)?;
        write_atomic(&self.metadata_path(metadata.list_id), &bytes).await
    }

    async fn load(
        &self,
        list_id: Uuid,
        format: TokenFormat,
    ) -> Result<Option<Vec<u8>>, TokenStoreError> {
        match tokio::fs::read(self.artifact_path(list_id, format)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn last_modified(
        &self,
        list_id: Uuid,
        format: TokenFormat,
    ) -> Result<Option<SystemTime>, TokenStoreError> {
        match tokio::fs::metadata(self.artifact_path(list_id, format)).await {
            Ok(meta) => Ok(Some(meta.modified()?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
