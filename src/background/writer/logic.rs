// File: src/background/writer/logic.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::{ServerError, ServerResult};
use crate::statuslist::{StatusBits, StatusList, StatusListToken, TokenFormat};
use crate::traits::{
    ListConfig, ListStorageMetadata, Storage, TokenRepository, TokenSigner,
};

/// Outcome of one pool pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// False if another writer held the pool lock
    pub locked: bool,
    pub checked: usize,
    pub written: usize,
    pub failed: usize,
}

/// Per-pool token settings the writer needs
#[derive(Debug, Clone)]
pub struct WriterSettings {
    pub pool_id: String,
    pub issuer: String,
    pub update_interval: Duration,
    pub list_lifetime: Duration,
    /// Embedded in every token of the pool
    pub aggregation_uri: Option<String>,
}

/// Regenerates a pool's published artifacts when its lists change
///
/// A list is regenerated iff its version differs from the version in the
/// stored metadata, or the stored artifacts expire within two update
/// intervals. Metadata is stored only after all four artifacts.
pub struct StatusListWriter {
    settings: WriterSettings,
    storage: Arc<dyn Storage>,
    tokens: Arc<dyn TokenRepository>,
    signer: Arc<dyn TokenSigner>,
}

impl StatusListWriter {
    pub fn new(
        settings: WriterSettings,
        storage: Arc<dyn Storage>,
        tokens: Arc<dyn TokenRepository>,
        signer: Arc<dyn TokenSigner>,
    ) -> Self {
        Self {
            settings,
            storage,
            tokens,
            signer,
        }
    }

    pub fn pool_id(&self) -> &str {
        &self.settings.pool_id
    }

    pub fn update_interval(&self) -> Duration {
        self.settings.update_interval
    }

    /// One writer pass over every list of the pool
    ///
    /// Skips the pass if the pool lock is held elsewhere. A failing list is
    /// logged and does not stop the others.
    pub async fn write_pool(&self) -> ServerResult<WriteSummary> {
        let pool_id = self.pool_id();
        let Some(_lease) = self
            .tokens
            .obtain_pool_lock(pool_id, self.settings.update_interval)
            .await?
        else {
            tracing::debug!(pool_id, "Writer lock held elsewhere, skipping");
            return Ok(WriteSummary::default());
        };

        let mut summary = WriteSummary {
            locked: true,
            ..Default::default()
        };
        for list_uri in self.storage.all_list_uris(pool_id).await? {
            summary.checked += 1;
            match self.write_list_token(&list_uri).await {
                Ok(true) => summary.written += 1,
                Ok(false) => {}
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(pool_id, list_uri = %list_uri, error = %e, "Writing list token failed");
                }
            }
        }

        if summary.written > 0 || summary.failed > 0 {
            tracing::info!(
                pool_id,
                checked = summary.checked,
                written = summary.written,
                failed = summary.failed,
                "Writer pass finished"
            );
        }
        Ok(summary)
    }

    /// Regenerate one list's artifacts if stale; true if written
    pub async fn write_list_token(&self, list_uri: &str) -> ServerResult<bool> {
        let list = self.storage.list_config(list_uri, false).await?;
        let metadata = self.tokens.metadata(list.list_id).await?;

        if !self.needs_regeneration(&list, &metadata) {
            return Ok(false);
        }
        self.regenerate(&list, list_uri).await?;
        Ok(true)
    }

    fn needs_regeneration(&self, list: &ListConfig, metadata: &ListStorageMetadata) -> bool {
        if metadata.version != list.version {
            return true;
        }
        let horizon = Utc::now()
            + chrono::Duration::from_std(self.settings.update_interval * 2)
                .unwrap_or(chrono::Duration::MAX);
        metadata.expires_at.map_or(true, |expires_at| expires_at <= horizon)
    }

    async fn regenerate(&self, list: &ListConfig, list_uri: &str) -> ServerResult<()> {
        let bits = StatusBits::from_u8(list.bits)
            .ok_or_else(|| ServerError::Internal(format!("list {list_uri} has invalid bits")))?;
        let data = self.storage.list_data(list_uri).await?;

        let issued_at = Utc::now();
        let expires_at = issued_at
            + chrono::Duration::from_std(self.settings.list_lifetime)
                .map_err(|e| ServerError::Config(format!("list lifetime: {e}")))?;

        let token = StatusListToken {
            list_uri: list_uri.to_string(),
            issuer: self.settings.issuer.clone(),
            issued_at,
            expires_at,
            ttl: self.settings.update_interval,
            aggregation_uri: self.settings.aggregation_uri.clone(),
            list: StatusList::from_bytes(bits, data),
        };

        let artifacts = [
            (TokenFormat::Jwt, self.signer.sign_jwt(&token)?.into_bytes()),
            (TokenFormat::Cwt, self.signer.sign_cwt(&token)?),
            (TokenFormat::Json, token.to_json_bytes()?),
            (TokenFormat::Cbor, token.to_cbor_bytes()?),
        ];
        for (format, bytes) in &artifacts {
            self.tokens.store(list.list_id, *format, bytes).await?;
        }

        self.tokens
            .store_metadata(&ListStorageMetadata {
                list_id: list.list_id,
                version: list.version,
                expires_at: Some(expires_at),
            })
            .await?;

        tracing::debug!(
            pool_id = %self.settings.pool_id,
            list_uri,
            version = list.version,
            "List token written"
        );
        Ok(())
    }
}
