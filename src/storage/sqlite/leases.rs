// File: src/storage/sqlite/leases.rs

use super::store::{lock_conn, SqliteStore};
use crate::error::StorageError;
use crate::traits::Lease;
use rusqlite::{params, Connection};
use std::sync::TryLockError;
use std::time::Duration;
use uuid::Uuid;

impl SqliteStore {
    /// Take the named lease unless an unexpired holder exists
    pub(crate) async fn obtain_lease_impl(
        &self,
        name: &str,
        ttl: Duration,
    ) -> Result<Option<Lease>, StorageError> {
        let holder = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp_millis();
        let expires_at = now + ttl.as_millis() as i64;

        let key = name.to_string();
        let lease_holder = holder.clone();
        let acquired = self
            .write_tx(name, move |tx| {
                let changed = tx.execute(
                    "INSERT INTO leases (name, holder, expires_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(name) DO UPDATE SET holder = excluded.holder, expires_at = excluded.expires_at
                     WHERE leases.expires_at <= ?4",
                    params![key, lease_holder, expires_at, now],
                )?;
                Ok(changed == 1)
            })
            .await?;

        if !acquired {
            return Ok(None);
        }

        let conn = self.conn_handle();
        let lease_name = name.to_string();
        Ok(Some(Lease::new(name, move || {
            let busy = match conn.try_lock() {
                Ok(guard) => {
                    delete_lease(&guard, &lease_name, &holder);
                    false
                }
                Err(TryLockError::WouldBlock) => true,
                Err(TryLockError::Poisoned(_)) => false,
            };
            if !busy {
                return;
            }

            // Queue behind the running statement instead of blocking the caller
            let release = move || {
                if let Ok(guard) = lock_conn(&conn) {
                    delete_lease(&guard, &lease_name, &holder);
                }
            };
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn_blocking(release);
                }
                Err(_) => release(),
            }
        })))
    }
}

fn delete_lease(conn: &Connection, name: &str, holder: &str) {
    if let Err(e) = conn.execute(
        "DELETE FROM leases WHERE name = ?1 AND holder = ?2",
        params![name, holder],
    ) {
        tracing::warn!(lease = %name, error = %e, "Failed to release lease");
    }
}
