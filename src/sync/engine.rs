//! Push and pull coordination.
//!
//! Each pushed record is applied in its own transaction:
//!
//! ```text
//! BEGIN
//!   lock clock row        (serializes racing writers)
//!   read existing by id
//!   resolve               (last-write-wins)
//!   if changed:
//!     issue next token
//!     upsert record with token
//! COMMIT
//! ```
//!
//! A token therefore exists if and only if the record carrying it was
//! committed, and commit order equals token order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use super::credentials::{CredentialStore, PairResponse};
use super::resolver::{resolve, Resolution};
use super::unix_now;
use crate::db::{clock, records, RecordTable, WatermarkRepository};
use crate::error::{Result, ValidationError};
use crate::models::Device;

/// Result slot for one pushed item, in submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResult<R> {
    /// The stored version after resolution. `None` when the item was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<R>,
    /// True when this item became the stored version.
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResponse<R> {
    /// Clock value after the whole batch.
    pub server_clock: i64,
    pub results: Vec<PushResult<R>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullResponse<R> {
    /// Clock value the records were read at; the client's next watermark.
    pub server_clock: i64,
    /// Every record with `since < server_clock <= self.server_clock`, ascending.
    pub records: Vec<R>,
}

/// The sync coordinator.
pub struct SyncEngine {
    pool: SqlitePool,
    credentials: CredentialStore,
    watermarks: WatermarkRepository,
}

impl SyncEngine {
    pub fn new(pool: SqlitePool, pairing_code: Option<String>) -> Self {
        Self {
            credentials: CredentialStore::new(pool.clone(), pairing_code),
            watermarks: WatermarkRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn watermarks(&self) -> &WatermarkRepository {
        &self.watermarks
    }

    pub async fn pair(
        &self,
        pairing_code: &str,
        device_id: &str,
        name: Option<&str>,
    ) -> Result<PairResponse> {
        self.credentials.pair(pairing_code, device_id, name).await
    }

    pub async fn authenticate(&self, credential: &str) -> Result<Device> {
        self.credentials.authenticate(credential).await
    }

    /// Current clock value.
    pub async fn server_clock(&self) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Ok(clock::read(&mut conn).await?)
    }

    /// Applies a batch of raw items.
    ///
    /// Items that fail to parse or validate are reported in their slot and
    /// skipped; they never consume a token and never stop their siblings. A
    /// storage failure stops the batch and is returned: records applied before
    /// it stay committed, and resubmitting the whole batch is safe.
    pub async fn push<R: RecordTable>(
        &self,
        device: &Device,
        items: Vec<Value>,
    ) -> Result<PushResponse<R>> {
        let parsed = items
            .into_iter()
            .map(|item| serde_json::from_value::<R>(item).map_err(ValidationError::from))
            .collect();
        self.push_parsed(device, parsed).await
    }

    /// Typed variant of [`Self::push`] for in-process callers.
    pub async fn push_records<R: RecordTable>(
        &self,
        device: &Device,
        records: Vec<R>,
    ) -> Result<PushResponse<R>> {
        self.push_parsed(device, records.into_iter().map(Ok).collect())
            .await
    }

    async fn push_parsed<R: RecordTable>(
        &self,
        device: &Device,
        items: Vec<std::result::Result<R, ValidationError>>,
    ) -> Result<PushResponse<R>> {
        let mut results = Vec::with_capacity(items.len());
        let (mut applied, mut kept, mut rejected) = (0usize, 0usize, 0usize);

        for (index, item) in items.into_iter().enumerate() {
            let incoming = match item.and_then(|r| r.validate().map(|()| r)) {
                Ok(record) => record,
                Err(e) => {
                    tracing::debug!(
                        device_id = %device.device_id,
                        family = R::FAMILY,
                        index,
                        "Rejected item: {}",
                        e
                    );
                    rejected += 1;
                    results.push(PushResult {
                        record: None,
                        applied: false,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            if incoming.writer_device_id() != device.device_id {
                tracing::debug!(
                    device_id = %device.device_id,
                    writer = incoming.writer_device_id(),
                    record_id = incoming.record_id(),
                    "Relaying record written by another device"
                );
            }

            let resolution = self.apply(incoming).await.inspect_err(|e| {
                tracing::error!(
                    device_id = %device.device_id,
                    family = R::FAMILY,
                    index,
                    "Push aborted: {}",
                    e
                );
            })?;

            if resolution.changed {
                applied += 1;
            } else {
                kept += 1;
            }
            results.push(PushResult {
                record: Some(resolution.winner),
                applied: resolution.changed,
                error: None,
            });
        }

        let server_clock = self.server_clock().await?;

        tracing::info!(
            device_id = %device.device_id,
            family = R::FAMILY,
            applied,
            kept,
            rejected,
            server_clock,
            "Push complete"
        );

        Ok(PushResponse {
            server_clock,
            results,
        })
    }

    /// Resolves one record against the stored version and persists the
    /// winner with a fresh token, atomically.
    async fn apply<R: RecordTable>(&self, mut incoming: R) -> Result<Resolution<R>> {
        // Never trust a client-supplied token.
        incoming.set_server_clock(0);

        let mut tx = self.pool.begin().await?;
        clock::acquire(&mut tx).await?;

        let existing = records::get::<R>(&mut tx, incoming.record_id()).await?;
        let mut resolution = resolve(existing, incoming);

        if resolution.changed {
            let token = clock::advance(&mut tx).await?;
            resolution.winner.set_server_clock(token);
            records::put(&mut tx, &resolution.winner).await?;
            tx.commit().await?;

            tracing::debug!(
                family = R::FAMILY,
                record_id = resolution.winner.record_id(),
                version = resolution.winner.version(),
                deleted = resolution.winner.is_deleted(),
                token,
                "Applied"
            );
        } else {
            tx.rollback().await?;

            tracing::debug!(
                family = R::FAMILY,
                record_id = resolution.winner.record_id(),
                "Kept stored version"
            );
        }

        Ok(resolution)
    }

    /// Returns every record accepted after `since`, with the clock value they
    /// were read at.
    ///
    /// Clock and records come from one read snapshot, so no record with a
    /// token at or below the returned clock can be missed by a client that
    /// advances its watermark to it.
    pub async fn pull<R: RecordTable>(&self, device: &Device, since: i64) -> Result<PullResponse<R>> {
        let mut tx = self.pool.begin().await?;
        let server_clock = clock::read(&mut tx).await?;
        let records = records::list_since::<R>(&mut tx, since, server_clock).await?;
        tx.commit().await?;

        tracing::debug!(
            device_id = %device.device_id,
            family = R::FAMILY,
            since,
            server_clock,
            count = records.len(),
            "Pull"
        );

        if let Err(e) = self
            .watermarks
            .record(&device.device_id, server_clock, unix_now())
            .await
        {
            tracing::warn!(device_id = %device.device_id, "Failed to record watermark: {}", e);
        }

        Ok(PullResponse {
            server_clock,
            records,
        })
    }
}
