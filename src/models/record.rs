use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ValidationError;

/// A syncable row: identified by a caller-chosen id, versioned by its writer
/// and stamped with a server clock token once accepted.
pub trait SyncRecord: Clone + Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    /// Family name used in logs.
    const FAMILY: &'static str;

    fn record_id(&self) -> &str;
    fn version(&self) -> i64;
    fn updated_ts(&self) -> i64;
    fn writer_device_id(&self) -> &str;
    fn server_clock(&self) -> i64;
    fn set_server_clock(&mut self, clock: i64);
    fn is_deleted(&self) -> bool;

    /// Checks invariants that the wire format alone cannot express.
    fn validate(&self) -> Result<(), ValidationError>;

    /// The ordered tuple compared by last-write-wins.
    fn lww_key(&self) -> (i64, i64, &[u8]) {
        (
            self.version(),
            self.updated_ts(),
            self.writer_device_id().as_bytes(),
        )
    }
}

/// Shared checks for the lifecycle fields every record carries.
pub(crate) fn validate_common(
    id: &str,
    writer: &str,
    version: i64,
    created_ts: i64,
    updated_ts: i64,
) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::EmptyId);
    }
    if writer.trim().is_empty() {
        return Err(ValidationError::EmptyWriter);
    }
    if version < 1 {
        return Err(ValidationError::NonPositiveVersion(version));
    }
    for (field, value) in [("created_ts", created_ts), ("updated_ts", updated_ts)] {
        if value < 0 {
            return Err(ValidationError::NegativeTimestamp { field, value });
        }
    }
    Ok(())
}
