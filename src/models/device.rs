use serde::Serialize;

/// A paired device. Identified by the id the device chose for itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Device {
    pub device_id: String,
    pub name: Option<String>,
    pub created_ts: i64,
    pub last_seen_ts: i64,
    /// SHA-256 hex digest of the current credential.
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub enabled: bool,
}
