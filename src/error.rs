//! Error types for the sync engine.

use thiserror::Error;

/// Result type alias using the engine's error.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors surfaced by pairing, push and pull.
///
/// Every variant is scoped to one record or one request; none of them leaves
/// the engine unusable.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("invalid record: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl SyncError {
    /// Stable code for transport error bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::Authentication(AuthError::MissingCredential) => "missing_auth",
            SyncError::Authentication(AuthError::MalformedCredential) => "invalid_auth",
            SyncError::Authentication(AuthError::InvalidCredential) => "invalid_token",
            SyncError::Authentication(AuthError::InvalidPairingCode) => "invalid_pairing_code",
            SyncError::Authentication(AuthError::DeviceDisabled(_)) => "device_disabled",
            SyncError::Validation(_) => "invalid_record",
            SyncError::Storage(_) => "storage_error",
        }
    }
}

/// Why a credential or pairing request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("credential required")]
    MissingCredential,

    #[error("credential is malformed")]
    MalformedCredential,

    /// Unknown credential or a device that has been disabled. The two are
    /// deliberately indistinguishable to the caller.
    #[error("credential is not valid")]
    InvalidCredential,

    #[error("pairing code rejected")]
    InvalidPairingCode,

    #[error("device '{0}' is disabled")]
    DeviceDisabled(String),
}

/// A record that cannot be applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The item did not deserialize: missing field, unknown enum value,
    /// wrong type.
    #[error("{0}")]
    Malformed(String),

    #[error("record id must not be empty")]
    EmptyId,

    #[error("writer device id must not be empty")]
    EmptyWriter,

    #[error("device id must not be empty")]
    EmptyDeviceId,

    #[error("version must be positive, got {0}")]
    NonPositiveVersion(i64),

    #[error("{field} must not be negative, got {value}")]
    NegativeTimestamp { field: &'static str, value: i64 },

    #[error("measurement value must be a finite number")]
    NonFiniteValue,

    #[error("unit must not be empty")]
    EmptyUnit,
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        ValidationError::Malformed(e.to_string())
    }
}
