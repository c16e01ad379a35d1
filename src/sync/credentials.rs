//! Device credentials.
//!
//! Pairing mints a random bearer credential and stores only its SHA-256
//! digest. Re-pairing replaces the digest, so the previous credential stops
//! working immediately.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use super::unix_now;
use crate::db::{CredentialUpdate, DeviceRepository};
use crate::error::{AuthError, Result, ValidationError};
use crate::models::Device;

/// Credential handed back to a freshly paired device. The token is shown
/// exactly once; the server cannot recover it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairResponse {
    pub device_id: String,
    pub token: String,
}

/// Issues credentials and resolves them back to devices.
pub struct CredentialStore {
    devices: DeviceRepository,
    /// When set, pairing requests must present this code.
    pairing_code: Option<String>,
}

impl CredentialStore {
    pub fn new(pool: SqlitePool, pairing_code: Option<String>) -> Self {
        Self {
            devices: DeviceRepository::new(pool),
            pairing_code,
        }
    }

    /// Pairs (or re-pairs) a device and returns its new credential.
    pub async fn pair(
        &self,
        pairing_code: &str,
        device_id: &str,
        name: Option<&str>,
    ) -> Result<PairResponse> {
        if let Some(expected) = &self.pairing_code {
            if !codes_match(pairing_code, expected) {
                tracing::warn!(device_id, "Pairing rejected: wrong pairing code");
                return Err(AuthError::InvalidPairingCode.into());
            }
        }
        self.pair_unchecked(device_id, name).await
    }

    /// Pairs without checking the pairing code. For operator tooling that
    /// already has direct access to the database.
    pub async fn pair_unchecked(&self, device_id: &str, name: Option<&str>) -> Result<PairResponse> {
        if device_id.trim().is_empty() {
            return Err(ValidationError::EmptyDeviceId.into());
        }

        let token = generate_token();
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        match self
            .devices
            .upsert_credential(device_id, name, &hash_token(&token), unix_now())
            .await?
        {
            CredentialUpdate::Stored => {
                tracing::info!(device_id, "Device paired");
                Ok(PairResponse {
                    device_id: device_id.to_string(),
                    token,
                })
            }
            CredentialUpdate::Disabled => {
                tracing::warn!(device_id, "Pairing rejected: device is disabled");
                Err(AuthError::DeviceDisabled(device_id.to_string()).into())
            }
        }
    }

    /// Resolves a bearer credential to its enabled device.
    pub async fn authenticate(&self, credential: &str) -> Result<Device> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(AuthError::MissingCredential.into());
        }
        if !is_token_shaped(credential) {
            return Err(AuthError::MalformedCredential.into());
        }

        self.devices
            .find_enabled_by_token_hash(&hash_token(credential))
            .await?
            .ok_or_else(|| AuthError::InvalidCredential.into())
    }

    pub fn devices(&self) -> &DeviceRepository {
        &self.devices
    }
}

/// Extracts the credential from an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> std::result::Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredential)?;
    let (scheme, token) = header
        .split_once(' ')
        .ok_or(AuthError::MalformedCredential)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedCredential);
    }
    Ok(token.trim())
}

/// Hex SHA-256 digest of a credential, as stored in `devices.token_hash`.
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Generates a secure random token.
///
/// Returns 32 random bytes encoded as base64url (no padding).
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compares digests so the comparison time does not depend on how much of
/// the presented code is correct.
fn codes_match(presented: &str, expected: &str) -> bool {
    hash_token(presented) == hash_token(expected)
}

fn is_token_shaped(token: &str) -> bool {
    token.len() <= 512
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
