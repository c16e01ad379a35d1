use sqlx::SqlitePool;

use crate::models::Device;

pub struct DeviceRepository {
    pool: SqlitePool,
}

/// Outcome of [`DeviceRepository::upsert_credential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialUpdate {
    Stored,
    /// The device exists but is disabled; nothing was written.
    Disabled,
}

impl DeviceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, device_id: &str) -> Result<Option<Device>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM devices WHERE device_id = ?")
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Enabled device holding a credential with this digest.
    pub async fn find_enabled_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Device>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM devices WHERE token_hash = ? AND enabled = 1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
    }

    /// Creates the device or replaces its credential digest.
    ///
    /// `name` only overwrites the stored name when given. `created_ts` and
    /// `enabled` of an existing device are left alone, and a disabled device
    /// is not touched at all.
    pub async fn upsert_credential(
        &self,
        device_id: &str,
        name: Option<&str>,
        token_hash: &str,
        now: i64,
    ) -> Result<CredentialUpdate, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO devices (device_id, name, created_ts, last_seen_ts, token_hash, enabled)
            VALUES (?, ?, ?, ?, ?, 1)
            ON CONFLICT(device_id) DO UPDATE SET
                name = COALESCE(excluded.name, devices.name),
                last_seen_ts = excluded.last_seen_ts,
                token_hash = excluded.token_hash
            WHERE devices.enabled = 1
            "#,
        )
        .bind(device_id)
        .bind(name)
        .bind(now)
        .bind(now)
        .bind(token_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(CredentialUpdate::Disabled)
        } else {
            Ok(CredentialUpdate::Stored)
        }
    }

    /// Returns false when no such device exists.
    pub async fn set_enabled(&self, device_id: &str, enabled: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE devices SET enabled = ? WHERE device_id = ?")
            .bind(enabled)
            .bind(device_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list(&self) -> Result<Vec<Device>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM devices ORDER BY device_id")
            .fetch_all(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    struct TestContext {
        repo: DeviceRepository,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup_repo() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(temp_dir.path().join("test.db")).await.unwrap();
        TestContext {
            repo: DeviceRepository::new(pool),
            _temp_dir: temp_dir,
        }
    }

    #[tokio::test]
    async fn test_create_device() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        let update = repo
            .upsert_credential("phone", Some("Phone"), "hash1", 100)
            .await
            .unwrap();
        assert_eq!(update, CredentialUpdate::Stored);

        let device = repo.get("phone").await.unwrap().unwrap();
        assert_eq!(device.name.as_deref(), Some("Phone"));
        assert_eq!(device.created_ts, 100);
        assert_eq!(device.last_seen_ts, 100);
        assert_eq!(device.token_hash, "hash1");
        assert!(device.enabled);
    }

    #[tokio::test]
    async fn test_repair_keeps_name_and_created_ts() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        repo.upsert_credential("phone", Some("Phone"), "hash1", 100)
            .await
            .unwrap();
        repo.upsert_credential("phone", None, "hash2", 200)
            .await
            .unwrap();

        let device = repo.get("phone").await.unwrap().unwrap();
        assert_eq!(device.name.as_deref(), Some("Phone"));
        assert_eq!(device.created_ts, 100);
        assert_eq!(device.last_seen_ts, 200);
        assert_eq!(device.token_hash, "hash2");

        repo.upsert_credential("phone", Some("Kitchen phone"), "hash3", 300)
            .await
            .unwrap();
        let device = repo.get("phone").await.unwrap().unwrap();
        assert_eq!(device.name.as_deref(), Some("Kitchen phone"));
    }

    #[tokio::test]
    async fn test_find_by_token_hash_skips_disabled() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        repo.upsert_credential("phone", None, "hash1", 100)
            .await
            .unwrap();
        assert!(repo
            .find_enabled_by_token_hash("hash1")
            .await
            .unwrap()
            .is_some());

        assert!(repo.set_enabled("phone", false).await.unwrap());
        assert!(repo
            .find_enabled_by_token_hash("hash1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_disabled_device_credential_not_replaced() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        repo.upsert_credential("phone", None, "hash1", 100)
            .await
            .unwrap();
        repo.set_enabled("phone", false).await.unwrap();

        let update = repo
            .upsert_credential("phone", None, "hash2", 200)
            .await
            .unwrap();
        assert_eq!(update, CredentialUpdate::Disabled);

        let device = repo.get("phone").await.unwrap().unwrap();
        assert_eq!(device.token_hash, "hash1");
        assert!(!device.enabled);
    }

    #[tokio::test]
    async fn test_set_enabled_unknown_device() {
        let ctx = setup_repo().await;
        assert!(!ctx.repo.set_enabled("ghost", true).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let ctx = setup_repo().await;
        let repo = &ctx.repo;

        repo.upsert_credential("tablet", None, "h2", 1).await.unwrap();
        repo.upsert_credential("phone", None, "h1", 1).await.unwrap();

        let devices = repo.list().await.unwrap();
        let ids: Vec<&str> = devices.iter().map(|d| d.device_id.as_str()).collect();
        assert_eq!(ids, vec!["phone", "tablet"]);
    }
}
