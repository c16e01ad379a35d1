use serde::Serialize;
use sqlx::SqlitePool;

/// Highest server clock handed to a device by a pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Watermark {
    pub device_id: String,
    pub last_clock: i64,
    pub updated_ts: i64,
}

pub struct WatermarkRepository {
    pool: SqlitePool,
}

impl WatermarkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Raises the device's watermark to `clock`; never lowers it.
    pub async fn record(&self, device_id: &str, clock: i64, now: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO watermarks (device_id, last_clock, updated_ts) VALUES (?, ?, ?)
            ON CONFLICT(device_id) DO UPDATE SET
                last_clock = MAX(watermarks.last_clock, excluded.last_clock),
                updated_ts = excluded.updated_ts
            "#,
        )
        .bind(device_id)
        .bind(clock)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, device_id: &str) -> Result<Option<Watermark>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM watermarks WHERE device_id = ?")
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list(&self) -> Result<Vec<Watermark>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM watermarks ORDER BY device_id")
            .fetch_all(&self.pool)
            .await
    }
}
