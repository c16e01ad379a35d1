//! SQLite persistence: devices, the clock row, both record families and
//! per-device watermarks.

pub mod clock;
mod device_repo;
mod event_table;
mod growth_table;
pub mod records;
mod watermark_repo;

pub use clock::ClockAuthority;
pub use device_repo::{CredentialUpdate, DeviceRepository};
pub use records::RecordTable;
pub use watermark_repo::{Watermark, WatermarkRepository};

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::time::Duration;

/// How long a write waits for another connection's transaction to finish.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialize the database connection pool and run migrations
pub async fn init_db(path: impl AsRef<Path>) -> Result<SqlitePool, sqlx::Error> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::debug!("Database ready at {}", path.display());

    Ok(pool)
}
