//! The clock authority.
//!
//! One row (`id = 1`) in `server_clock` holds the counter shared by every
//! record family. The row is created by the first write that needs it and is
//! only ever incremented inside a write transaction, so the value survives
//! restarts and tokens are never reused.

use sqlx::{SqliteConnection, SqlitePool};

/// Takes the write lock on the clock row, creating it at 0 if needed.
///
/// Must be the first statement of a write transaction: every accepted write
/// funnels through this row, so two transactions racing on the same record
/// are serialized before either reads the existing version.
pub async fn acquire(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO server_clock (id, counter) VALUES (1, 0)
        ON CONFLICT(id) DO UPDATE SET counter = counter
        "#,
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Increments the counter and returns the new token.
pub async fn advance(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (counter,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO server_clock (id, counter) VALUES (1, 1)
        ON CONFLICT(id) DO UPDATE SET counter = counter + 1
        RETURNING counter
        "#,
    )
    .fetch_one(&mut *conn)
    .await?;
    Ok(counter)
}

/// Reads the counter without changing it. 0 before the first accepted write.
pub async fn read(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT counter FROM server_clock WHERE id = 1")
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|(c,)| c).unwrap_or(0))
}

/// Pool-level handle for callers that are not already inside a transaction.
#[derive(Debug, Clone)]
pub struct ClockAuthority {
    pool: SqlitePool,
}

impl ClockAuthority {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Current value of the counter.
    pub async fn current(&self) -> Result<i64, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        read(&mut conn).await
    }

    /// Issues a fresh token in its own transaction.
    pub async fn next(&self) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let token = advance(&mut tx).await?;
        tx.commit().await?;
        Ok(token)
    }
}
