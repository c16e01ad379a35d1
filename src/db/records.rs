//! The record store: keyed upsert storage for each record family.
//!
//! Every function takes a connection so callers can run it inside the same
//! transaction that issues the record's clock token.

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite, SqliteConnection};

use crate::models::SyncRecord;

/// Table mapping for one record family.
pub trait RecordTable: SyncRecord {
    /// Raw row as read from SQLite.
    type Row: for<'r> FromRow<'r, SqliteRow> + Send + Unpin;

    const TABLE: &'static str;
    const SELECT_BY_ID: &'static str;
    /// Binds `(since, until)`; must order by `server_clock` ascending.
    const SELECT_SINCE: &'static str;
    /// Full-row upsert keyed by the record id.
    const UPSERT: &'static str;

    fn from_row(row: Self::Row) -> Result<Self, sqlx::Error>;

    /// Binds every column of [`Self::UPSERT`] in order.
    fn bind_upsert<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>>;
}

pub async fn get<R: RecordTable>(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<R>, sqlx::Error> {
    let row = sqlx::query_as::<_, R::Row>(R::SELECT_BY_ID)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(R::from_row).transpose()
}

/// Inserts or fully replaces the row with the record's id.
pub async fn put<R: RecordTable>(conn: &mut SqliteConnection, record: &R) -> Result<(), sqlx::Error> {
    record
        .bind_upsert(sqlx::query(R::UPSERT))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Records with `since < server_clock <= until`, ascending by clock.
pub async fn list_since<R: RecordTable>(
    conn: &mut SqliteConnection,
    since: i64,
    until: i64,
) -> Result<Vec<R>, sqlx::Error> {
    let rows = sqlx::query_as::<_, R::Row>(R::SELECT_SINCE)
        .bind(since)
        .bind(until)
        .fetch_all(&mut *conn)
        .await?;
    rows.into_iter().map(R::from_row).collect()
}

/// Number of rows in the family, tombstones included.
pub async fn count<R: RecordTable>(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", R::TABLE))
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Wraps a column parse failure as a decode error.
pub(crate) fn decode_error(
    e: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> sqlx::Error {
    sqlx::Error::Decode(e.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::{Event, EventKind, GrowthCategory, GrowthData};
    use serde_json::json;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    struct TestContext {
        pool: SqlitePool,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(temp_dir.path().join("test.db")).await.unwrap();
        TestContext {
            pool,
            _temp_dir: temp_dir,
        }
    }

    fn sample_event(id: &str, clock: i64) -> Event {
        let payload = json!({"side": "left", "ml": 90}).as_object().unwrap().clone();
        let mut event = Event::new(id, EventKind::Feed, "phone", 100)
            .with_details("bottle")
            .with_payload(payload)
            .with_span(100, Some(700));
        event.server_clock = clock;
        event
    }

    #[tokio::test]
    async fn test_put_and_get_event() {
        let ctx = setup().await;
        let mut conn = ctx.pool.acquire().await.unwrap();

        let event = sample_event("e1", 1);
        put(&mut conn, &event).await.unwrap();

        let fetched: Event = get(&mut conn, "e1").await.unwrap().unwrap();
        assert_eq!(fetched, event);
        assert_eq!(fetched.payload.unwrap()["ml"], 90);
    }

    #[tokio::test]
    async fn test_payload_key_order_preserved() {
        let ctx = setup().await;
        let mut conn = ctx.pool.acquire().await.unwrap();

        let payload = json!({"z": 1, "a": 2, "m": {"y": 0, "b": 1}})
            .as_object()
            .unwrap()
            .clone();
        let event = Event::new("e1", EventKind::Feed, "phone", 100).with_payload(payload);
        put(&mut conn, &event).await.unwrap();

        let fetched: Event = get(&mut conn, "e1").await.unwrap().unwrap();
        let payload = fetched.payload.unwrap();
        let keys: Vec<&str> = payload.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(
            serde_json::to_string(&payload["m"]).unwrap(),
            r#"{"y":0,"b":1}"#
        );
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let ctx = setup().await;
        let mut conn = ctx.pool.acquire().await.unwrap();

        let fetched: Option<Event> = get(&mut conn, "nope").await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_whole_row() {
        let ctx = setup().await;
        let mut conn = ctx.pool.acquire().await.unwrap();

        put(&mut conn, &sample_event("e1", 1)).await.unwrap();

        let mut replacement = Event::new("e1", EventKind::Sleep, "tablet", 200);
        replacement.version = 2;
        replacement.server_clock = 2;
        put(&mut conn, &replacement).await.unwrap();

        let fetched: Event = get(&mut conn, "e1").await.unwrap().unwrap();
        assert_eq!(fetched.kind, EventKind::Sleep);
        assert!(fetched.details.is_none());
        assert!(fetched.payload.is_none());
        assert!(fetched.start_ts.is_none());
        assert_eq!(count::<Event>(&mut conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_since_is_ascending_and_bounded() {
        let ctx = setup().await;
        let mut conn = ctx.pool.acquire().await.unwrap();

        put(&mut conn, &sample_event("c", 3)).await.unwrap();
        put(&mut conn, &sample_event("a", 1)).await.unwrap();
        put(&mut conn, &sample_event("b", 2)).await.unwrap();
        put(&mut conn, &sample_event("d", 4)).await.unwrap();

        let listed: Vec<Event> = list_since(&mut conn, 1, 3).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_growth_roundtrip_keeps_tombstone() {
        let ctx = setup().await;
        let mut conn = ctx.pool.acquire().await.unwrap();

        let mut growth = GrowthData::new("g1", GrowthCategory::Head, 35.5, "cm", "phone", 50);
        growth.deleted = true;
        growth.server_clock = 9;
        put(&mut conn, &growth).await.unwrap();

        let fetched: GrowthData = get(&mut conn, "g1").await.unwrap().unwrap();
        assert_eq!(fetched, growth);

        let listed: Vec<GrowthData> = list_since(&mut conn, 0, 9).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].deleted);
    }

    #[tokio::test]
    async fn test_families_are_separate_tables() {
        let ctx = setup().await;
        let mut conn = ctx.pool.acquire().await.unwrap();

        put(&mut conn, &sample_event("same-id", 1)).await.unwrap();

        let growth: Option<GrowthData> = get(&mut conn, "same-id").await.unwrap();
        assert!(growth.is_none());
        assert_eq!(count::<GrowthData>(&mut conn).await.unwrap(), 0);
    }
}
