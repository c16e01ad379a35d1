use serde_json::{Map, Value};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;
use std::str::FromStr;

use super::records::{decode_error, RecordTable};
use crate::models::{Event, EventKind};

#[derive(sqlx::FromRow)]
pub struct EventRow {
    event_id: String,
    #[sqlx(rename = "type")]
    kind: String,
    details: Option<String>,
    payload: Option<String>,
    start_ts: Option<i64>,
    end_ts: Option<i64>,
    ts: Option<i64>,
    created_ts: i64,
    updated_ts: i64,
    version: i64,
    deleted: bool,
    device_id: String,
    server_clock: i64,
}

impl RecordTable for Event {
    type Row = EventRow;

    const TABLE: &'static str = "events";

    const SELECT_BY_ID: &'static str = "SELECT * FROM events WHERE event_id = ?";

    const SELECT_SINCE: &'static str = r#"
        SELECT * FROM events
        WHERE server_clock > ? AND server_clock <= ?
        ORDER BY server_clock ASC
    "#;

    const UPSERT: &'static str = r#"
        INSERT INTO events (
            event_id, type, details, payload, start_ts, end_ts, ts,
            created_ts, updated_ts, version, deleted, device_id, server_clock
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(event_id) DO UPDATE SET
            type = excluded.type,
            details = excluded.details,
            payload = excluded.payload,
            start_ts = excluded.start_ts,
            end_ts = excluded.end_ts,
            ts = excluded.ts,
            created_ts = excluded.created_ts,
            updated_ts = excluded.updated_ts,
            version = excluded.version,
            deleted = excluded.deleted,
            device_id = excluded.device_id,
            server_clock = excluded.server_clock
    "#;

    fn from_row(row: EventRow) -> Result<Self, sqlx::Error> {
        let kind = EventKind::from_str(&row.kind).map_err(decode_error)?;

        let payload = match row.payload {
            Some(raw) => Some(serde_json::from_str::<Map<String, Value>>(&raw).map_err(decode_error)?),
            None => None,
        };

        Ok(Event {
            event_id: row.event_id,
            kind,
            details: row.details,
            payload,
            start_ts: row.start_ts,
            end_ts: row.end_ts,
            ts: row.ts,
            created_ts: row.created_ts,
            updated_ts: row.updated_ts,
            version: row.version,
            deleted: row.deleted,
            device_id: row.device_id,
            server_clock: row.server_clock,
        })
    }

    fn bind_upsert<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        let payload = self
            .payload
            .as_ref()
            .map(|p| Value::Object(p.clone()).to_string());

        query
            .bind(&self.event_id)
            .bind(self.kind.as_str())
            .bind(self.details.as_deref())
            .bind(payload)
            .bind(self.start_ts)
            .bind(self.end_ts)
            .bind(self.ts)
            .bind(self.created_ts)
            .bind(self.updated_ts)
            .bind(self.version)
            .bind(self.deleted)
            .bind(&self.device_id)
            .bind(self.server_clock)
    }
}
