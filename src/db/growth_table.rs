use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;
use std::str::FromStr;

use super::records::{decode_error, RecordTable};
use crate::models::{GrowthCategory, GrowthData};

#[derive(sqlx::FromRow)]
pub struct GrowthRow {
    id: String,
    device_id: String,
    category: String,
    value: f64,
    unit: String,
    ts: i64,
    created_ts: i64,
    updated_ts: i64,
    version: i64,
    deleted: bool,
    server_clock: i64,
}

impl RecordTable for GrowthData {
    type Row = GrowthRow;

    const TABLE: &'static str = "growth_data";

    const SELECT_BY_ID: &'static str = "SELECT * FROM growth_data WHERE id = ?";

    const SELECT_SINCE: &'static str = r#"
        SELECT * FROM growth_data
        WHERE server_clock > ? AND server_clock <= ?
        ORDER BY server_clock ASC
    "#;

    const UPSERT: &'static str = r#"
        INSERT INTO growth_data (
            id, device_id, category, value, unit, ts,
            created_ts, updated_ts, version, deleted, server_clock
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            device_id = excluded.device_id,
            category = excluded.category,
            value = excluded.value,
            unit = excluded.unit,
            ts = excluded.ts,
            created_ts = excluded.created_ts,
            updated_ts = excluded.updated_ts,
            version = excluded.version,
            deleted = excluded.deleted,
            server_clock = excluded.server_clock
    "#;

    fn from_row(row: GrowthRow) -> Result<Self, sqlx::Error> {
        Ok(GrowthData {
            category: GrowthCategory::from_str(&row.category).map_err(decode_error)?,
            id: row.id,
            device_id: row.device_id,
            value: row.value,
            unit: row.unit,
            ts: row.ts,
            created_ts: row.created_ts,
            updated_ts: row.updated_ts,
            version: row.version,
            deleted: row.deleted,
            server_clock: row.server_clock,
        })
    }

    fn bind_upsert<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query
            .bind(&self.id)
            .bind(&self.device_id)
            .bind(self.category.as_str())
            .bind(self.value)
            .bind(&self.unit)
            .bind(self.ts)
            .bind(self.created_ts)
            .bind(self.updated_ts)
            .bind(self.version)
            .bind(self.deleted)
            .bind(self.server_clock)
    }
}
