use crate::events::schema::TIME;
use crate::store::{
    FieldValue, Order, Point, Row, Statement, StoreResult, TimeSeriesStore, format_timestamp,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params, params_from_iter};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

pub struct SqliteStore {
    conn: Connection,
}

pub fn migrate(conn: &Connection, file_backed: bool) -> rusqlite::Result<()> {
    if file_backed {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS points (
            database TEXT NOT NULL,
            measurement TEXT NOT NULL,
            series_key TEXT NOT NULL,
            time_ns INTEGER NOT NULL,
            tags_json TEXT NOT NULL,
            fields_json TEXT NOT NULL,
            PRIMARY KEY(database, measurement, series_key, time_ns)
        );

        CREATE INDEX IF NOT EXISTS idx_points_time ON points(database, measurement, time_ns);
        ",
    )?;

    Ok(())
}

impl SqliteStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create db parent dir {}", parent.display()))?;
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        migrate(&conn, true)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn, false)?;
        Ok(Self { conn })
    }

    pub fn point_count(&self, database: &str) -> StoreResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM points WHERE database = ?1",
            params![database],
            |row| row.get(0),
        )?)
    }
}

impl TimeSeriesStore for SqliteStore {
    fn write_batch(&self, points: &[Point], database: &str) -> StoreResult<()> {
        debug!(database, points = points.len(), "sqlite write");
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO points (database, measurement, series_key, time_ns, tags_json, fields_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(database, measurement, series_key, time_ns)
                 DO UPDATE SET fields_json = json_patch(points.fields_json, excluded.fields_json)",
            )?;
            for point in points {
                let tags: Map<String, Value> = point
                    .tags()
                    .iter()
                    .filter(|(_, v)| !v.is_empty())
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                let fields: Map<String, Value> = point
                    .fields()
                    .iter()
                    .map(|(k, v)| (k.clone(), field_to_json(v)))
                    .collect();
                // tags are sorted, so the JSON text identifies the series
                let series_key = Value::Object(tags).to_string();
                stmt.execute(params![
                    database,
                    point.measurement(),
                    series_key,
                    point.timestamp_nanos(),
                    series_key,
                    Value::Object(fields).to_string(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn query(&self, statement: &Statement, database: &str) -> StoreResult<Vec<Row>> {
        let (sql, values) = to_sql(statement, database);
        debug!(database, sql, "sqlite query");
        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(values), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(raw
            .into_iter()
            .map(|(time_ns, tags_json, fields_json)| {
                let mut row = Row::new();
                row.insert(
                    TIME,
                    format_timestamp(&DateTime::<Utc>::from_timestamp_nanos(time_ns)),
                );
                for json in [tags_json, fields_json] {
                    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&json) {
                        for (k, v) in map {
                            row.insert(k, json_to_string(v));
                        }
                    }
                }
                row
            })
            .collect())
    }
}

fn to_sql(statement: &Statement, database: &str) -> (String, Vec<SqlValue>) {
    let mut sql = String::from(
        "SELECT time_ns, tags_json, fields_json FROM points WHERE database = ? AND measurement = ?",
    );
    let mut values = vec![
        SqlValue::Text(database.to_string()),
        SqlValue::Text(statement.measurement().to_string()),
    ];

    for d in statement.conjuncts() {
        let placeholders = vec!["?"; d.values.len()].join(", ");
        sql.push_str(&format!(
            " AND coalesce(json_extract(tags_json, ?), json_extract(fields_json, ?), '') IN ({placeholders})"
        ));
        let path = format!("$.\"{}\"", d.key);
        values.push(SqlValue::Text(path.clone()));
        values.push(SqlValue::Text(path));
        values.extend(d.values.iter().cloned().map(SqlValue::Text));
    }

    let range = statement.time_range();
    if let Some(start) = range.start {
        sql.push_str(" AND time_ns >= ?");
        values.push(SqlValue::Integer(start.timestamp_nanos_opt().unwrap_or(i64::MIN)));
    }
    if let Some(end) = range.end {
        sql.push_str(" AND time_ns <= ?");
        values.push(SqlValue::Integer(end.timestamp_nanos_opt().unwrap_or(i64::MAX)));
    }

    let dir = match statement.order() {
        Some(Order::Desc) => "DESC",
        Some(Order::Asc) | None => "ASC",
    };
    sql.push_str(&format!(" ORDER BY time_ns {dir}, series_key ASC"));

    if let Some(limit) = statement.limit() {
        sql.push_str(" LIMIT ?");
        values.push(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    }

    (sql, values)
}

fn field_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::String(s) => Value::String(s.clone()),
        FieldValue::Integer(i) => Value::from(*i),
        FieldValue::Float(f) => Value::from(*f),
        FieldValue::Boolean(b) => Value::Bool(*b),
    }
}

fn json_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
