pub mod influx;
pub mod line_protocol;
pub mod sqlite;
pub mod statement;

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

pub use statement::{Order, QueryCondition, Statement, TimeRange};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("write rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("query rejected: {0}")]
    Query(String),

    #[error("malformed store response: {0}")]
    Response(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Configuration(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodeError {
    #[error("timestamp {0} is outside the representable nanosecond range")]
    TimestampOutOfRange(String),

    #[error("tag `{key}` contains a line break or ends in a backslash")]
    InvalidTag { key: String },

    #[error("point for measurement `{0}` has no fields")]
    NoFields(String),
}

pub trait TimeSeriesStore {
    fn write_batch(&self, points: &[Point], database: &str) -> StoreResult<()>;

    fn query(&self, statement: &Statement, database: &str) -> StoreResult<Vec<Row>>;
}

impl<T: TimeSeriesStore + ?Sized> TimeSeriesStore for &T {
    fn write_batch(&self, points: &[Point], database: &str) -> StoreResult<()> {
        (**self).write_batch(points, database)
    }

    fn query(&self, statement: &Statement, database: &str) -> StoreResult<Vec<Row>> {
        (**self).query(statement, database)
    }
}

impl<T: TimeSeriesStore + ?Sized> TimeSeriesStore for Box<T> {
    fn write_batch(&self, points: &[Point], database: &str) -> StoreResult<()> {
        (**self).write_batch(points, database)
    }

    fn query(&self, statement: &Statement, database: &str) -> StoreResult<Vec<Row>> {
        (**self).query(statement, database)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl FieldValue {
    pub fn to_row_string(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    time: DateTime<Utc>,
    timestamp_nanos: i64,
}

impl Point {
    pub fn new(
        measurement: &str,
        tags: BTreeMap<String, String>,
        fields: BTreeMap<String, FieldValue>,
        time: DateTime<Utc>,
    ) -> Result<Self, EncodeError> {
        let timestamp_nanos = time
            .timestamp_nanos_opt()
            .ok_or_else(|| EncodeError::TimestampOutOfRange(time.to_rfc3339()))?;
        if let Some(key) = tags
            .iter()
            .find(|(k, v)| !is_tag_text(k) || !is_tag_text(v))
            .map(|(k, _)| k.clone())
        {
            return Err(EncodeError::InvalidTag { key });
        }
        if fields.is_empty() {
            return Err(EncodeError::NoFields(measurement.to_string()));
        }
        Ok(Self {
            measurement: measurement.to_string(),
            tags,
            fields,
            time,
            timestamp_nanos,
        })
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn timestamp_nanos(&self) -> i64 {
        self.timestamp_nanos
    }

    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert(crate::events::schema::TIME, format_timestamp(&self.time));
        for (k, v) in &self.tags {
            row.insert(k.clone(), v.clone());
        }
        for (k, v) in &self.fields {
            row.insert(k.clone(), v.to_row_string());
        }
        row
    }
}

// a trailing backslash would escape the separator that follows it on the wire
fn is_tag_text(s: &str) -> bool {
    !(s.contains('\n') || s.contains('\r') || s.ends_with('\\'))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: BTreeMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
