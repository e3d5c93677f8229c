use crate::store::statement::quote_ident;
use crate::store::{Point, Row, Statement, StoreError, StoreResult, TimeSeriesStore, line_protocol};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error};

const DUPLICATE_SUFFIX: &str = "_1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxSettings {
    pub address: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
    pub insecure_skip_verify: bool,
}

impl Default for InfluxSettings {
    fn default() -> Self {
        Self {
            address: "http://localhost:8086".to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
            insecure_skip_verify: false,
        }
    }
}

pub struct InfluxStore {
    client: Client,
    settings: InfluxSettings,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl InfluxStore {
    pub fn new(settings: InfluxSettings) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(settings.insecure_skip_verify)
            .build()
            .map_err(|e| StoreError::Configuration(format!("build http client: {e}")))?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &InfluxSettings {
        &self.settings
    }

    pub fn ping(&self) -> StoreResult<String> {
        let resp = self.send(self.client.get(self.endpoint("ping")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StoreError::Connection(format!("ping returned status {status}")));
        }
        Ok(resp
            .headers()
            .get("X-Influxdb-Version")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string())
    }

    pub fn create_database(&self, database: &str) -> StoreResult<()> {
        self.execute(&format!("CREATE DATABASE {}", quote_ident(database)), database)?;
        Ok(())
    }

    pub fn apply_retention_policy(
        &self,
        database: &str,
        duration: &str,
        shard_duration: &str,
    ) -> StoreResult<()> {
        let cmd = format!(
            "ALTER RETENTION POLICY \"autogen\" ON {} DURATION {} SHARD DURATION {}",
            quote_ident(database),
            duration,
            shard_duration
        );
        self.execute(&cmd, database)?;
        Ok(())
    }

    pub fn execute(&self, command: &str, database: &str) -> StoreResult<Vec<Row>> {
        debug!(database, command, "influxdb query");
        let req = self
            .client
            .post(self.endpoint("query"))
            .query(&[("db", database)])
            .form(&[("q", command)]);
        let resp = self.send(self.authorized(req))?;
        let status = resp.status();
        let body = resp.text().map_err(classify)?;
        if !status.is_success() {
            let err = match pack_rows(&body) {
                Err(StoreError::Query(message)) => StoreError::Query(message),
                _ => StoreError::Query(format!("status {status}: {}", body.trim())),
            };
            error!(database, %status, error = %err, "influxdb query failed");
            return Err(err);
        }
        pack_rows(&body).inspect_err(|err| {
            error!(database, error = %err, "influxdb query failed");
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.address.trim_end_matches('/'), path)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match self.settings.username.as_deref() {
            Some(user) => req.basic_auth(user, self.settings.password.as_deref()),
            None => req,
        }
    }

    fn send(&self, req: RequestBuilder) -> StoreResult<Response> {
        req.send().map_err(classify)
    }
}

impl TimeSeriesStore for InfluxStore {
    fn write_batch(&self, points: &[Point], database: &str) -> StoreResult<()> {
        debug!(database, points = points.len(), "influxdb write");
        let req = self
            .client
            .post(self.endpoint("write"))
            .query(&[("db", database), ("precision", "ns")])
            .body(line_protocol::encode_batch(points));
        let resp = self.send(self.authorized(req))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.trim().to_string());
        error!(database, %status, reason = %message, "influxdb write rejected");
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    fn query(&self, statement: &Statement, database: &str) -> StoreResult<Vec<Row>> {
        self.execute(&statement.to_influxql(), database)
    }
}

fn classify(err: reqwest::Error) -> StoreError {
    if err.is_connect() || err.is_timeout() {
        StoreError::Connection(err.to_string())
    } else {
        StoreError::Transport(err)
    }
}

pub(crate) fn pack_rows(body: &str) -> StoreResult<Vec<Row>> {
    let parsed: QueryResponse = serde_json::from_str(body)
        .map_err(|e| StoreError::Response(format!("decode query response: {e}")))?;
    if let Some(err) = parsed.error {
        return Err(StoreError::Query(err));
    }

    let mut rows = Vec::new();
    for result in parsed.results {
        if let Some(err) = result.error {
            return Err(StoreError::Query(err));
        }
        for series in result.series {
            for values in &series.values {
                let mut row: Row = series.tags.clone().into_iter().collect();
                for (col, value) in series.columns.iter().zip(values) {
                    row.insert(col.clone(), value_to_string(value));
                }
                rows.push(normalize_duplicates(row));
            }
        }
    }
    Ok(rows)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// When a tag and a field share a name the store returns the second one as
/// `<name>_1`. Fold it back, keeping whichever value is non-empty.
fn normalize_duplicates(mut row: Row) -> Row {
    let duplicated: Vec<String> = row
        .keys()
        .filter_map(|k| k.strip_suffix(DUPLICATE_SUFFIX))
        .filter(|base| row.get(base).is_some())
        .map(ToString::to_string)
        .collect();
    for base in duplicated {
        let dup_key = format!("{base}{DUPLICATE_SUFFIX}");
        if let Some(dup) = row.remove(&dup_key)
            && !dup.is_empty()
        {
            row.insert(base, dup);
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_series_tags_and_columns() {
        let body = r#"{"results":[{"statement_id":0,"series":[
            {"name":"Event","tags":{"cluster_id":"c1"},
             "columns":["time","id","count","ok","gone"],
             "values":[["2026-02-20T00:00:00Z","e1",3,true,null],
                       ["2026-02-20T00:00:01Z","e2",1.5,false,null]]}]}]}"#;
        let rows = pack_rows(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("cluster_id"), Some("c1"));
        assert_eq!(rows[0].get("id"), Some("e1"));
        assert_eq!(rows[0].get("count"), Some("3"));
        assert_eq!(rows[0].get("ok"), Some("true"));
        assert_eq!(rows[0].get("gone"), Some(""));
        assert_eq!(rows[1].get("count"), Some("1.5"));
    }

    #[test]
    fn empty_results_yield_no_rows() {
        assert!(pack_rows(r#"{"results":[{"statement_id":0}]}"#)
            .unwrap()
            .is_empty());
        assert!(pack_rows(r#"{"results":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn statement_errors_surface_as_query_errors() {
        let err = pack_rows(r#"{"results":[{"statement_id":0,"error":"database not found: x"}]}"#)
            .unwrap_err();
        assert!(matches!(err, StoreError::Query(m) if m.contains("database not found")));

        let err = pack_rows(r#"{"error":"error parsing query"}"#).unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));

        let err = pack_rows("<html>").unwrap_err();
        assert!(matches!(err, StoreError::Response(_)));
    }

    #[test]
    fn folds_duplicate_columns_preferring_non_empty() {
        let body = r#"{"results":[{"series":[{"name":"Event",
            "columns":["time","level","level_1","kind_1"],
            "values":[["2026-02-20T00:00:00Z","","EVENT_LEVEL_INFO","x"],
                      ["2026-02-20T00:00:01Z","EVENT_LEVEL_ERROR","",""]]}]}]}"#;
        let rows = pack_rows(body).unwrap();
        assert_eq!(rows[0].get("level"), Some("EVENT_LEVEL_INFO"));
        assert_eq!(rows[0].get("level_1"), None);
        // no base column: left as is
        assert_eq!(rows[0].get("kind_1"), Some("x"));
        assert_eq!(rows[1].get("level"), Some("EVENT_LEVEL_ERROR"));
    }
}
