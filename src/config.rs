use crate::events::schema::DEFAULT_DATABASE;
use crate::store::influx::InfluxSettings;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: u32 = 1;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub version: u32,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub database: String,
    pub influxdb: InfluxConfig,
    pub sqlite: SqliteConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    InfluxDb,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfluxConfig {
    pub settings: InfluxSettings,
    pub retention: Option<RetentionPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub duration: String,
    pub shard_duration: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
struct RawAppConfig {
    version: Option<u32>,
    store: Option<RawStoreConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawStoreConfig {
    backend: Option<String>,
    database: Option<String>,
    influxdb: Option<RawInfluxConfig>,
    sqlite: Option<RawSqliteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawInfluxConfig {
    address: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout_secs: Option<u64>,
    insecure_skip_verify: Option<bool>,
    retention_duration: Option<String>,
    retention_shard_duration: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSqliteConfig {
    path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            store: StoreConfig {
                backend: BackendKind::Sqlite,
                database: DEFAULT_DATABASE.to_string(),
                influxdb: InfluxConfig {
                    settings: InfluxSettings::default(),
                    retention: None,
                },
                sqlite: SqliteConfig {
                    path: default_sqlite_path(),
                },
            },
        }
    }
}

pub fn default_config_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("eventhub").join("config.toml");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("eventhub")
            .join("config.toml");
    }
    PathBuf::from(".eventhub/config.toml")
}

fn default_sqlite_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("eventhub").join("events.db");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("eventhub")
            .join("events.db");
    }
    PathBuf::from(".eventhub/events.db")
}

/// An explicit path must exist; a missing default file yields defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let path = default_config_path();
            if !path.exists() {
                return Ok(AppConfig::default());
            }
            path
        }
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("read config {}", path.display()))?;
    parse_config(&raw, &path)
}

pub fn parse_config(raw: &str, path: &Path) -> Result<AppConfig> {
    let parsed: RawAppConfig =
        toml::from_str(raw).with_context(|| format!("parse {}", path.display()))?;
    validate_config(parsed, path)
}

fn validate_config(raw: RawAppConfig, path: &Path) -> Result<AppConfig> {
    let version = raw
        .version
        .ok_or_else(|| anyhow::anyhow!("{} missing required `version`", path.display()))?;
    if version != CONFIG_VERSION {
        bail!(
            "{} has unsupported version {version}; expected version = {CONFIG_VERSION}",
            path.display()
        );
    }

    let defaults = AppConfig::default().store;
    let Some(store) = raw.store else {
        return Ok(AppConfig {
            version,
            store: defaults,
        });
    };

    let backend = match sanitize_optional(store.backend).as_deref() {
        None | Some("sqlite") => BackendKind::Sqlite,
        Some("influxdb") => BackendKind::InfluxDb,
        Some(other) => bail!(
            "{} has unsupported `[store].backend = \"{other}\"`; expected `influxdb` or `sqlite`",
            path.display()
        ),
    };

    let database = sanitize_optional(store.database).unwrap_or(defaults.database);

    let influxdb = store
        .influxdb
        .map(|influx| validate_influx_config(influx, path))
        .transpose()?
        .unwrap_or(defaults.influxdb);

    let sqlite = store
        .sqlite
        .and_then(|s| sanitize_optional(s.path))
        .map(|p| SqliteConfig {
            path: PathBuf::from(p),
        })
        .unwrap_or(defaults.sqlite);

    Ok(AppConfig {
        version,
        store: StoreConfig {
            backend,
            database,
            influxdb,
            sqlite,
        },
    })
}

fn validate_influx_config(raw: RawInfluxConfig, path: &Path) -> Result<InfluxConfig> {
    let defaults = InfluxSettings::default();
    let address = sanitize_optional(raw.address).unwrap_or(defaults.address);
    if !(address.starts_with("http://") || address.starts_with("https://")) {
        bail!(
            "{} has invalid `[store.influxdb].address = \"{address}\"`; expected an http(s) URL",
            path.display()
        );
    }

    let timeout_secs = raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        bail!("{} has zero `[store.influxdb].timeout_secs`", path.display());
    }

    let retention = match (
        sanitize_optional(raw.retention_duration),
        sanitize_optional(raw.retention_shard_duration),
    ) {
        (None, None) => None,
        (Some(duration), Some(shard_duration)) => {
            for value in [&duration, &shard_duration] {
                if !is_influx_duration(value) {
                    bail!(
                        "{} has invalid retention duration `{value}`",
                        path.display()
                    );
                }
            }
            Some(RetentionPolicy {
                duration,
                shard_duration,
            })
        }
        _ => bail!(
            "{} must set both `retention_duration` and `retention_shard_duration`",
            path.display()
        ),
    };

    Ok(InfluxConfig {
        settings: InfluxSettings {
            address,
            username: sanitize_optional(raw.username),
            password: sanitize_optional(raw.password),
            timeout: Duration::from_secs(timeout_secs),
            insecure_skip_verify: raw.insecure_skip_verify.unwrap_or(false),
        },
        retention,
    })
}

fn sanitize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `INF` or one or more `<digits><unit>` groups, e.g. `30d`, `1h30m`.
fn is_influx_duration(value: &str) -> bool {
    if value.eq_ignore_ascii_case("inf") {
        return true;
    }
    if value.is_empty() {
        return false;
    }
    const UNITS: [&str; 9] = ["ns", "us", "µs", "ms", "s", "m", "h", "d", "w"];
    let mut rest = value;
    while !rest.is_empty() {
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return false;
        }
        rest = &rest[digits..];
        let Some(unit) = UNITS
            .iter()
            .filter(|u| rest.starts_with(**u))
            .max_by_key(|u| u.len())
        else {
            return false;
        };
        rest = &rest[unit.len()..];
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        (tmp, path)
    }

    #[test]
    fn parses_full_influx_config() {
        let (_tmp, path) = write_config(
            r#"
version = 1
[store]
backend = "influxdb"
database = "events"
[store.influxdb]
address = "https://influxdb.monitoring:8086"
username = "admin"
password = "secret"
timeout_secs = 5
insecure_skip_verify = true
retention_duration = "30d"
retention_shard_duration = "1d"
"#,
        );

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.store.backend, BackendKind::InfluxDb);
        assert_eq!(cfg.store.database, "events");
        let influx = cfg.store.influxdb;
        assert_eq!(influx.settings.address, "https://influxdb.monitoring:8086");
        assert_eq!(influx.settings.username.as_deref(), Some("admin"));
        assert_eq!(influx.settings.timeout, Duration::from_secs(5));
        assert!(influx.settings.insecure_skip_verify);
        assert_eq!(
            influx.retention,
            Some(RetentionPolicy {
                duration: "30d".to_string(),
                shard_duration: "1d".to_string(),
            })
        );
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let (_tmp, path) = write_config("version = 1\n");
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.store.backend, BackendKind::Sqlite);
        assert_eq!(cfg.store.database, DEFAULT_DATABASE);
        assert_eq!(cfg.store.influxdb.settings.address, "http://localhost:8086");
    }

    #[test]
    fn blank_values_are_unset() {
        let (_tmp, path) = write_config(
            r#"
version = 1
[store]
database = "  "
[store.influxdb]
username = ""
[store.sqlite]
path = "/tmp/eventhub-test.db"
"#,
        );
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.store.database, DEFAULT_DATABASE);
        assert_eq!(cfg.store.influxdb.settings.username, None);
        assert_eq!(cfg.store.sqlite.path, PathBuf::from("/tmp/eventhub-test.db"));
    }

    #[test]
    fn rejects_invalid_version_and_backend() {
        let (_tmp, path) = write_config("version = 2");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err}").contains("unsupported version"));

        let (_tmp, path) = write_config("version = 1\n[store]\nbackend = \"prometheus\"\n");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err}").contains("unsupported `[store].backend"));
    }

    #[test]
    fn rejects_bad_address_and_half_retention() {
        let (_tmp, path) =
            write_config("version = 1\n[store.influxdb]\naddress = \"localhost:8086\"\n");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err}").contains("invalid `[store.influxdb].address"));

        let (_tmp, path) =
            write_config("version = 1\n[store.influxdb]\nretention_duration = \"30d\"\n");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err}").contains("must set both"));

        let (_tmp, path) = write_config(
            "version = 1\n[store.influxdb]\nretention_duration = \"30 days\"\nretention_shard_duration = \"1d\"\n",
        );
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err}").contains("invalid retention duration"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let tmp = tempdir().unwrap();
        let err = load_config(Some(&tmp.path().join("nope.toml"))).unwrap_err();
        assert!(format!("{err}").contains("does not exist"));
    }

    #[test]
    fn recognizes_duration_literals() {
        for ok in ["30d", "1h30m", "INF", "2w", "500ms", "10s"] {
            assert!(is_influx_duration(ok), "{ok}");
        }
        for bad in ["", "d", "30", "30 days", "1y"] {
            assert!(!is_influx_duration(bad), "{bad}");
        }
    }
}
