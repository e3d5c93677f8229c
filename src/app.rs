use crate::config::{AppConfig, BackendKind, StoreConfig};
use crate::events::Event;
use crate::events::query::{self, EventFilter};
use crate::events::repository::EventRepository;
use crate::logging::ndjson;
use crate::store::influx::InfluxStore;
use crate::store::sqlite::SqliteStore;
use crate::store::{Point, Row, Statement, StoreResult, TimeSeriesStore};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tracing::info;

pub enum Backend {
    Influx(InfluxStore),
    Sqlite(SqliteStore),
}

impl Backend {
    pub fn open(cfg: &StoreConfig) -> Result<Self> {
        match cfg.backend {
            BackendKind::InfluxDb => Ok(Backend::Influx(
                InfluxStore::new(cfg.influxdb.settings.clone())
                    .context("create influxdb client")?,
            )),
            BackendKind::Sqlite => Ok(Backend::Sqlite(SqliteStore::open(&cfg.sqlite.path)?)),
        }
    }
}

impl TimeSeriesStore for Backend {
    fn write_batch(&self, points: &[Point], database: &str) -> StoreResult<()> {
        match self {
            Backend::Influx(s) => s.write_batch(points, database),
            Backend::Sqlite(s) => s.write_batch(points, database),
        }
    }

    fn query(&self, statement: &Statement, database: &str) -> StoreResult<Vec<Row>> {
        match self {
            Backend::Influx(s) => s.query(statement, database),
            Backend::Sqlite(s) => s.query(statement, database),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateCommand {
    pub file: PathBuf,
    pub log: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ListCommand {
    pub filter: EventFilter,
    pub dry_run: bool,
}

pub fn init_store(cfg: &AppConfig) -> Result<()> {
    let store = &cfg.store;
    match Backend::open(store)? {
        Backend::Influx(influx) => {
            influx
                .create_database(&store.database)
                .with_context(|| format!("create database {}", store.database))?;
            if let Some(policy) = &store.influxdb.retention {
                influx
                    .apply_retention_policy(
                        &store.database,
                        &policy.duration,
                        &policy.shard_duration,
                    )
                    .with_context(|| format!("apply retention policy on {}", store.database))?;
            }
            println!(
                "Initialized database {} at {}",
                store.database, influx.settings().address
            );
        }
        Backend::Sqlite(_) => {
            println!(
                "Initialized sqlite store {}",
                store.sqlite.path.display()
            );
        }
    }
    Ok(())
}

pub fn ping(cfg: &AppConfig) -> Result<()> {
    match Backend::open(&cfg.store)? {
        Backend::Influx(influx) => {
            let version = influx.ping().context("ping influxdb")?;
            println!("influxdb {} version {version}", influx.settings().address);
        }
        Backend::Sqlite(_) => {
            println!("sqlite {}", cfg.store.sqlite.path.display());
        }
    }
    Ok(())
}

pub fn create_events(cfg: &AppConfig, cmd: &CreateCommand) -> Result<()> {
    let events = read_events_file(&cmd.file)?;
    let repo = EventRepository::new(Backend::open(&cfg.store)?, &cfg.store.database);
    repo.create_events(&events)
        .with_context(|| format!("write events from {}", cmd.file.display()))?;
    if let Some(log) = &cmd.log {
        ndjson::mirror_events(log, &events)
            .with_context(|| format!("write event log {}", log.display()))?;
    }
    info!(events = events.len(), "create finished");
    println!("Submitted {} events to {}", events.len(), cfg.store.database);
    Ok(())
}

pub fn list_events(cfg: &AppConfig, cmd: &ListCommand) -> Result<()> {
    if cmd.dry_run {
        println!("{}", query::build(&cmd.filter));
        return Ok(());
    }
    let repo = EventRepository::new(Backend::open(&cfg.store)?, &cfg.store.database);
    let events = repo.list_events(&cmd.filter).context("list events")?;
    for ev in &events {
        println!("{}", serde_json::to_string(ev)?);
    }
    Ok(())
}

/// Accepts a JSON array of events or NDJSON with one event per line.
pub fn read_events_file(path: &Path) -> Result<Vec<Event>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read events file {}", path.display()))?;
    parse_events(&raw).with_context(|| format!("parse events file {}", path.display()))
}

pub fn parse_events(raw: &str) -> Result<Vec<Event>> {
    if raw.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(raw)?);
    }
    let mut events = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(ev) => events.push(ev),
            Err(err) => bail!("line {}: {err}", idx + 1),
        }
    }
    Ok(events)
}
