use crate::events::Event;
use crate::store::format_timestamp;
use anyhow::Result;
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

pub fn mirror_events(path: &Path, events: &[Event]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    for ev in events {
        let line = json!({
            "time": format_timestamp(&ev.time),
            "id": ev.id,
            "clusterId": ev.cluster_id,
            "type": ev.event_type,
            "level": ev.level,
        });
        writeln!(f, "{}", line)?;
    }
    Ok(())
}
