use crate::events::schema;
use crate::events::{Event, EventLevel, EventSource, EventType, EventVersion, ObjectReference};
use crate::store::{EncodeError, FieldValue, Point, Row, parse_timestamp};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub fn encode(event: &Event) -> Result<Point, EncodeError> {
    let tags: BTreeMap<String, String> = [
        (schema::CLUSTER_ID, event.cluster_id.as_str()),
        (schema::SOURCE_HOST, event.source.host.as_str()),
        (schema::SOURCE_COMPONENT, event.source.component.as_str()),
        (schema::TYPE, event.event_type.as_str_name()),
        (schema::VERSION, event.version.as_str_name()),
        (schema::LEVEL, event.level.as_str_name()),
        (schema::SUBJECT_KIND, event.subject.kind.as_str()),
        (schema::SUBJECT_NAMESPACE, event.subject.namespace.as_str()),
        (schema::SUBJECT_NAME, event.subject.name.as_str()),
        (schema::SUBJECT_API_VERSION, event.subject.api_version.as_str()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let fields: BTreeMap<String, FieldValue> = [
        (schema::ID, event.id.as_str()),
        (schema::MESSAGE, event.message.as_str()),
        (schema::DATA, event.data.as_str()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), FieldValue::from(v)))
    .collect();

    Point::new(schema::MEASUREMENT, tags, fields, event.time)
}

pub fn encode_batch(events: &[Event]) -> Vec<Point> {
    let points: Vec<Point> = events
        .iter()
        .filter_map(|event| match encode(event) {
            Ok(point) => Some(point),
            Err(err) => {
                warn!(id = %event.id, cluster_id = %event.cluster_id, error = %err, "skipping event");
                None
            }
        })
        .collect();
    debug!(events = events.len(), points = points.len(), "encoded batch");
    points
}

// Never fails: missing or unknown values become "", Undefined or the epoch.
pub fn decode(row: &Row) -> Event {
    let text = |key: &str| row.get(key).unwrap_or_default().to_string();

    Event {
        time: decode_time(row.get(schema::TIME)),
        id: text(schema::ID),
        cluster_id: text(schema::CLUSTER_ID),
        source: EventSource {
            host: text(schema::SOURCE_HOST),
            component: text(schema::SOURCE_COMPONENT),
        },
        event_type: row
            .get(schema::TYPE)
            .and_then(EventType::from_str_name)
            .unwrap_or_default(),
        version: row
            .get(schema::VERSION)
            .and_then(EventVersion::from_str_name)
            .unwrap_or_default(),
        level: row
            .get(schema::LEVEL)
            .and_then(EventLevel::from_str_name)
            .unwrap_or_default(),
        subject: ObjectReference {
            kind: text(schema::SUBJECT_KIND),
            namespace: text(schema::SUBJECT_NAMESPACE),
            name: text(schema::SUBJECT_NAME),
            api_version: text(schema::SUBJECT_API_VERSION),
        },
        message: text(schema::MESSAGE),
        data: text(schema::DATA),
    }
}

pub fn decode_rows(rows: &[Row]) -> Vec<Event> {
    rows.iter().map(decode).collect()
}

fn decode_time(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(parse_timestamp).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
