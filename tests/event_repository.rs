use chrono::{DateTime, TimeZone, Utc};
use eventhub::events::query::EventFilter;
use eventhub::events::repository::EventRepository;
use eventhub::events::{Event, EventLevel, EventSource, EventType, EventVersion, ObjectReference};
use eventhub::store::sqlite::SqliteStore;
use eventhub::store::{Order, QueryCondition, TimeRange};
use tempfile::tempdir;

const DB: &str = "alameda_event";

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_771_545_600 + secs, 0).unwrap()
}

fn event(id: &str, cluster: &str, secs: i64) -> Event {
    Event::new(at(secs), id, cluster)
}

fn repo() -> EventRepository<SqliteStore> {
    EventRepository::new(SqliteStore::open_in_memory().unwrap(), DB)
}

fn ids(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.id.as_str()).collect()
}

#[test]
fn written_warning_is_listed_back_by_cluster() {
    let repo = repo();
    let mut ev = event("ev-1", "c1", 0);
    ev.level = EventLevel::Warning;
    ev.message = "disk full".to_string();
    repo.create_events(std::slice::from_ref(&ev)).unwrap();

    let listed = repo.list_events(&EventFilter::for_clusters(["c1"])).unwrap();
    assert_eq!(listed, vec![ev]);
}

#[test]
fn every_attribute_survives_the_store() {
    let repo = repo();
    let ev = Event {
        time: Utc.timestamp_nanos(1_771_545_600_123_456_789),
        id: "ev-full".to_string(),
        cluster_id: "prod, east".to_string(),
        source: EventSource {
            host: "node-1".to_string(),
            component: "datahub".to_string(),
        },
        event_type: EventType::PodRegister,
        version: EventVersion::V1,
        level: EventLevel::Info,
        subject: ObjectReference {
            kind: "Pod".to_string(),
            namespace: "kube-system".to_string(),
            name: "dns=1".to_string(),
            api_version: "v1".to_string(),
        },
        message: "pod \"dns\" registered".to_string(),
        data: r#"{"replicas":2}"#.to_string(),
    };
    repo.create_events(std::slice::from_ref(&ev)).unwrap();

    let listed = repo.list_events(&EventFilter::default()).unwrap();
    assert_eq!(listed, vec![ev]);
}

#[test]
fn values_in_one_category_are_alternatives() {
    let repo = repo();
    let mut a = event("a", "c1", 0);
    a.level = EventLevel::Warning;
    let mut b = event("b", "c1", 1);
    b.level = EventLevel::Error;
    let mut c = event("c", "c1", 2);
    c.level = EventLevel::Info;
    repo.create_events(&[a, b, c]).unwrap();

    let filter = EventFilter {
        levels: vec![EventLevel::Warning, EventLevel::Error],
        ..EventFilter::default()
    };
    assert_eq!(ids(&repo.list_events(&filter).unwrap()), vec!["a", "b"]);
}

#[test]
fn categories_must_all_match() {
    let repo = repo();
    let mut a = event("a", "c1", 0);
    a.event_type = EventType::NodeRegister;
    let mut b = event("b", "c2", 1);
    b.event_type = EventType::NodeRegister;
    let mut c = event("c", "c1", 2);
    c.event_type = EventType::PodRegister;
    repo.create_events(&[a, b, c]).unwrap();

    let filter = EventFilter {
        types: vec![EventType::NodeRegister],
        ..EventFilter::for_clusters(["c1"])
    };
    assert_eq!(ids(&repo.list_events(&filter).unwrap()), vec!["a"]);

    let filter = EventFilter {
        ids: vec!["b".to_string(), "c".to_string()],
        ..EventFilter::for_clusters(["c1"])
    };
    assert_eq!(ids(&repo.list_events(&filter).unwrap()), vec!["c"]);
}

#[test]
fn empty_filter_lists_everything_in_the_database() {
    let repo = repo();
    repo.create_events(&[event("a", "c1", 0), event("b", "c2", 1)])
        .unwrap();
    assert_eq!(
        ids(&repo.list_events(&EventFilter::default()).unwrap()),
        vec!["a", "b"]
    );

    let other = EventRepository::new(repo.store(), "other");
    assert!(other.list_events(&EventFilter::default()).unwrap().is_empty());
}

#[test]
fn unencodable_events_do_not_block_the_batch() {
    let repo = repo();
    let far_future = Event::new(Utc.with_ymd_and_hms(2300, 1, 1, 0, 0, 0).unwrap(), "x", "c1");
    repo.create_events(&[event("a", "c1", 0), far_future, event("b", "c1", 1)])
        .unwrap();

    assert_eq!(repo.store().point_count(DB).unwrap(), 2);
    assert_eq!(
        ids(&repo.list_events(&EventFilter::default()).unwrap()),
        vec!["a", "b"]
    );
}

#[test]
fn time_bounds_order_and_limit_apply() {
    let repo = repo();
    repo.create_events(&[
        event("a", "c1", 0),
        event("b", "c1", 10),
        event("c", "c1", 20),
        event("d", "c1", 30),
    ])
    .unwrap();

    let filter = EventFilter {
        condition: QueryCondition {
            time_range: Some(TimeRange {
                start: Some(at(10)),
                end: Some(at(30)),
            }),
            order: Some(Order::Desc),
            limit: 2,
        },
        ..EventFilter::for_clusters(["c1"])
    };
    assert_eq!(ids(&repo.list_events(&filter).unwrap()), vec!["d", "c"]);
}

#[test]
fn events_persist_across_reopen() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("state").join("events.db");
    {
        let repo = EventRepository::new(SqliteStore::open(&path).unwrap(), DB);
        repo.create_events(&[event("a", "c1", 0)]).unwrap();
    }

    let repo = EventRepository::new(SqliteStore::open(&path).unwrap(), DB);
    let listed = repo.list_events(&EventFilter::for_clusters(["c1"])).unwrap();
    assert_eq!(ids(&listed), vec!["a"]);
}

#[test]
fn events_at_the_same_instant_with_look_alike_subjects_both_survive() {
    let repo = repo();
    let mut a = event("a", "c1", 0);
    a.subject.kind = "Pod,subject_name=web".to_string();
    a.message = "from a".to_string();
    let mut b = event("b", "c1", 0);
    b.subject.kind = "Pod".to_string();
    b.subject.name = "web".to_string();
    b.message = "from b".to_string();
    repo.create_events(&[a.clone(), b.clone()]).unwrap();

    let mut listed = repo.list_events(&EventFilter::default()).unwrap();
    listed.sort_by(|x, y| x.id.cmp(&y.id));
    assert_eq!(listed, vec![a, b]);
}

#[test]
fn empty_cluster_filter_matches_events_without_cluster() {
    let repo = repo();
    repo.create_events(&[event("a", "", 0), event("b", "c1", 1)])
        .unwrap();

    let listed = repo.list_events(&EventFilter::for_clusters([""])).unwrap();
    assert_eq!(ids(&listed), vec!["a"]);
}
