pub const MEASUREMENT: &str = "Event";
pub const DEFAULT_DATABASE: &str = "alameda_event";

pub const TIME: &str = "time";

pub const CLUSTER_ID: &str = "cluster_id";
pub const SOURCE_HOST: &str = "source_host";
pub const SOURCE_COMPONENT: &str = "source_component";
pub const TYPE: &str = "type";
pub const VERSION: &str = "version";
pub const LEVEL: &str = "level";
pub const SUBJECT_KIND: &str = "subject_kind";
pub const SUBJECT_NAMESPACE: &str = "subject_namespace";
pub const SUBJECT_NAME: &str = "subject_name";
pub const SUBJECT_API_VERSION: &str = "subject_api_version";

pub const ID: &str = "id";
pub const MESSAGE: &str = "message";
pub const DATA: &str = "data";

pub const TAGS: [&str; 10] = [
    CLUSTER_ID,
    SOURCE_HOST,
    SOURCE_COMPONENT,
    TYPE,
    VERSION,
    LEVEL,
    SUBJECT_KIND,
    SUBJECT_NAMESPACE,
    SUBJECT_NAME,
    SUBJECT_API_VERSION,
];

pub const FIELDS: [&str; 3] = [ID, MESSAGE, DATA];

pub fn is_tag(key: &str) -> bool {
    key == TIME || TAGS.contains(&key)
}

pub fn is_field(key: &str) -> bool {
    FIELDS.contains(&key)
}
