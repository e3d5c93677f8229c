use crate::events::schema;
use crate::events::{EventLevel, EventType, EventVersion};
use crate::store::{QueryCondition, Statement};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub ids: Vec<String>,
    pub cluster_ids: Vec<String>,
    pub types: Vec<EventType>,
    pub versions: Vec<EventVersion>,
    pub levels: Vec<EventLevel>,
    pub condition: QueryCondition,
}

impl EventFilter {
    pub fn for_clusters<I, S>(cluster_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cluster_ids: cluster_ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

pub fn build(filter: &EventFilter) -> Statement {
    let mut stmt = Statement::new(schema::MEASUREMENT);
    stmt.append_where_by_list(schema::ID, filter.ids.iter().cloned())
        .append_where_by_list(schema::CLUSTER_ID, filter.cluster_ids.iter().cloned())
        .append_where_by_list(schema::TYPE, filter.types.iter().map(|t| t.as_str_name()))
        .append_where_by_list(
            schema::VERSION,
            filter.versions.iter().map(|v| v.as_str_name()),
        )
        .append_where_by_list(schema::LEVEL, filter.levels.iter().map(|l| l.as_str_name()))
        .apply_condition(&filter.condition);
    stmt
}
