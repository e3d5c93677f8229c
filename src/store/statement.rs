use crate::store::format_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn keyword(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryCondition {
    pub time_range: Option<TimeRange>,
    pub order: Option<Order>,
    /// 0 means unlimited.
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disjunction {
    pub key: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    measurement: String,
    conjuncts: Vec<Disjunction>,
    time_range: TimeRange,
    order: Option<Order>,
    limit: Option<u64>,
}

impl Statement {
    pub fn new(measurement: &str) -> Self {
        Self {
            measurement: measurement.to_string(),
            conjuncts: Vec::new(),
            time_range: TimeRange::default(),
            order: None,
            limit: None,
        }
    }

    /// Adds `(key = v1 OR ...)` as a conjunct. An empty list adds nothing:
    /// an absent filter matches everything, it never matches nothing.
    pub fn append_where_by_list<I, S>(&mut self, key: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if !values.is_empty() {
            self.conjuncts.push(Disjunction {
                key: key.to_string(),
                values,
            });
        }
        self
    }

    pub fn set_time_range(&mut self, range: TimeRange) -> &mut Self {
        self.time_range = range;
        self
    }

    pub fn set_order(&mut self, order: Option<Order>) -> &mut Self {
        self.order = order;
        self
    }

    pub fn set_limit(&mut self, limit: u64) -> &mut Self {
        self.limit = (limit > 0).then_some(limit);
        self
    }

    pub fn apply_condition(&mut self, condition: &QueryCondition) -> &mut Self {
        if let Some(range) = condition.time_range {
            self.set_time_range(range);
        }
        self.set_order(condition.order);
        self.set_limit(condition.limit)
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn conjuncts(&self) -> &[Disjunction] {
        &self.conjuncts
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    pub fn order(&self) -> Option<Order> {
        self.order
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn has_predicate(&self) -> bool {
        !self.conjuncts.is_empty()
            || self.time_range.start.is_some()
            || self.time_range.end.is_some()
    }

    pub fn to_influxql(&self) -> String {
        let mut predicates: Vec<String> = self
            .conjuncts
            .iter()
            .map(|d| {
                let terms: Vec<String> = d
                    .values
                    .iter()
                    .map(|v| format!("{}={}", quote_ident(&d.key), quote_literal(v)))
                    .collect();
                format!("({})", terms.join(" OR "))
            })
            .collect();
        if let Some(start) = self.time_range.start {
            predicates.push(format!("time >= '{}'", format_timestamp(&start)));
        }
        if let Some(end) = self.time_range.end {
            predicates.push(format!("time <= '{}'", format_timestamp(&end)));
        }

        let mut cmd = format!("SELECT * FROM {}", quote_ident(&self.measurement));
        if !predicates.is_empty() {
            cmd.push_str(" WHERE ");
            cmd.push_str(&predicates.join(" AND "));
        }
        if let Some(order) = self.order {
            cmd.push_str(" ORDER BY time ");
            cmd.push_str(order.keyword());
        }
        if let Some(limit) = self.limit {
            cmd.push_str(&format!(" LIMIT {limit}"));
        }
        cmd
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_influxql())
    }
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('\\', "\\\\").replace('"', "\\\""))
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
