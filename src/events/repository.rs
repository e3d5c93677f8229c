use crate::events::query::{self, EventFilter};
use crate::events::{Event, codec};
use crate::store::{StoreResult, TimeSeriesStore};
use tracing::{debug, error, info};

pub struct EventRepository<S> {
    store: S,
    database: String,
}

impl<S: TimeSeriesStore> EventRepository<S> {
    pub fn new(store: S, database: &str) -> Self {
        Self {
            store,
            database: database.to_string(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Writes all encodable events as one batch. Events that cannot be
    /// encoded are logged and left out; the rest are still written.
    pub fn create_events(&self, events: &[Event]) -> StoreResult<()> {
        let points = codec::encode_batch(events);
        if points.is_empty() {
            debug!(events = events.len(), "nothing to write");
            return Ok(());
        }
        match self.store.write_batch(&points, &self.database) {
            Ok(()) => {
                info!(database = %self.database, points = points.len(), "wrote events");
                Ok(())
            }
            Err(err) => {
                error!(database = %self.database, error = %err, "write events failed");
                Err(err)
            }
        }
    }

    pub fn list_events(&self, filter: &EventFilter) -> StoreResult<Vec<Event>> {
        let statement = query::build(filter);
        let rows = self
            .store
            .query(&statement, &self.database)
            .inspect_err(|err| {
                error!(database = %self.database, %statement, error = %err, "list events failed");
            })?;
        let events = codec::decode_rows(&rows);
        debug!(database = %self.database, events = events.len(), "listed events");
        Ok(events)
    }
}
