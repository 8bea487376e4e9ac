use mongodb::{bson::Document, Collection, Database};

use super::CounterRecord;

/// Handles into the database, one typed and one raw view of the counters.
#[derive(Clone)]
pub struct Collections {
    pub database: Database,
    pub counters_deser: Collection<CounterRecord>,
    pub counters_ser: Collection<Document>,
}

impl Collections {
    pub fn new(database: Database, counters: &str) -> Self {
        Self {
            counters_deser: database.collection(counters),
            counters_ser: database.collection(counters),
            database,
        }
    }

    pub fn raw(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}
