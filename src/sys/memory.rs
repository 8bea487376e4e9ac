use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};

use crate::{schema::index_value, IndexSpec};

use super::{integral, Backend, Error, Result, SeedMode, SeedOutcome};

const ID_INDEX: &str = "_id_";

#[derive(Default)]
struct MemCollection {
    docs: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

impl MemCollection {
    fn position(&self, id: &Bson) -> Option<usize> {
        let id = index_value(id);
        self.docs
            .iter()
            .position(|doc| doc.get("_id").map(index_value).as_ref() == Some(&id))
    }

    /// Name of the first unique index `doc` collides on, if any.
    fn collision(&self, doc: &Document) -> Option<String> {
        if let Some(id) = doc.get("_id") {
            if self.position(id).is_some() {
                return Some(ID_INDEX.to_string());
            }
        }

        self.indexes
            .iter()
            .filter(|index| index.unique)
            .find(|index| {
                let key = index.key_of(doc);
                self.docs.iter().any(|other| index.key_of(other) == key)
            })
            .map(IndexSpec::name)
    }
}

/// A single-process store with the same contract as MongoDB: unique indexes
/// are enforced on insert, counter operations are atomic under one lock.
///
/// Used for tests and `--memory` dry runs.
pub struct MemoryBackend {
    counters: String,
    collections: Mutex<HashMap<String, MemCollection>>,
    faults: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new("counters")
    }
}

impl MemoryBackend {
    pub fn new(counters: &str) -> Self {
        Self {
            counters: counters.to_string(),
            collections: Mutex::new(HashMap::new()),
            faults: AtomicUsize::new(0),
        }
    }

    /// Makes the next `n` write operations fail with `Persistence` before
    /// touching any state.
    pub fn fail_next(&self, n: usize) {
        self.faults.store(n, Ordering::SeqCst);
    }

    pub fn count(&self, collection: &str) -> usize {
        self.lock()
            .map(|cols| cols.get(collection).map_or(0, |col| col.docs.len()))
            .unwrap_or_default()
    }

    pub fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        self.lock()
            .map(|cols| {
                cols.get(collection)
                    .map(|col| col.indexes.clone())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, MemCollection>>> {
        self.collections
            .lock()
            .map_err(|_| Error::persistence("lock memory store", "poisoned"))
    }

    fn write_guard(&self, op: &str) -> Result<()> {
        let injected = self
            .faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(Error::persistence(op, "injected fault"));
        }
        Ok(())
    }

    /// Runs `f` on the counter document for `kind` under the store lock.
    fn with_counter<T>(
        &self,
        kind: &str,
        f: impl FnOnce(&mut Document, i64) -> Result<T>,
    ) -> Result<Option<T>> {
        let mut cols = self.lock()?;
        let Some(col) = cols.get_mut(&self.counters) else {
            return Ok(None);
        };
        let Some(pos) = col.position(&Bson::String(kind.to_string())) else {
            return Ok(None);
        };
        let record = &mut col.docs[pos];
        let current = counter_value(kind, record)?;
        f(record, current).map(Some)
    }
}

fn counter_value(kind: &str, record: &Document) -> Result<i64> {
    let c = record.get("c");
    c.and_then(integral).ok_or_else(|| {
        Error::persistence(
            format!("read counter {kind}"),
            format!("field `c` is {c:?}, expected an integer"),
        )
    })
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn find_and_increment(&self, kind: &str) -> Result<Option<i64>> {
        self.write_guard(&format!("increment {kind}"))?;
        self.with_counter(kind, |record, current| {
            let next = current
                .checked_add(1)
                .ok_or_else(|| Error::persistence(format!("increment {kind}"), "counter overflow"))?;
            record.insert("c", next);
            Ok(current)
        })
    }

    async fn find_and_raise(&self, kind: &str, floor: i64) -> Result<Option<i64>> {
        self.write_guard(&format!("advance {kind}"))?;
        self.with_counter(kind, |record, current| {
            let next = current.max(floor);
            record.insert("c", next);
            Ok(next)
        })
    }

    async fn read_counter(&self, kind: &str) -> Result<Option<i64>> {
        self.with_counter(kind, |_, current| Ok(current))
    }

    async fn seed_counter(&self, kind: &str, start: i64, mode: SeedMode) -> Result<SeedOutcome> {
        self.write_guard(&format!("seed {kind}"))?;
        let mut cols = self.lock()?;
        let col = cols.entry(self.counters.clone()).or_default();
        let record = doc! {"_id": kind, "c": start};

        match (col.position(&Bson::String(kind.to_string())), mode) {
            (None, _) => {
                col.docs.push(record);
                Ok(SeedOutcome::Created)
            }
            (Some(_), SeedMode::Keep) => Ok(SeedOutcome::Kept),
            (Some(pos), SeedMode::Reset) => {
                col.docs[pos] = record;
                Ok(SeedOutcome::Reset)
            }
        }
    }

    async fn ensure_index(&self, collection: &str, index: &IndexSpec) -> Result<()> {
        self.write_guard(&format!("create index {collection}.{}", index.name()))?;
        let mut cols = self.lock()?;
        let col = cols.entry(collection.to_string()).or_default();

        if col.indexes.contains(index) {
            return Ok(());
        }

        if index.unique {
            let keys = col.docs.iter().map(|doc| index.key_of(doc)).collect::<Vec<_>>();
            let duplicated = keys
                .iter()
                .enumerate()
                .any(|(i, key)| keys[i + 1..].contains(key));
            if duplicated {
                return Err(Error::ConstraintViolation {
                    collection: collection.to_string(),
                    index: index.name(),
                });
            }
        }

        col.indexes.push(index.clone());
        Ok(())
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.write_guard(&format!("drop {collection}"))?;
        self.lock()?.remove(collection);
        Ok(())
    }

    async fn insert(&self, collection: &str, mut doc: Document) -> Result<()> {
        self.write_guard(&format!("insert into {collection}"))?;
        let mut cols = self.lock()?;
        let col = cols.entry(collection.to_string()).or_default();

        if let Some(index) = col.collision(&doc) {
            return Err(Error::ConstraintViolation {
                collection: collection.to_string(),
                index,
            });
        }

        if !doc.contains_key("_id") {
            doc.insert("_id", ObjectId::new());
        }
        col.docs.push(doc);
        Ok(())
    }
}
