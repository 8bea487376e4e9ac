use async_trait::async_trait;
use mongodb::{
    bson::Document,
    options::{Acknowledgment, ClientOptions, IndexOptions, WriteConcern},
    Client, IndexModel,
};

use crate::{Backend, Error, IndexSpec, Result, SeedMode, SeedOutcome, StoreOptions};

use super::{counter::duplicate_key_index, Collections, CounterRecord};

/// MongoDB-backed store. Writes are majority-acknowledged and journaled so a
/// returned ID has been persisted.
pub struct Mongo {
    cols: Collections,
}

impl Mongo {
    pub async fn load(config: &StoreOptions) -> Result<Self> {
        let mut options = ClientOptions::parse(config.address.as_str())
            .await
            .map_err(|e| {
                Error::persistence(format!("resolve mongodb host {}", config.address), e)
            })?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.write_concern = Some(
            WriteConcern::builder()
                .w(Acknowledgment::Majority)
                .journal(true)
                .build(),
        );

        let client = Client::with_options(options)
            .map_err(|e| Error::persistence("create mongodb client", e))?;

        tracing::info!(address = %config.address, db = %config.db, "connected to mongodb");

        Ok(Self {
            cols: Collections::new(client.database(&config.db), &config.counters),
        })
    }

    pub fn collections(&self) -> &Collections {
        &self.cols
    }
}

#[async_trait]
impl Backend for Mongo {
    async fn find_and_increment(&self, kind: &str) -> Result<Option<i64>> {
        CounterRecord::bump_get(kind, &self.cols).await
    }

    async fn find_and_raise(&self, kind: &str, floor: i64) -> Result<Option<i64>> {
        CounterRecord::raise(kind, floor, &self.cols).await
    }

    async fn read_counter(&self, kind: &str) -> Result<Option<i64>> {
        CounterRecord::get(kind, &self.cols).await
    }

    async fn seed_counter(&self, kind: &str, start: i64, mode: SeedMode) -> Result<SeedOutcome> {
        CounterRecord::seed(kind, start, mode, &self.cols).await
    }

    async fn ensure_index(&self, collection: &str, index: &IndexSpec) -> Result<()> {
        let model = IndexModel::builder()
            .keys(index.keys())
            .options(
                IndexOptions::builder()
                    .name(index.name())
                    .unique(index.unique)
                    .build(),
            )
            .build();

        match self.cols.raw(collection).create_index(model).await {
            Ok(_) => Ok(()),
            Err(e) => match duplicate_key_index(&e) {
                Some(_) => Err(Error::ConstraintViolation {
                    collection: collection.to_string(),
                    index: index.name(),
                }),
                None => Err(Error::persistence(
                    format!("create index {collection}.{}", index.name()),
                    e,
                )),
            },
        }
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.cols
            .raw(collection)
            .drop()
            .await
            .map_err(|e| Error::persistence(format!("drop {collection}"), e))
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<()> {
        match self.cols.raw(collection).insert_one(doc).await {
            Ok(_) => Ok(()),
            Err(e) => match duplicate_key_index(&e) {
                Some(index) => Err(Error::ConstraintViolation {
                    collection: collection.to_string(),
                    index,
                }),
                None => Err(Error::persistence(format!("insert into {collection}"), e)),
            },
        }
    }
}
