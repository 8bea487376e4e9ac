use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};
use serde_default::DefaultFromSerde;
use serde_inline_default::serde_inline_default;

use crate::{EntityKinds, RetryPolicy};

use super::Config;

#[serde_inline_default]
#[derive(Serialize, Deserialize, DefaultFromSerde, Clone, Debug)]
pub struct StoreOptions {
    #[serde_inline_default("mongodb://localhost:27017".to_string())]
    pub address: String,
    #[serde_inline_default("ephenation".to_string())]
    pub db: String,
    #[serde_inline_default("counters".to_string())]
    pub counters: String,
    #[serde_inline_default("migrations".to_string())]
    pub migrations: String,
    /// Entity kind to the value its counter is seeded with.
    #[serde_inline_default(default_kinds())]
    pub kinds: BTreeMap<String, i64>,
    #[serde_inline_default(5)]
    #[serde(rename = "retry-attempts")]
    pub retry_attempts: u32,
    #[serde_inline_default(50)]
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,
}

fn default_kinds() -> BTreeMap<String, i64> {
    // 0 is reserved for "no avatar".
    BTreeMap::from([("avatarId".to_string(), 1), ("newsId".to_string(), 0)])
}

impl Config for StoreOptions {
    const NAME: &'static str = "mongodb";
    const NOTE: &'static str = "MongoDB options for ephendb\nkinds: entity kind -> counter start value";
}

impl StoreOptions {
    pub fn entity_kinds(&self) -> EntityKinds {
        EntityKinds::new(self.kinds.iter().map(|(kind, start)| (kind.as_str(), *start)))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts.max(1),
            initial_backoff: Duration::from_millis(self.retry_backoff_ms),
            ..RetryPolicy::default()
        }
    }
}
