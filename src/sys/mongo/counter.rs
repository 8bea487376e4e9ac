use mongodb::{
    bson::{doc, Bson},
    error::{ErrorKind, WriteFailure},
    options::ReturnDocument,
};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

use crate::{sys::integral, Error, Result, SeedMode, SeedOutcome};

use super::Collections;

const DUPLICATE_KEY: i32 = 11000;

/// `{ _id: <kind>, c: <next value to issue> }`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CounterRecord {
    #[serde(rename = "_id")]
    pub kind: String,
    #[serde(deserialize_with = "whole_number")]
    pub c: i64,
}

/// Counters seeded from the mongo shell are stored as doubles, and `$inc`
/// keeps them that way.
fn whole_number<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<i64, D::Error> {
    let value = Bson::deserialize(de)?;
    integral(&value)
        .ok_or_else(|| D::Error::custom(format!("counter is {value:?}, expected an integer")))
}

impl CounterRecord {
    /// One `findOneAndUpdate` with `$inc`, so concurrent callers across
    /// processes never see the same value.
    pub async fn bump_get(kind: &str, cols: &Collections) -> Result<Option<i64>> {
        let before = cols
            .counters_deser
            .find_one_and_update(doc! {"_id": kind}, doc! {"$inc": {"c": 1_i64}})
            .return_document(ReturnDocument::Before)
            .await
            .map_err(|e| Error::persistence(format!("increment {kind}"), e))?;
        Ok(before.map(|record| record.c))
    }

    pub async fn raise(kind: &str, floor: i64, cols: &Collections) -> Result<Option<i64>> {
        let after = cols
            .counters_deser
            .find_one_and_update(doc! {"_id": kind}, doc! {"$max": {"c": floor}})
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| Error::persistence(format!("advance {kind}"), e))?;
        Ok(after.map(|record| record.c))
    }

    pub async fn get(kind: &str, cols: &Collections) -> Result<Option<i64>> {
        let record = cols
            .counters_deser
            .find_one(doc! {"_id": kind})
            .await
            .map_err(|e| Error::persistence(format!("read counter {kind}"), e))?;
        Ok(record.map(|record| record.c))
    }

    pub async fn seed(
        kind: &str,
        start: i64,
        mode: SeedMode,
        cols: &Collections,
    ) -> Result<SeedOutcome> {
        let update = match mode {
            SeedMode::Keep => doc! {"$setOnInsert": {"c": start}},
            SeedMode::Reset => doc! {"$set": {"c": start}},
        };

        let result = cols
            .counters_ser
            .update_one(doc! {"_id": kind}, update)
            .upsert(true)
            .await;

        match result {
            Ok(res) if res.upserted_id.is_some() => Ok(SeedOutcome::Created),
            Ok(_) => Ok(match mode {
                SeedMode::Keep => SeedOutcome::Kept,
                SeedMode::Reset => SeedOutcome::Reset,
            }),
            // Lost an upsert race with another provisioner; the record exists now.
            Err(e) if mode == SeedMode::Keep && duplicate_key_index(&e).is_some() => {
                Ok(SeedOutcome::Kept)
            }
            Err(e) => Err(Error::persistence(format!("seed {kind}"), e)),
        }
    }
}

/// The index name a duplicate key write error was raised on.
pub(super) fn duplicate_key_index(err: &mongodb::error::Error) -> Option<String> {
    let message = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
            &write.message
        }
        // createIndex over existing duplicates
        ErrorKind::Command(cmd) if cmd.code == DUPLICATE_KEY => &cmd.message,
        _ => return None,
    };

    Some(index_from_message(message))
}

fn index_from_message(message: &str) -> String {
    message
        .split("index: ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or("unknown")
        .to_string()
}
