use std::fmt;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use crate::IndexSpec;

use super::Result;

/// What to do with a counter record that already exists when seeding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedMode {
    /// Insert only if absent.
    Keep,
    /// Overwrite with the start value.
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    Kept,
    Reset,
}

impl fmt::Display for SeedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Kept => "kept",
            Self::Reset => "reset",
        })
    }
}

/// The document store the allocator and provisioner run against.
///
/// Counter records live in the backend's counters collection as
/// `{ _id: <kind>, c: <next value> }`. Every counter mutation is a single
/// atomic operation in the store; implementations must never emulate one
/// with a read followed by a write from another call.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Adds one to `c` and returns the value before the increment, or `None`
    /// if no record exists for `kind`.
    async fn find_and_increment(&self, kind: &str) -> Result<Option<i64>>;

    /// Raises `c` to at least `floor` and returns the resulting value, or
    /// `None` if no record exists for `kind`.
    async fn find_and_raise(&self, kind: &str, floor: i64) -> Result<Option<i64>>;

    async fn read_counter(&self, kind: &str) -> Result<Option<i64>>;

    async fn seed_counter(&self, kind: &str, start: i64, mode: SeedMode) -> Result<SeedOutcome>;

    async fn ensure_index(&self, collection: &str, index: &IndexSpec) -> Result<()>;

    async fn drop_collection(&self, collection: &str) -> Result<()>;

    /// Fails with `ConstraintViolation` if `doc` collides on a unique index
    /// (including `_id`).
    async fn insert(&self, collection: &str, doc: Document) -> Result<()>;
}

/// Integer value of a stored number. The mongo shell writes numbers as
/// doubles, so integral doubles count too.
pub(crate) fn integral(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int64(n) => Some(*n),
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Double(f) if f.fract() == 0.0 && *f >= -(2_f64.powi(63)) && *f < 2_f64.powi(63) => {
            Some(*f as i64)
        }
        _ => None,
    }
}
