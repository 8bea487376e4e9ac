use std::sync::Arc;

use crate::{Backend, Error, Result, SeedMode, SeedOutcome};

use super::{EntityKinds, RetryPolicy};

/// Hands out unique, strictly increasing IDs per entity kind.
///
/// The counter record holds the next value to issue; `allocate_id` returns
/// that value and leaves `value + 1` behind. Cheap to clone and share across
/// tasks; all atomicity comes from the backend.
#[derive(Clone)]
pub struct IdAllocator {
    backend: Arc<dyn Backend>,
    kinds: Arc<EntityKinds>,
}

impl IdAllocator {
    pub fn new(backend: Arc<dyn Backend>, kinds: EntityKinds) -> Self {
        Self {
            backend,
            kinds: Arc::new(kinds),
        }
    }

    pub fn kinds(&self) -> &EntityKinds {
        &self.kinds
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    fn check(&self, kind: &str) -> Result<()> {
        if self.kinds.contains(kind) {
            Ok(())
        } else {
            Err(Error::not_found(kind))
        }
    }

    pub async fn allocate_id(&self, kind: &str) -> Result<i64> {
        self.check(kind)?;
        let id = self
            .backend
            .find_and_increment(kind)
            .await?
            .ok_or_else(|| Error::not_found(kind))?;
        tracing::debug!(kind, id, "allocated id");
        Ok(id)
    }

    /// Retries `Persistence` failures with backoff. A retry after a lost
    /// acknowledgement can leave a gap, never a duplicate.
    pub async fn allocate_id_retrying(&self, kind: &str, policy: &RetryPolicy) -> Result<i64> {
        let mut retry = 0;
        loop {
            match self.allocate_id(kind).await {
                Err(e) if e.is_retryable() && retry + 1 < policy.attempts => {
                    let delay = policy.backoff(retry);
                    tracing::warn!(kind, error = %e, ?delay, attempt = retry + 1, "allocation failed, retrying");
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                res => return res,
            }
        }
    }

    /// Next value `allocate_id` would hand out.
    pub async fn peek(&self, kind: &str) -> Result<i64> {
        self.check(kind)?;
        self.backend
            .read_counter(kind)
            .await?
            .ok_or_else(|| Error::not_found(kind))
    }

    /// Raises the counter to at least `floor`, never lowering it. Used after
    /// importing records whose IDs were issued elsewhere.
    pub async fn advance(&self, kind: &str, floor: i64) -> Result<i64> {
        self.check(kind)?;
        let next = self
            .backend
            .find_and_raise(kind, floor)
            .await?
            .ok_or_else(|| Error::not_found(kind))?;
        tracing::info!(kind, floor, next, "advanced counter");
        Ok(next)
    }

    pub async fn provision(&self, kind: &str, start: i64, mode: SeedMode) -> Result<SeedOutcome> {
        self.check(kind)?;
        let outcome = self.backend.seed_counter(kind, start, mode).await?;
        tracing::info!(kind, start, ?mode, %outcome, "seeded counter");
        Ok(outcome)
    }
}
