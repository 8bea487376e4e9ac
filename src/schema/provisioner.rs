use mongodb::bson::doc;

use crate::{Error, IdAllocator, Result, SeedMode, SeedOutcome, StoreOptions};

use super::{migrations, Migration, Step};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisionMode {
    /// Drop every managed collection first, then re-seed counters at their
    /// start values. Existing data is lost.
    Destructive,
    /// Only ensure indexes exist and insert missing counters.
    NonDestructive,
}

impl ProvisionMode {
    fn seed_mode(self) -> SeedMode {
        match self {
            Self::Destructive => SeedMode::Reset,
            Self::NonDestructive => SeedMode::Keep,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub dropped: Vec<String>,
    pub indexes: Vec<String>,
    pub counters: Vec<(String, SeedOutcome)>,
    /// Versions newly written to the ledger.
    pub recorded: Vec<u32>,
    pub already_recorded: Vec<u32>,
}

/// Applies the migration list against the allocator's backend.
pub struct Provisioner {
    allocator: IdAllocator,
    migrations: Vec<Migration>,
    ledger: String,
}

impl Provisioner {
    pub fn new(allocator: IdAllocator, migrations: Vec<Migration>, ledger: &str) -> Self {
        Self {
            allocator,
            migrations,
            ledger: ledger.to_string(),
        }
    }

    pub fn from_options(allocator: IdAllocator, options: &StoreOptions) -> Self {
        Self::new(allocator, migrations(options), &options.migrations)
    }

    pub fn managed_collections(&self) -> impl Iterator<Item = &str> {
        self.migrations
            .iter()
            .map(|migration| migration.collection.as_str())
            .chain(std::iter::once(self.ledger.as_str()))
    }

    pub async fn run(&self, mode: ProvisionMode) -> Result<ProvisionReport> {
        let mut report = ProvisionReport::default();

        let res = self.run_into(mode, &mut report).await;
        if let Err(e) = &res {
            if mode == ProvisionMode::Destructive && !report.dropped.is_empty() {
                tracing::error!(
                    error = %e,
                    dropped = ?report.dropped,
                    "destructive provisioning aborted part way, dropped collections may be left empty"
                );
            } else {
                tracing::error!(error = %e, "provisioning aborted, re-running is safe");
            }
        }

        res.map(|()| report)
    }

    async fn run_into(&self, mode: ProvisionMode, report: &mut ProvisionReport) -> Result<()> {
        let backend = self.allocator.backend();

        if mode == ProvisionMode::Destructive {
            tracing::warn!("destructive provisioning, dropping all managed collections");
            for collection in self.managed_collections() {
                backend
                    .drop_collection(collection)
                    .await
                    .map_err(|e| step_error(format!("drop collection {collection}"), e))?;
                tracing::info!(collection, "dropped");
                report.dropped.push(collection.to_string());
            }
        }

        for migration in &self.migrations {
            tracing::info!(
                version = migration.version,
                migration = migration.name,
                "applying migration"
            );

            for step in &migration.steps {
                match step {
                    Step::EnsureIndex { collection, index } => {
                        backend
                            .ensure_index(collection, index)
                            .await
                            .map_err(|e| step_error(step.to_string(), e))?;
                        report.indexes.push(format!("{collection}.{}", index.name()));
                    }
                    Step::SeedCounter { kind, start } => {
                        let outcome = self
                            .allocator
                            .provision(kind, *start, mode.seed_mode())
                            .await
                            .map_err(|e| step_error(step.to_string(), e))?;
                        report.counters.push((kind.clone(), outcome));
                    }
                }
            }

            self.record(migration, report).await?;
        }

        Ok(())
    }

    async fn record(&self, migration: &Migration, report: &mut ProvisionReport) -> Result<()> {
        let entry = doc! {"_id": i64::from(migration.version), "name": migration.name};
        match self.allocator.backend().insert(&self.ledger, entry).await {
            Ok(()) => report.recorded.push(migration.version),
            Err(Error::ConstraintViolation { .. }) => {
                report.already_recorded.push(migration.version)
            }
            Err(e) => {
                return Err(step_error(
                    format!("record migration {} ({})", migration.version, migration.name),
                    e,
                ))
            }
        }
        Ok(())
    }
}

fn step_error(step: String, source: Error) -> Error {
    Error::Provision {
        step,
        source: Box::new(source),
    }
}
