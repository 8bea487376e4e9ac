use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use ephendb::{
    Backend, Config, IdAllocator, MemoryBackend, Mongo, ProvisionMode, Provisioner, Result,
    StoreOptions,
};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let options = match &cli.config {
        Some(path) => StoreOptions::load_from(path)?,
        None => StoreOptions::load()?,
    };

    let backend: Arc<dyn Backend> = if cli.memory {
        Arc::new(MemoryBackend::new(&options.counters))
    } else {
        Arc::new(Mongo::load(&options).await?)
    };

    let allocator = IdAllocator::new(backend, options.entity_kinds());
    let provisioner = Provisioner::from_options(allocator.clone(), &options);

    // A fresh in-memory store has nothing to allocate from.
    if cli.memory && !matches!(cli.command, Command::Provision { .. }) {
        provisioner.run(ProvisionMode::NonDestructive).await?;
    }

    match cli.command {
        Command::Provision { destructive } => {
            let mode = if destructive {
                ProvisionMode::Destructive
            } else {
                ProvisionMode::NonDestructive
            };
            let report = provisioner.run(mode).await?;
            for (kind, outcome) in &report.counters {
                println!("counter {kind}: {outcome}");
            }
            println!(
                "{} indexes ensured, {} collections dropped, migrations recorded {:?}",
                report.indexes.len(),
                report.dropped.len(),
                report.recorded
            );
        }
        Command::Allocate { kind } => {
            let id = allocator
                .allocate_id_retrying(&kind, &options.retry_policy())
                .await?;
            println!("{id}");
        }
        Command::Peek { kind } => println!("{}", allocator.peek(&kind).await?),
        Command::Advance { kind, floor } => println!("{}", allocator.advance(&kind, floor).await?),
    }

    Ok(())
}
