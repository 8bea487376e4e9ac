use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ephendb", version, about = "Provision the Ephenation store and mint entity IDs")]
pub struct Cli {
    /// Options file, instead of `<config dir>/ephendb/mongodb.jsonc`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Run against a throwaway in-memory store.
    #[arg(long, global = true)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ensure indexes and seed counters.
    Provision {
        /// Drop all managed collections first. Destroys existing data!
        #[arg(long)]
        destructive: bool,
    },
    /// Allocate the next ID for an entity kind and print it.
    Allocate { kind: String },
    /// Print the next ID without allocating it.
    Peek { kind: String },
    /// Raise a counter to at least `floor`.
    Advance {
        kind: String,
        #[arg(allow_negative_numbers = true)]
        floor: i64,
    },
}
