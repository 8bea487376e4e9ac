mod backend;
mod config;
mod error;
mod memory;
mod mongo;
mod options;

pub(crate) use backend::integral;
pub use backend::{Backend, SeedMode, SeedOutcome};
pub use config::Config;
pub use error::{BoxError, Error, Result};
pub use memory::MemoryBackend;
pub use mongo::*;
pub use options::StoreOptions;
