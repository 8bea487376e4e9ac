mod index;
mod migration;
mod provisioner;

pub(crate) use index::index_value;
pub use index::IndexSpec;
pub use migration::{migrations, migrations_for, Migration, Step};
pub use provisioner::{ProvisionMode, ProvisionReport, Provisioner};
