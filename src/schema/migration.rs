use std::fmt;

use crate::{EntityKinds, StoreOptions};

use super::IndexSpec;

/// A single provisioning action. Every step is safe to run again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    EnsureIndex { collection: String, index: IndexSpec },
    SeedCounter { kind: String, start: i64 },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnsureIndex { collection, index } => {
                write!(f, "ensure index {collection}.{}", index.name())
            }
            Self::SeedCounter { kind, .. } => write!(f, "seed counter {kind}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    /// Dropped in destructive runs.
    pub collection: String,
    pub steps: Vec<Step>,
}

impl Migration {
    fn indexes(version: u32, name: &'static str, indexes: Vec<IndexSpec>) -> Self {
        Self {
            version,
            name,
            collection: name.to_string(),
            steps: indexes
                .into_iter()
                .map(|index| Step::EnsureIndex {
                    collection: name.to_string(),
                    index,
                })
                .collect(),
        }
    }
}

/// Avatars are keyed by their numeric `_id` from the `avatarId` counter;
/// one avatar per owner email.
pub fn migrations(options: &StoreOptions) -> Vec<Migration> {
    migrations_for(&options.counters, &options.entity_kinds())
}

pub fn migrations_for(counters: &str, kinds: &EntityKinds) -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            name: "counters",
            collection: counters.to_string(),
            steps: kinds
                .iter()
                .map(|(kind, start)| Step::SeedCounter {
                    kind: kind.to_string(),
                    start,
                })
                .collect(),
        },
        Migration::indexes(
            2,
            "avatars",
            vec![
                IndexSpec::unique(["name"]),
                IndexSpec::unique(["email"]),
                IndexSpec::sort("level"),
                IndexSpec::sort("timeonline"),
                IndexSpec::sort("tscoretotal"),
            ],
        ),
        Migration::indexes(3, "news", Vec::new()),
        Migration::indexes(
            4,
            "chunkdata",
            vec![IndexSpec::unique(["x", "y", "z"]), IndexSpec::unique(["avatarID"])],
        ),
        // keyed by email
        Migration::indexes(5, "users", Vec::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_strictly_increasing() {
        let list = migrations(&StoreOptions::default());
        assert!(list.windows(2).all(|w| w[0].version < w[1].version));
    }

    #[test]
    fn counters_migration_follows_configured_collection() {
        let list = migrations_for("ids", &EntityKinds::default());
        assert_eq!(list[0].collection, "ids");
        assert_eq!(
            list[0].steps,
            vec![
                Step::SeedCounter {
                    kind: "avatarId".to_string(),
                    start: 1
                },
                Step::SeedCounter {
                    kind: "newsId".to_string(),
                    start: 0
                },
            ]
        );
    }

    #[test]
    fn step_descriptions_name_the_target() {
        let step = Step::EnsureIndex {
            collection: "chunkdata".to_string(),
            index: IndexSpec::unique(["x", "y", "z"]),
        };
        assert_eq!(step.to_string(), "ensure index chunkdata.x_1_y_1_z_1");
    }
}
