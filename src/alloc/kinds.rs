use std::collections::BTreeMap;

/// The entity kinds IDs can be allocated for, with the value each counter
/// is seeded with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityKinds(BTreeMap<String, i64>);

impl Default for EntityKinds {
    fn default() -> Self {
        Self::new([("avatarId", 1), ("newsId", 0)])
    }
}

impl EntityKinds {
    pub fn new<'a>(kinds: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        Self(
            kinds
                .into_iter()
                .map(|(kind, start)| (kind.to_string(), start))
                .collect(),
        )
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.0.contains_key(kind)
    }

    pub fn start(&self, kind: &str) -> Option<i64> {
        self.0.get(kind).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(kind, start)| (kind.as_str(), *start))
    }
}
