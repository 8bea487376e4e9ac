use mongodb::bson::{Bson, Document};

use crate::sys::integral;

/// An ascending index over one or more fields of a collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSpec {
    pub fields: Vec<String>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn unique<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            unique: true,
        }
    }

    /// Non-unique, used for sorting.
    pub fn sort(field: &str) -> Self {
        Self {
            fields: vec![field.to_string()],
            unique: false,
        }
    }

    /// Same naming scheme the server uses by default, e.g. `x_1_y_1_z_1`.
    pub fn name(&self) -> String {
        self.fields
            .iter()
            .map(|field| format!("{field}_1"))
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn keys(&self) -> Document {
        self.fields
            .iter()
            .map(|field| (field.clone(), Bson::Int32(1)))
            .collect()
    }

    /// The tuple this index keys `doc` by. Missing fields index as null.
    pub fn key_of(&self, doc: &Document) -> Vec<Bson> {
        self.fields
            .iter()
            .map(|field| doc.get(field).map_or(Bson::Null, index_value))
            .collect()
    }
}

/// Numbers compare by value in an index, whatever their stored width.
pub(crate) fn index_value(value: &Bson) -> Bson {
    integral(value).map_or_else(|| value.clone(), Bson::Int64)
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    #[test]
    fn composite_name_and_keys() {
        let index = IndexSpec::unique(["x", "y", "z"]);
        assert_eq!(index.name(), "x_1_y_1_z_1");
        assert_eq!(index.keys(), doc! {"x": 1, "y": 1, "z": 1});
    }

    #[test]
    fn numeric_keys_ignore_stored_width() {
        let index = IndexSpec::unique(["x", "y", "z"]);
        assert_eq!(
            index.key_of(&doc! {"x": 1_i32, "y": -2_i32, "z": 3_i32}),
            index.key_of(&doc! {"x": 1_i64, "y": -2.0, "z": 3_i64})
        );
        assert_ne!(
            index.key_of(&doc! {"x": 1, "y": 2, "z": 3}),
            index.key_of(&doc! {"x": 1, "y": 2, "z": 3.5})
        );
    }

    #[test]
    fn missing_field_keys_as_null() {
        let index = IndexSpec::unique(["email"]);
        assert_eq!(index.key_of(&doc! {"name": "ann"}), vec![Bson::Null]);
    }
}
