use crate::model::Schema;
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeSet;

/// Canonical scalar projection of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "mode", content = "names")]
pub enum FieldsSelection {
    /// Every non-populatable attribute
    All,
    /// Explicit, order-irrelevant set of attribute names
    Only(BTreeSet<String>),
}

impl Default for FieldsSelection {
    fn default() -> Self {
        FieldsSelection::All
    }
}

impl FieldsSelection {
    pub fn is_all(&self) -> bool {
        matches!(self, FieldsSelection::All)
    }

    pub fn contains(&self, schema: &Schema, name: &str) -> bool {
        match self {
            FieldsSelection::All => schema.scalar_attribute_names().any(|n| n == name),
            FieldsSelection::Only(names) => names.contains(name),
        }
    }

    /// Concrete attribute names, expanding `All` against `schema`
    pub fn names(&self, schema: &Schema) -> Vec<String> {
        match self {
            FieldsSelection::All => schema
                .scalar_attribute_names()
                .map(str::to_string)
                .collect(),
            FieldsSelection::Only(names) => names.iter().cloned().collect(),
        }
    }

    /// Comma-joined string notation that normalizes back to `self`
    pub fn to_string_notation(&self, schema: &Schema) -> String {
        self.names(schema).iter().join(",")
    }

    /// Array notation that normalizes back to `self`
    pub fn to_array_notation(&self, schema: &Schema) -> serde_json::Value {
        serde_json::Value::Array(
            self.names(schema)
                .into_iter()
                .map(serde_json::Value::String)
                .collect(),
        )
    }
}
