use crate::model::{FieldsSelection, FilterTree, SchemaId, SortList};
use serde::Serialize;
use std::collections::BTreeMap;

/// Populatable attribute name -> how it should be expanded
pub type PopulateTree = BTreeMap<String, PopulateEntry>;

/// Target schema id -> nested query for that member of a polymorphic attribute
pub type FragmentMap = BTreeMap<SchemaId, NestedQuery>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum PopulateEntry {
    /// Populate with defaults (`true`)
    Default,
    /// Only count the related entries of a to-many relation
    Count,
    /// Scoped query against the attribute's single target schema
    Nested {
        target: SchemaId,
        query: NestedQuery,
    },
    /// Per-target queries for dynamic zones and morph relations
    Fragments { on: FragmentMap },
}

/// Query parameters scoped to a populated target schema
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NestedQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldsSelection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterTree>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub populate: PopulateTree,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: SortList,
}

impl NestedQuery {
    /// True when it narrows nothing and would behave like `true`
    pub fn is_default(&self) -> bool {
        self.fields.is_none()
            && self.filters.is_none()
            && self.populate.is_empty()
            && self.sort.is_empty()
    }
}

/// Number of populate levels (1 for a flat tree, 0 when empty)
pub fn populate_depth(tree: &PopulateTree) -> usize {
    tree.values()
        .map(|entry| match entry {
            PopulateEntry::Default | PopulateEntry::Count => 1,
            PopulateEntry::Nested { query, .. } => 1 + populate_depth(&query.populate),
            PopulateEntry::Fragments { on } => {
                1 + on
                    .values()
                    .map(|query| populate_depth(&query.populate))
                    .max()
                    .unwrap_or(0)
            }
        })
        .max()
        .unwrap_or(0)
}
