use crate::model::{FieldsSelection, FilterTree, Pagination, ParamKind, PopulateTree, SchemaId, SortList};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw, loosely-typed request parameters as handed over by a front end.
///
/// Every parameter accepts all of its surface notations (string, array or
/// object), so the values are kept as plain JSON until resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub populate: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Value>,
    /// Entity-service style offset, merged into `pagination`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Value>,
    /// Entity-service style limit, merged into `pagination`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl QueryParams {
    /// First parameter family present, in resolution order; `fields` when empty
    pub fn leading_parameter(&self) -> ParamKind {
        let present = [
            (ParamKind::Fields, self.fields.is_some()),
            (ParamKind::Filters, self.filters.is_some()),
            (ParamKind::Populate, self.populate.is_some()),
            (ParamKind::Sort, self.sort.is_some()),
            (
                ParamKind::Pagination,
                self.pagination.is_some() || self.start.is_some() || self.limit.is_some(),
            ),
            (ParamKind::Status, self.status.is_some()),
        ];
        present
            .into_iter()
            .find_map(|(kind, given)| given.then_some(kind))
            .unwrap_or(ParamKind::Fields)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Draft,
    Published,
}

impl PublicationStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(PublicationStatus::Draft),
            "published" => Some(PublicationStatus::Published),
            _ => None,
        }
    }
}

/// Fully resolved, canonical query handed to a storage executor.
///
/// Built only through [`crate::logic::assemble`]; it exposes read accessors
/// and is never changed after assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    schema: SchemaId,
    fields: FieldsSelection,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<FilterTree>,
    populate: PopulateTree,
    sort: SortList,
    pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<PublicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locale: Option<String>,
}

impl QueryPlan {
    pub(crate) fn new(
        schema: SchemaId,
        fields: FieldsSelection,
        filters: Option<FilterTree>,
        populate: PopulateTree,
        sort: SortList,
        pagination: Pagination,
    ) -> Self {
        Self {
            schema,
            fields,
            filters,
            populate,
            sort,
            pagination,
            status: None,
            locale: None,
        }
    }

    pub(crate) fn with_document_scope(
        mut self,
        status: Option<PublicationStatus>,
        locale: Option<String>,
    ) -> Self {
        self.status = status;
        self.locale = locale;
        self
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn fields(&self) -> &FieldsSelection {
        &self.fields
    }

    pub fn filters(&self) -> Option<&FilterTree> {
        self.filters.as_ref()
    }

    pub fn populate(&self) -> &PopulateTree {
        &self.populate
    }

    pub fn sort(&self) -> &SortList {
        &self.sort
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn status(&self) -> Option<PublicationStatus> {
        self.status
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }
}
