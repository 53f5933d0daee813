use crate::error::{QueryError, Result};
use crate::logic::{
    FilterResolver, Normalizer, PaginationResolver, PopulateResolver, RelationMutationResolver,
    ResolutionContext, SortResolver,
};
use crate::model::{
    AttributePath, FieldsSelection, FilterTree, Pagination, ParamKind, PopulateTree,
    PublicationStatus, QueryParams, QueryPlan, RelationMutationPlan, ResolutionLimits, Schema,
    SortList, VIRTUAL_DOCUMENT_ID, VIRTUAL_ID,
};
use crate::registry::SchemaSource;
use log::debug;
use serde_json::{Map, Value};

/// Compose resolved parameters into an immutable [`QueryPlan`].
///
/// A field may be projected in `fields` while its sibling attributes are
/// populated or not; no cross-parameter check happens here.
pub fn assemble(
    schema: &Schema,
    fields: FieldsSelection,
    filters: Option<FilterTree>,
    populate: PopulateTree,
    sort: SortList,
    pagination: Pagination,
) -> QueryPlan {
    QueryPlan::new(schema.id.clone(), fields, filters, populate, sort, pagination)
}

/// Entry point tying every resolver to one registry snapshot and set of limits.
///
/// Holds only shared references, so one planner may be used from many threads
/// as long as the registry it borrows is not mutated.
pub struct QueryPlanner<'r> {
    registry: &'r dyn SchemaSource,
    limits: ResolutionLimits,
}

impl<'r> QueryPlanner<'r> {
    pub fn new(registry: &'r dyn SchemaSource, limits: ResolutionLimits) -> Self {
        Self { registry, limits }
    }

    pub fn limits(&self) -> &ResolutionLimits {
        &self.limits
    }

    fn context(&self) -> ResolutionContext<'r> {
        ResolutionContext::new(self.registry, self.limits)
    }

    fn root_schema(&self, schema_id: &str, parameter: ParamKind) -> Result<&'r Schema> {
        self.registry
            .get_schema(schema_id)
            .ok_or_else(|| QueryError::schema_not_found(parameter, &AttributePath::root(), schema_id))
    }

    pub fn resolve_fields(&self, schema_id: &str, raw: &Value) -> Result<FieldsSelection> {
        let ctx = self.context();
        let schema = self.root_schema(schema_id, ParamKind::Fields)?;
        Normalizer::fields(&ctx, raw, schema, &AttributePath::root())
    }

    pub fn resolve_filters(&self, schema_id: &str, raw: &Value) -> Result<Option<FilterTree>> {
        let ctx = self.context();
        let schema = self.root_schema(schema_id, ParamKind::Filters)?;
        FilterResolver::resolve(&ctx, raw, schema, &AttributePath::root(), 0)
    }

    pub fn resolve_populate(&self, schema_id: &str, raw: &Value) -> Result<PopulateTree> {
        let ctx = self.context();
        let schema = self.root_schema(schema_id, ParamKind::Populate)?;
        PopulateResolver::resolve(&ctx, raw, schema, &AttributePath::root(), 0)
    }

    pub fn resolve_sort(&self, schema_id: &str, raw: &Value) -> Result<SortList> {
        let ctx = self.context();
        let schema = self.root_schema(schema_id, ParamKind::Sort)?;
        SortResolver::resolve(&ctx, raw, schema, &AttributePath::root(), 0)
    }

    pub fn resolve_pagination(&self, raw: &Value) -> Result<Pagination> {
        PaginationResolver::resolve(raw, &self.limits.pagination)
    }

    pub fn resolve_relation_mutation(
        &self,
        schema_id: &str,
        attribute: &str,
        raw: &Value,
    ) -> Result<RelationMutationPlan> {
        let schema = self.root_schema(schema_id, ParamKind::Relation)?;
        let path = AttributePath::from_segments([attribute]);
        let definition = schema
            .attribute(attribute)
            .ok_or_else(|| QueryError::unknown_attribute(ParamKind::Relation, &path, &schema.id))?;
        RelationMutationResolver::resolve(raw, definition)
    }

    /// Plan every relation or media attribute present in a write payload,
    /// in payload order; scalar keys are left to the caller
    pub fn resolve_relation_mutations(
        &self,
        schema_id: &str,
        data: &Map<String, Value>,
    ) -> Result<Vec<RelationMutationPlan>> {
        let schema = self.root_schema(schema_id, ParamKind::Relation)?;
        let mut plans = Vec::new();
        for (name, raw) in data {
            match schema.attribute(name) {
                Some(attribute) if attribute.is_relational() => {
                    plans.push(RelationMutationResolver::resolve(raw, attribute)?);
                }
                Some(_) => {}
                None if name == VIRTUAL_ID || name == VIRTUAL_DOCUMENT_ID => {}
                None => {
                    return Err(QueryError::unknown_attribute(
                        ParamKind::Relation,
                        &AttributePath::from_segments([name.as_str()]),
                        &schema.id,
                    ))
                }
            }
        }
        Ok(plans)
    }

    /// Resolve every parameter of a read request against `schema_id`
    pub fn plan(&self, schema_id: &str, params: &QueryParams) -> Result<QueryPlan> {
        let ctx = self.context();
        let schema = self.root_schema(schema_id, params.leading_parameter())?;
        let root = AttributePath::root();

        let fields = match &params.fields {
            Some(raw) => Normalizer::fields(&ctx, raw, schema, &root)?,
            None => FieldsSelection::All,
        };
        let filters = match &params.filters {
            Some(raw) => FilterResolver::resolve(&ctx, raw, schema, &root, 0)?,
            None => None,
        };
        let populate = match &params.populate {
            Some(raw) => PopulateResolver::resolve(&ctx, raw, schema, &root, 0)?,
            None => PopulateTree::new(),
        };
        let sort = match &params.sort {
            Some(raw) => SortResolver::resolve(&ctx, raw, schema, &root, 0)?,
            None => SortList::new(),
        };
        let pagination = PaginationResolver::resolve(&merged_pagination(params)?, &self.limits.pagination)?;
        let status = match &params.status {
            None | Some(Value::Null) => None,
            Some(raw) => Some(parse_status(raw)?),
        };

        let plan = assemble(schema, fields, filters, populate, sort, pagination)
            .with_document_scope(status, params.locale.clone());
        debug!(
            "Planned {} query: {} populate entries, {} sort terms",
            schema.id,
            plan.populate().len(),
            plan.sort().len()
        );
        Ok(plan)
    }
}

/// Fold entity-service style top-level `start`/`limit` into the pagination notation
fn merged_pagination(params: &QueryParams) -> Result<Value> {
    let mut merged = match &params.pagination {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            return Err(QueryError::invalid_notation(
                ParamKind::Pagination,
                &AttributePath::root(),
                format!("pagination must be an object, got {}", other),
            ))
        }
    };

    for (key, value) in [("start", &params.start), ("limit", &params.limit)] {
        let Some(value) = value else { continue };
        if merged.contains_key(key) {
            return Err(QueryError::invalid_notation(
                ParamKind::Pagination,
                &AttributePath::from_segments([key]),
                format!("'{}' is given both at the top level and inside pagination", key),
            ));
        }
        merged.insert(key.to_string(), value.clone());
    }

    if merged.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Object(merged))
}

fn parse_status(raw: &Value) -> Result<PublicationStatus> {
    raw.as_str()
        .and_then(PublicationStatus::parse)
        .ok_or_else(|| {
            QueryError::invalid_operand(
                ParamKind::Status,
                &AttributePath::root(),
                format!("status must be 'draft' or 'published', got {}", raw),
            )
        })
}
