use crate::error::{ErrorKind, QueryError, Result};
use crate::logic::{AttributeClass, FilterResolver, Normalizer, ResolutionContext, SortResolver};
use crate::model::{
    AttributeKind, AttributePath, FragmentMap, NestedQuery, ParamKind, PopulateEntry, PopulateTree,
    Schema, SchemaId,
};
use itertools::Itertools;
use log::trace;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Resolves `populate` into a [`PopulateTree`], recursing into target schemas
pub struct PopulateResolver;

impl PopulateResolver {
    pub fn resolve(
        ctx: &ResolutionContext<'_>,
        raw: &Value,
        schema: &Schema,
        path: &AttributePath,
        hops: usize,
    ) -> Result<PopulateTree> {
        let notation = Normalizer::populate(ctx, raw, schema, path)?;
        Self::resolve_map(ctx, &notation, schema, path, hops)
    }

    fn resolve_map(
        ctx: &ResolutionContext<'_>,
        notation: &Map<String, Value>,
        schema: &Schema,
        path: &AttributePath,
        hops: usize,
    ) -> Result<PopulateTree> {
        let mut tree = PopulateTree::new();

        for (name, value) in notation {
            let entry_path = path.child(name);
            let entry = match ctx.classify(schema, name) {
                AttributeClass::Unknown => {
                    return Err(QueryError::unknown_attribute(ParamKind::Populate, &entry_path, &schema.id))
                }
                AttributeClass::Scalar(_) | AttributeClass::NonFilterable => {
                    return Err(QueryError::invalid_notation(
                        ParamKind::Populate,
                        &entry_path,
                        format!("'{}' is not populatable", name),
                    ))
                }
                AttributeClass::Nested(target) => {
                    Self::resolve_nested(ctx, schema, name, &target, value, &entry_path, hops)?
                }
                AttributeClass::MorphNested(targets) => {
                    Self::resolve_fragments(ctx, &targets, value, &entry_path, hops)?
                }
            };

            if let Some(entry) = entry {
                tree.insert(name.clone(), entry);
            }
        }

        Ok(tree)
    }

    fn resolve_nested(
        ctx: &ResolutionContext<'_>,
        schema: &Schema,
        name: &str,
        target: &str,
        value: &Value,
        path: &AttributePath,
        hops: usize,
    ) -> Result<Option<PopulateEntry>> {
        if let Some(enabled) = as_flag(value) {
            if enabled {
                ctx.check_depth(hops + 1, ParamKind::Populate, path)?;
                return Ok(Some(PopulateEntry::Default));
            }
            return Ok(None);
        }

        let Value::Object(query) = value else {
            return Err(QueryError::invalid_notation(
                ParamKind::Populate,
                path,
                format!("'{}' must be populated with true, false or an object", name),
            ));
        };
        ctx.check_depth(hops + 1, ParamKind::Populate, path)?;

        if query.contains_key("on") {
            return Err(QueryError::new(
                ErrorKind::InvalidFragmentTarget,
                ParamKind::Populate,
                path,
                format!("'{}' has a single target; 'on' fragments only apply to polymorphic attributes", name),
            ));
        }

        if let Some(count) = query.get("count") {
            return Self::resolve_count(schema, name, query, count, path).map(Some);
        }

        let target_schema = ctx.schema(target, ParamKind::Populate, path)?;
        let nested = Self::resolve_query(ctx, query, target_schema, path, hops + 1)?;
        if nested.is_default() {
            return Ok(Some(PopulateEntry::Default));
        }
        Ok(Some(PopulateEntry::Nested {
            target: target.to_string(),
            query: nested,
        }))
    }

    fn resolve_count(
        schema: &Schema,
        name: &str,
        query: &Map<String, Value>,
        count: &Value,
        path: &AttributePath,
    ) -> Result<PopulateEntry> {
        if query.len() > 1 {
            return Err(QueryError::invalid_notation(
                ParamKind::Populate,
                path,
                "'count' cannot be combined with other populate options",
            ));
        }
        let to_many_relation = schema
            .attribute(name)
            .map(|attr| attr.kind == AttributeKind::Relation && attr.is_many)
            .unwrap_or(false);
        if !to_many_relation {
            return Err(QueryError::invalid_notation(
                ParamKind::Populate,
                path,
                format!("'count' is only available on to-many relations, not '{}'", name),
            ));
        }
        match as_flag(count) {
            Some(true) => Ok(PopulateEntry::Count),
            Some(false) => Ok(PopulateEntry::Default),
            None => Err(QueryError::invalid_notation(
                ParamKind::Populate,
                path,
                "'count' expects a boolean",
            )),
        }
    }

    fn resolve_fragments(
        ctx: &ResolutionContext<'_>,
        targets: &BTreeSet<SchemaId>,
        value: &Value,
        path: &AttributePath,
        hops: usize,
    ) -> Result<Option<PopulateEntry>> {
        if let Some(enabled) = as_flag(value) {
            if enabled {
                ctx.check_depth(hops + 1, ParamKind::Populate, path)?;
                return Ok(Some(PopulateEntry::Default));
            }
            return Ok(None);
        }

        let fragments = match value {
            Value::Object(map) if map.len() == 1 => match map.get("on") {
                Some(Value::Object(fragments)) => fragments,
                _ => return Err(morph_shape_error(path)),
            },
            _ => return Err(morph_shape_error(path)),
        };
        ctx.check_depth(hops + 1, ParamKind::Populate, path)?;

        let mut on = FragmentMap::new();
        for (target, fragment) in fragments {
            if !targets.contains(target) {
                return Err(QueryError::new(
                    ErrorKind::InvalidFragmentTarget,
                    ParamKind::Populate,
                    path,
                    format!(
                        "'{}' is not a possible target here; expected one of [{}]",
                        target,
                        targets.iter().join(", ")
                    ),
                ));
            }

            let query = match fragment {
                Value::Object(query) => {
                    let target_schema = ctx.schema(target, ParamKind::Populate, path)?;
                    Self::resolve_query(ctx, query, target_schema, path, hops + 1)?
                }
                other => match as_flag(other) {
                    Some(true) => NestedQuery::default(),
                    Some(false) => continue,
                    None => {
                        return Err(QueryError::invalid_notation(
                            ParamKind::Populate,
                            path,
                            "fragments must be true, false or an object",
                        ))
                    }
                },
            };
            trace!("Fragment {} resolved for {}", target, path);
            on.insert(target.clone(), query);
        }

        if on.is_empty() {
            return Ok(Some(PopulateEntry::Default));
        }
        Ok(Some(PopulateEntry::Fragments { on }))
    }

    /// Fields, filters, populate and sort scoped to one target schema at `hops`
    pub fn resolve_query(
        ctx: &ResolutionContext<'_>,
        query: &Map<String, Value>,
        schema: &Schema,
        path: &AttributePath,
        hops: usize,
    ) -> Result<NestedQuery> {
        let mut nested = NestedQuery::default();

        for (key, value) in query {
            match key.as_str() {
                "fields" => nested.fields = Some(Normalizer::fields(ctx, value, schema, path)?),
                "filters" => nested.filters = FilterResolver::resolve(ctx, value, schema, path, hops)?,
                "populate" => nested.populate = Self::resolve(ctx, value, schema, path, hops)?,
                "sort" => nested.sort = SortResolver::resolve(ctx, value, schema, path, hops)?,
                "on" => {
                    return Err(QueryError::new(
                        ErrorKind::InvalidFragmentTarget,
                        ParamKind::Populate,
                        path,
                        format!("'on' fragments are not allowed on '{}'", schema.id),
                    ))
                }
                other => {
                    return Err(QueryError::invalid_notation(
                        ParamKind::Populate,
                        path,
                        format!("unsupported nested populate option '{}'", other),
                    ))
                }
            }
        }

        Ok(nested)
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) if text == "true" => Some(true),
        Value::String(text) if text == "false" => Some(false),
        _ => None,
    }
}

fn morph_shape_error(path: &AttributePath) -> QueryError {
    QueryError::invalid_notation(
        ParamKind::Populate,
        path,
        "polymorphic attributes accept true or an object with only an 'on' fragment map",
    )
}
