use crate::error::{QueryError, Result};
use crate::logic::{AttributeClass, ResolutionContext};
use crate::model::{AttributePath, FieldsSelection, ParamKind, Schema, SortDirection, SortTerm};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

const WILDCARD: &str = "*";

/// Surface-independent form of a list-like parameter
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalNotation {
    Fields(FieldsSelection),
    /// Object notation of `populate`, with strings and dot paths expanded
    Populate(Map<String, Value>),
    /// Sort terms in request order, not yet checked against the schema chain
    Sort(Vec<SortTerm>),
}

/// Converts string, array and object notations into one canonical form
pub struct Normalizer;

impl Normalizer {
    pub fn normalize(
        ctx: &ResolutionContext<'_>,
        kind: ParamKind,
        raw: &Value,
        schema: &Schema,
        path: &AttributePath,
    ) -> Result<CanonicalNotation> {
        match kind {
            ParamKind::Fields => Self::fields(ctx, raw, schema, path).map(CanonicalNotation::Fields),
            ParamKind::Populate => {
                Self::populate(ctx, raw, schema, path).map(CanonicalNotation::Populate)
            }
            ParamKind::Sort => Self::sort(ctx, raw, path).map(CanonicalNotation::Sort),
            other => Err(QueryError::invalid_notation(
                other,
                path,
                format!("'{}' has no list notation", other),
            )),
        }
    }

    /// Flattens comma-joined strings and (nested) arrays of strings into tokens
    pub fn split_list(raw: &Value, parameter: ParamKind, path: &AttributePath) -> Result<Vec<String>> {
        match raw {
            Value::String(joined) => Ok(split_commas(joined)),
            Value::Array(items) => {
                let mut tokens = Vec::new();
                for item in items {
                    let nested = match item {
                        Value::String(_) | Value::Array(_) => Self::split_list(item, parameter, path)?,
                        other => {
                            return Err(QueryError::invalid_notation(
                                parameter,
                                path,
                                format!("array notation only accepts strings, got {}", other),
                            ))
                        }
                    };
                    if nested.iter().any(|token| token == WILDCARD) {
                        return Err(QueryError::invalid_notation(
                            parameter,
                            path,
                            "wildcard '*' is not allowed inside array notation",
                        ));
                    }
                    tokens.extend(nested);
                }
                Ok(tokens)
            }
            other => Err(QueryError::invalid_notation(
                parameter,
                path,
                format!("expected a string or an array of strings, got {}", other),
            )),
        }
    }

    pub fn fields(
        ctx: &ResolutionContext<'_>,
        raw: &Value,
        schema: &Schema,
        path: &AttributePath,
    ) -> Result<FieldsSelection> {
        if raw.is_null() {
            return Ok(FieldsSelection::All);
        }
        if raw.as_str().map(str::trim) == Some(WILDCARD) {
            return Ok(FieldsSelection::All);
        }

        let mut names = BTreeSet::new();
        for token in Self::split_list(raw, ParamKind::Fields, path)? {
            let field_path = path.child(&token);
            if token == WILDCARD {
                return Err(QueryError::invalid_notation(
                    ParamKind::Fields,
                    &field_path,
                    "wildcard '*' must be the whole fields notation",
                ));
            }
            match ctx.classify(schema, &token) {
                AttributeClass::Unknown => {
                    return Err(QueryError::unknown_attribute(ParamKind::Fields, &field_path, &schema.id))
                }
                class if class.is_populatable() => {
                    return Err(QueryError::invalid_notation(
                        ParamKind::Fields,
                        &field_path,
                        format!("'{}' is populatable; request it through populate", token),
                    ))
                }
                _ => {
                    names.insert(token);
                }
            }
        }

        // A selection that covers every declared scalar is the wildcard
        if schema.scalar_attribute_names().all(|name| names.contains(name)) {
            return Ok(FieldsSelection::All);
        }
        Ok(FieldsSelection::Only(names))
    }

    pub fn populate(
        ctx: &ResolutionContext<'_>,
        raw: &Value,
        schema: &Schema,
        path: &AttributePath,
    ) -> Result<Map<String, Value>> {
        match raw {
            Value::Null => Ok(Map::new()),
            Value::String(s) if s.trim() == WILDCARD => Ok(schema
                .populatable_attribute_names()
                .map(|name| (name.to_string(), Value::Bool(true)))
                .collect()),
            Value::String(_) | Value::Array(_) => {
                let mut notation = Map::new();
                for token in Self::split_list(raw, ParamKind::Populate, path)? {
                    if token == WILDCARD {
                        return Err(QueryError::invalid_notation(
                            ParamKind::Populate,
                            path,
                            "wildcard '*' must be the whole populate notation",
                        ));
                    }
                    let segments: Vec<&str> = token.split('.').collect();
                    Self::insert_dotted(ctx, &mut notation, schema, &segments, path)?;
                }
                Ok(notation)
            }
            Value::Object(map) => {
                if map.contains_key(WILDCARD) {
                    return Err(QueryError::invalid_notation(
                        ParamKind::Populate,
                        path,
                        "wildcard '*' is not allowed as an object key",
                    ));
                }
                Ok(map.clone())
            }
            other => Err(QueryError::invalid_notation(
                ParamKind::Populate,
                path,
                format!("unsupported populate notation {}", other),
            )),
        }
    }

    /// Expands `author.avatar` into `{ author: { populate: { avatar: true } } }`,
    /// or into a `fields` narrowing when the last segment is a scalar
    fn insert_dotted(
        ctx: &ResolutionContext<'_>,
        notation: &mut Map<String, Value>,
        schema: &Schema,
        segments: &[&str],
        path: &AttributePath,
    ) -> Result<()> {
        let Some((head, rest)) = segments.split_first() else {
            return Ok(());
        };
        if head.is_empty() {
            return Err(QueryError::invalid_notation(
                ParamKind::Populate,
                path,
                "empty segment in dotted populate path",
            ));
        }

        let child_path = path.child(head);
        match ctx.classify(schema, head) {
            AttributeClass::Unknown => Err(QueryError::unknown_attribute(
                ParamKind::Populate,
                &child_path,
                &schema.id,
            )),
            AttributeClass::Scalar(_) | AttributeClass::NonFilterable => {
                Err(QueryError::invalid_notation(
                    ParamKind::Populate,
                    &child_path,
                    format!("'{}' is not populatable", head),
                ))
            }
            AttributeClass::MorphNested(_) if !rest.is_empty() => Err(QueryError::invalid_notation(
                ParamKind::Populate,
                &child_path,
                format!("'{}' is polymorphic; use the 'on' fragment notation", head),
            )),
            AttributeClass::MorphNested(_) => {
                merge_entry(notation, head, Value::Bool(true));
                Ok(())
            }
            AttributeClass::Nested(_) if rest.is_empty() => {
                merge_entry(notation, head, Value::Bool(true));
                Ok(())
            }
            AttributeClass::Nested(target) => {
                let target_schema = ctx.schema(&target, ParamKind::Populate, &child_path)?;

                let mut nested = Map::new();
                let leaf_is_scalar = rest.len() == 1
                    && ctx.classify(target_schema, rest[0]).is_selectable();
                if leaf_is_scalar {
                    nested.insert(
                        "fields".to_string(),
                        Value::Array(vec![Value::String(rest[0].to_string())]),
                    );
                } else {
                    let mut inner = Map::new();
                    Self::insert_dotted(ctx, &mut inner, target_schema, rest, &child_path)?;
                    nested.insert("populate".to_string(), Value::Object(inner));
                }
                merge_entry(notation, head, Value::Object(nested));
                Ok(())
            }
        }
    }

    pub fn sort(
        ctx: &ResolutionContext<'_>,
        raw: &Value,
        path: &AttributePath,
    ) -> Result<Vec<SortTerm>> {
        let mut terms = Vec::new();
        match raw {
            Value::Null => {}
            Value::String(joined) => {
                for token in split_commas(joined) {
                    terms.push(parse_sort_token(&token, path)?);
                }
            }
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(joined) => {
                            for token in split_commas(joined) {
                                terms.push(parse_sort_token(&token, path)?);
                            }
                        }
                        Value::Object(map) => {
                            Self::sort_object(ctx, map, &AttributePath::root(), path, &mut terms)?
                        }
                        other => {
                            return Err(QueryError::invalid_notation(
                                ParamKind::Sort,
                                path,
                                format!("sort array items must be strings or objects, got {}", other),
                            ))
                        }
                    }
                }
            }
            Value::Object(map) => Self::sort_object(ctx, map, &AttributePath::root(), path, &mut terms)?,
            other => {
                return Err(QueryError::invalid_notation(
                    ParamKind::Sort,
                    path,
                    format!("unsupported sort notation {}", other),
                ))
            }
        }
        Ok(terms)
    }

    fn sort_object(
        ctx: &ResolutionContext<'_>,
        map: &Map<String, Value>,
        prefix: &AttributePath,
        base: &AttributePath,
        terms: &mut Vec<SortTerm>,
    ) -> Result<()> {
        for (key, value) in map {
            let relative = prefix.child(key);
            match value {
                Value::String(direction) => {
                    let direction = SortDirection::parse(direction).ok_or_else(|| {
                        QueryError::invalid_notation(
                            ParamKind::Sort,
                            &join(base, &relative),
                            format!("sort direction must be 'asc' or 'desc', got '{}'", direction),
                        )
                    })?;
                    terms.push(SortTerm::new(relative, direction));
                }
                Value::Object(inner) => {
                    if relative.len() > ctx.limits().max_depth {
                        return Err(QueryError::depth_exceeded(
                            ParamKind::Sort,
                            &join(base, &relative),
                            ctx.limits().max_depth,
                        ));
                    }
                    Self::sort_object(ctx, inner, &relative, base, terms)?;
                }
                other => {
                    return Err(QueryError::invalid_notation(
                        ParamKind::Sort,
                        &join(base, &relative),
                        format!("sort object values must be 'asc', 'desc' or objects, got {}", other),
                    ))
                }
            }
        }
        Ok(())
    }
}

fn split_commas(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn join(base: &AttributePath, relative: &AttributePath) -> AttributePath {
    let mut joined = base.clone();
    for segment in relative.segments() {
        joined.push(segment.clone());
    }
    joined
}

fn parse_sort_token(token: &str, base: &AttributePath) -> Result<SortTerm> {
    let mut parts = token.split(':');
    let name = parts.next().unwrap_or_default().trim();
    let direction = parts.next().map(str::trim);
    if parts.next().is_some() {
        return Err(QueryError::invalid_notation(
            ParamKind::Sort,
            base,
            format!("'{}' has more than one direction separator", token),
        ));
    }

    let relative = AttributePath::from(name);
    if name.is_empty() || name == WILDCARD || relative.segments().iter().any(String::is_empty) {
        return Err(QueryError::invalid_notation(
            ParamKind::Sort,
            base,
            format!("'{}' is not a valid sort attribute path", token),
        ));
    }

    let direction = match direction {
        None => SortDirection::Asc,
        Some(raw) => SortDirection::parse(raw).ok_or_else(|| {
            QueryError::invalid_notation(
                ParamKind::Sort,
                &join(base, &relative),
                format!("sort direction must be 'asc' or 'desc', got '{}'", raw),
            )
        })?,
    };
    Ok(SortTerm::new(relative, direction))
}

/// Merges a populate entry; a nested query wins over `true`
fn merge_entry(notation: &mut Map<String, Value>, key: &str, value: Value) {
    let merged = match (notation.remove(key), value) {
        (None, value) => value,
        (Some(Value::Bool(true)), value) | (Some(value), Value::Bool(true)) => value,
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            Value::Object(merge_queries(existing, incoming))
        }
        (Some(_), value) => value,
    };
    notation.insert(key.to_string(), merged);
}

fn merge_queries(mut existing: Map<String, Value>, incoming: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in incoming {
        let current = existing.remove(&key);
        let merged = match (key.as_str(), current, value) {
            ("fields", Some(Value::Array(mut fields)), Value::Array(extra)) => {
                for field in extra {
                    if !fields.contains(&field) {
                        fields.push(field);
                    }
                }
                Value::Array(fields)
            }
            ("populate", Some(Value::Object(mut populate)), Value::Object(extra)) => {
                for (name, entry) in extra {
                    merge_entry(&mut populate, &name, entry);
                }
                Value::Object(populate)
            }
            (_, _, value) => value,
        };
        existing.insert(key, merged);
    }
    existing
}
