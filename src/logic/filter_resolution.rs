use crate::error::{ErrorKind, QueryError, Result};
use crate::logic::{AttributeClass, OperandCoercer, ResolutionContext};
use crate::model::{
    Attribute, AttributePath, FilterOperator, FilterTree, LogicalOperator, Operand, ParamKind, ScalarDomain,
    ScalarValue, Schema,
};
use log::trace;
use serde_json::{Map, Value};

/// Turns a raw `filters` object into a schema-checked [`FilterTree`]
pub struct FilterResolver;

impl FilterResolver {
    /// Resolve `raw` against `schema`, which sits `hops` relation hops below
    /// the root. Returns `None` when the filter constrains nothing.
    pub fn resolve(
        ctx: &ResolutionContext<'_>,
        raw: &Value,
        schema: &Schema,
        path: &AttributePath,
        hops: usize,
    ) -> Result<Option<FilterTree>> {
        match raw {
            Value::Null => Ok(None),
            Value::Object(map) => Self::resolve_object(ctx, map, schema, path, hops, 0),
            other => Err(QueryError::invalid_notation(
                ParamKind::Filters,
                path,
                format!("filters must be an object, got {}", other),
            )),
        }
    }

    fn resolve_object(
        ctx: &ResolutionContext<'_>,
        map: &Map<String, Value>,
        schema: &Schema,
        path: &AttributePath,
        hops: usize,
        nesting: usize,
    ) -> Result<Option<FilterTree>> {
        let mut conditions = Vec::new();

        for (key, value) in map {
            if let Some(operator) = LogicalOperator::from_key(key) {
                let group = Self::logical_group(ctx, operator, value, path, nesting, |ctx, child, nesting| {
                    match child {
                        Value::Object(child) => Self::resolve_object(ctx, child, schema, path, hops, nesting),
                        other => Err(QueryError::invalid_notation(
                            ParamKind::Filters,
                            path,
                            format!("{} members must be objects, got {}", key, other),
                        )),
                    }
                })?;
                conditions.extend(group);
                continue;
            }

            let attribute_path = path.child(key);
            if key.starts_with('$') {
                return Err(QueryError::new(
                    ErrorKind::InvalidFilterOperator,
                    ParamKind::Filters,
                    &attribute_path,
                    format!("operator '{}' must be applied to an attribute", key),
                ));
            }

            match ctx.classify(schema, key) {
                AttributeClass::Unknown => {
                    return Err(QueryError::unknown_attribute(ParamKind::Filters, &attribute_path, &schema.id))
                }
                AttributeClass::NonFilterable => {
                    return Err(QueryError::new(
                        ErrorKind::InvalidFilterOperator,
                        ParamKind::Filters,
                        &attribute_path,
                        format!("attribute '{}' is not filterable", key),
                    ))
                }
                AttributeClass::MorphNested(_) => {
                    return Err(QueryError::new(
                        ErrorKind::InvalidFilterOperator,
                        ParamKind::Filters,
                        &attribute_path,
                        format!("polymorphic attribute '{}' cannot be filtered on", key),
                    ))
                }
                AttributeClass::Nested(target) => {
                    conditions.push(Self::resolve_nested(
                        ctx,
                        key,
                        &target,
                        value,
                        &attribute_path,
                        hops,
                        nesting,
                    )?);
                }
                AttributeClass::Scalar(domain) => {
                    let declared = schema.attribute(key);
                    let resolved = Self::resolve_attribute(
                        ctx,
                        key,
                        domain,
                        declared,
                        value,
                        &attribute_path,
                        nesting,
                    )?;
                    conditions.extend(resolved);
                }
            }
        }

        Ok(FilterTree::conjunction(conditions))
    }

    fn resolve_nested(
        ctx: &ResolutionContext<'_>,
        name: &str,
        target: &str,
        value: &Value,
        path: &AttributePath,
        hops: usize,
        nesting: usize,
    ) -> Result<FilterTree> {
        ctx.check_depth(hops + 1, ParamKind::Filters, path)?;

        let Value::Object(map) = value else {
            return Err(QueryError::invalid_notation(
                ParamKind::Filters,
                path,
                format!("conditions on '{}' must be an object keyed by its attributes", name),
            ));
        };
        if let Some(key) = map
            .keys()
            .find(|key| key.starts_with('$') && LogicalOperator::from_key(key).is_none())
        {
            return Err(QueryError::new(
                ErrorKind::InvalidFilterOperator,
                ParamKind::Filters,
                path,
                format!("operator '{}' cannot be applied to relation '{}'", key, name),
            ));
        }

        let target_schema = ctx.schema(target, ParamKind::Filters, path)?;
        trace!("Filter hop {} -> {}", path, target);
        let condition = Self::resolve_object(ctx, map, target_schema, path, hops + 1, nesting)?
            .unwrap_or_else(FilterTree::always);
        Ok(FilterTree::nested(name, target, condition))
    }

    /// Conditions on one scalar attribute; the value is an operator object or
    /// shorthand (`null`, an array, a bare scalar)
    fn resolve_attribute(
        ctx: &ResolutionContext<'_>,
        name: &str,
        domain: ScalarDomain,
        declared: Option<&Attribute>,
        value: &Value,
        path: &AttributePath,
        nesting: usize,
    ) -> Result<Option<FilterTree>> {
        let operators = match value {
            Value::Object(map) if domain == ScalarDomain::Json && !map.keys().any(|k| k.starts_with('$')) => {
                return Ok(Some(FilterTree::condition(
                    name,
                    FilterOperator::Eq,
                    Operand::Value(ScalarValue::Json(value.clone())),
                )))
            }
            Value::Object(map) => map,
            Value::Null => {
                return Ok(Some(FilterTree::condition(name, FilterOperator::Null, Operand::Flag(true))))
            }
            Value::Array(_) => {
                return Self::condition(name, FilterOperator::In, domain, declared, value, path).map(Some)
            }
            _ => return Self::condition(name, FilterOperator::Eq, domain, declared, value, path).map(Some),
        };

        let mut conditions = Vec::new();
        for (key, operand) in operators {
            if let Some(logical) = LogicalOperator::from_key(key) {
                let group = Self::logical_group(ctx, logical, operand, path, nesting, |ctx, child, nesting| {
                    Self::resolve_attribute(ctx, name, domain, declared, child, path, nesting)
                })?;
                conditions.extend(group);
                continue;
            }

            let operator = FilterOperator::from_key(key).ok_or_else(|| {
                QueryError::new(
                    ErrorKind::InvalidFilterOperator,
                    ParamKind::Filters,
                    path,
                    format!("unknown operator '{}'", key),
                )
            })?;
            conditions.push(Self::condition(name, operator, domain, declared, operand, path)?);
        }
        Ok(FilterTree::conjunction(conditions))
    }

    fn condition(
        name: &str,
        operator: FilterOperator,
        domain: ScalarDomain,
        declared: Option<&Attribute>,
        raw: &Value,
        path: &AttributePath,
    ) -> Result<FilterTree> {
        if !operator.accepts(domain) {
            return Err(QueryError::new(
                ErrorKind::InvalidFilterOperator,
                ParamKind::Filters,
                path,
                format!("operator '{}' is not valid for {} attributes", operator, domain.as_str()),
            ));
        }
        let operand = OperandCoercer::coerce(operator, domain, declared, raw)
            .map_err(|message| QueryError::invalid_operand(ParamKind::Filters, path, message))?;
        Ok(FilterTree::condition(name, operator, operand))
    }

    /// Shared handling of `$and`/`$or` (arrays) and `$not` (a single member)
    fn logical_group<F>(
        ctx: &ResolutionContext<'_>,
        operator: LogicalOperator,
        value: &Value,
        path: &AttributePath,
        nesting: usize,
        mut resolve_member: F,
    ) -> Result<Option<FilterTree>>
    where
        F: FnMut(&ResolutionContext<'_>, &Value, usize) -> Result<Option<FilterTree>>,
    {
        let max = ctx.limits().max_filter_nesting;
        if nesting + 1 > max {
            return Err(QueryError::depth_exceeded(ParamKind::Filters, path, max));
        }

        let members: Vec<&Value> = match (operator, value) {
            (LogicalOperator::Not, Value::Object(_)) => vec![value],
            (LogicalOperator::Not, other) => {
                return Err(QueryError::invalid_notation(
                    ParamKind::Filters,
                    path,
                    format!("$not expects an object, got {}", other),
                ))
            }
            (_, Value::Array(items)) => items.iter().collect(),
            (_, other) => {
                return Err(QueryError::invalid_notation(
                    ParamKind::Filters,
                    path,
                    format!("logical groups expect an array, got {}", other),
                ))
            }
        };

        // A member resolving to `None` constrains nothing and matches every entry
        let mut children = Vec::new();
        let mut matches_all = false;
        for member in members {
            match resolve_member(ctx, member, nesting + 1)? {
                Some(child) => children.push(child),
                None => matches_all = true,
            }
        }

        let group = match operator {
            LogicalOperator::And if children.is_empty() => None,
            LogicalOperator::Or if matches_all => None,
            LogicalOperator::Or if children.is_empty() => Some(FilterTree::never()),
            LogicalOperator::Not if matches_all => Some(FilterTree::never()),
            _ => Some(FilterTree::Group { operator, children }),
        };
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResolutionLimits;
    use crate::registry::SchemaSource;
    use crate::seed::demo_registry;
    use serde_json::json;

    fn resolve(raw: Value) -> Result<Option<FilterTree>> {
        resolve_with(raw, ResolutionLimits::default())
    }

    fn resolve_with(raw: Value, limits: ResolutionLimits) -> Result<Option<FilterTree>> {
        let registry = demo_registry().unwrap();
        let ctx = ResolutionContext::new(&registry, limits);
        let article = registry.get_schema("api::article.article").unwrap();
        FilterResolver::resolve(&ctx, &raw, article, &AttributePath::root(), 0)
    }

    #[test]
    fn test_simple_condition() {
        let tree = resolve(json!({ "title": { "$eq": "Hello" } })).unwrap();
        assert_eq!(
            tree,
            Some(FilterTree::condition("title", FilterOperator::Eq, Operand::Value(ScalarValue::text("Hello"))))
        );
    }

    #[test]
    fn test_shorthand_forms() {
        assert_eq!(
            resolve(json!({ "title": "Hello" })).unwrap(),
            resolve(json!({ "title": { "$eq": "Hello" } })).unwrap()
        );
        assert_eq!(
            resolve(json!({ "title": null })).unwrap(),
            Some(FilterTree::condition("title", FilterOperator::Null, Operand::Flag(true)))
        );
        assert_eq!(
            resolve(json!({ "views": [1, 2] })).unwrap(),
            Some(FilterTree::condition(
                "views",
                FilterOperator::In,
                Operand::List(vec![ScalarValue::integer(1), ScalarValue::integer(2)])
            ))
        );
    }

    #[test]
    fn test_contains_depends_on_domain() {
        assert!(resolve(json!({ "title": { "$contains": "rust" } })).is_ok());

        let err = resolve(json!({ "views": { "$contains": 5 } })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFilterOperator);
        assert_eq!(err.path, "views");
    }

    #[test]
    fn test_nested_relation_condition() {
        let tree = resolve(json!({ "author": { "name": { "$startsWith": "A" } } }))
            .unwrap()
            .unwrap();
        assert_eq!(
            tree,
            FilterTree::nested(
                "author",
                "api::user.user",
                FilterTree::condition("name", FilterOperator::StartsWith, Operand::Value(ScalarValue::text("A")))
            )
        );
    }

    #[test]
    fn test_rejections() {
        let err = resolve(json!({ "headline": "x" })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownAttribute);

        let err = resolve(json!({ "secret": "x" })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFilterOperator);

        let err = resolve(json!({ "blocks": { "text": "x" } })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFilterOperator);

        let err = resolve(json!({ "author": { "$eq": 1 } })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFilterOperator);

        let err = resolve(json!({ "title": { "$like": "x" } })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFilterOperator);

        let err = resolve(json!({ "views": { "$gt": "lots" } })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperand);
        assert_eq!(err.parameter, ParamKind::Filters);

        let err = resolve(json!({ "$eq": 1 })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFilterOperator);
    }

    #[test]
    fn test_logical_groups() {
        let tree = resolve(json!({
            "$or": [{ "title": "a" }, { "views": { "$gte": 10 } }],
            "$not": { "published": false }
        }))
        .unwrap()
        .unwrap();

        let FilterTree::Group { operator: LogicalOperator::And, children } = tree else {
            panic!("expected an implicit conjunction");
        };
        assert!(matches!(&children[0], FilterTree::Group { operator: LogicalOperator::Or, children } if children.len() == 2));
        assert!(matches!(&children[1], FilterTree::Group { operator: LogicalOperator::Not, .. }));
    }

    #[test]
    fn test_attribute_level_groups() {
        let tree = resolve(json!({ "views": { "$or": [{ "$lt": 5 }, { "$gt": 50 }] } }))
            .unwrap()
            .unwrap();
        assert!(matches!(tree, FilterTree::Group { operator: LogicalOperator::Or, .. }));
    }

    #[test]
    fn test_empty_members_match_everything() {
        assert_eq!(resolve(json!({ "$or": [{ "title": "a" }, {}] })).unwrap(), None);
        assert_eq!(resolve(json!({ "$and": [{}, {}] })).unwrap(), None);
        assert_eq!(
            resolve(json!({ "$and": [{ "title": "a" }, {}] })).unwrap(),
            Some(FilterTree::Group {
                operator: LogicalOperator::And,
                children: vec![FilterTree::condition(
                    "title",
                    FilterOperator::Eq,
                    Operand::Value(ScalarValue::text("a"))
                )],
            })
        );
    }

    #[test]
    fn test_negated_empty_member_matches_nothing() {
        assert_eq!(resolve(json!({ "$not": {} })).unwrap(), Some(FilterTree::never()));
        assert_eq!(resolve(json!({ "$or": [] })).unwrap(), Some(FilterTree::never()));

        let tree = resolve(json!({ "title": "b", "$not": { "$and": [] } })).unwrap();
        assert_eq!(
            tree,
            Some(FilterTree::and(vec![
                FilterTree::condition("title", FilterOperator::Eq, Operand::Value(ScalarValue::text("b"))),
                FilterTree::never(),
            ]))
        );
    }

    #[test]
    fn test_empty_relation_filter_keeps_the_hop() {
        assert_eq!(
            resolve(json!({ "author": {} })).unwrap(),
            Some(FilterTree::nested("author", "api::user.user", FilterTree::always()))
        );
    }

    #[test]
    fn test_attribute_level_not() {
        let tree = resolve(json!({ "title": { "$not": { "$contains": "draft" } } })).unwrap();
        assert_eq!(
            tree,
            Some(FilterTree::Group {
                operator: LogicalOperator::Not,
                children: vec![FilterTree::condition(
                    "title",
                    FilterOperator::Contains,
                    Operand::Value(ScalarValue::text("draft"))
                )],
            })
        );

        assert_eq!(resolve(json!({ "title": { "$not": {} } })).unwrap(), Some(FilterTree::never()));
    }

    #[test]
    fn test_filter_nesting_is_bounded() {
        let mut limits = ResolutionLimits::default();
        limits.max_filter_nesting = 2;

        assert!(resolve_with(json!({ "$and": [{ "$or": [{ "title": "a" }] }] }), limits).is_ok());
        let err = resolve_with(
            json!({ "$and": [{ "$or": [{ "$not": { "title": "a" } }] }] }),
            limits,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PopulateDepthExceeded);
    }

    #[test]
    fn test_relation_hops_are_bounded() {
        let limits = ResolutionLimits::default().with_max_depth(1);
        assert!(resolve_with(json!({ "author": { "name": "Ada" } }), limits).is_ok());

        let err = resolve_with(json!({ "author": { "articles": { "title": "x" } } }), limits).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PopulateDepthExceeded);
        assert_eq!(err.path, "author.articles");
    }

    #[test]
    fn test_json_attribute_accepts_object_equality() {
        let tree = resolve(json!({ "metadata": { "featured": true } })).unwrap().unwrap();
        assert!(matches!(
            tree,
            FilterTree::Condition { operator: FilterOperator::Eq, operand: Operand::Value(ScalarValue::Json(_)), .. }
        ));
    }
}
