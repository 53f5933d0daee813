use crate::error::{ErrorKind, QueryError, Result};
use crate::logic::{AttributeClass, Normalizer, ResolutionContext};
use crate::model::{AttributePath, ParamKind, Schema, SortList, SortTerm};
use serde_json::Value;
use std::collections::HashSet;

/// Validates sort terms against the schema chain each path walks through
pub struct SortResolver;

impl SortResolver {
    pub fn resolve(
        ctx: &ResolutionContext<'_>,
        raw: &Value,
        schema: &Schema,
        path: &AttributePath,
        hops: usize,
    ) -> Result<SortList> {
        let terms = Normalizer::sort(ctx, raw, path)?;
        let mut seen = HashSet::new();

        for term in &terms {
            let mut full_path = path.clone();
            for segment in term.path.segments() {
                full_path.push(segment.clone());
            }

            let term_hops = hops + term.path.len().saturating_sub(1);
            ctx.check_depth(term_hops, ParamKind::Sort, &full_path)?;
            Self::validate_path(ctx, term, schema, path)?;

            if !seen.insert(term.path.clone()) {
                return Err(QueryError::new(
                    ErrorKind::DuplicateSortKey,
                    ParamKind::Sort,
                    &full_path,
                    format!("'{}' is sorted on more than once", term.path),
                ));
            }
        }

        Ok(terms)
    }

    /// Every intermediate segment must hop into a single target schema and the
    /// last one must be a filterable scalar
    fn validate_path(
        ctx: &ResolutionContext<'_>,
        term: &SortTerm,
        schema: &Schema,
        base: &AttributePath,
    ) -> Result<()> {
        let segments = term.path.segments();
        let mut current = schema;
        let mut walked = base.clone();

        for (index, segment) in segments.iter().enumerate() {
            walked.push(segment.clone());
            let is_last = index + 1 == segments.len();

            match (ctx.classify(current, segment), is_last) {
                (AttributeClass::Unknown, _) => {
                    return Err(QueryError::unknown_attribute(ParamKind::Sort, &walked, &current.id))
                }
                (AttributeClass::Scalar(_), true) => {}
                (AttributeClass::Scalar(_) | AttributeClass::NonFilterable, false) => {
                    return Err(QueryError::invalid_notation(
                        ParamKind::Sort,
                        &walked,
                        format!("'{}' is a scalar and cannot be traversed", segment),
                    ))
                }
                (AttributeClass::NonFilterable, true) => {
                    return Err(QueryError::invalid_notation(
                        ParamKind::Sort,
                        &walked,
                        format!("'{}' is not sortable", segment),
                    ))
                }
                (AttributeClass::Nested(_), true) => {
                    return Err(QueryError::invalid_notation(
                        ParamKind::Sort,
                        &walked,
                        format!("'{}' is a relation; sort on one of its attributes", segment),
                    ))
                }
                (AttributeClass::MorphNested(_), _) => {
                    return Err(QueryError::invalid_notation(
                        ParamKind::Sort,
                        &walked,
                        format!("polymorphic attribute '{}' cannot be sorted on", segment),
                    ))
                }
                (AttributeClass::Nested(target), false) => {
                    current = ctx.schema(&target, ParamKind::Sort, &walked)?;
                }
            }
        }

        Ok(())
    }
}
