use crate::error::{ErrorKind, QueryError, Result};
use crate::model::{AttributePath, ParamKind, Pagination, PaginationLimits};
use log::warn;
use serde_json::{Map, Value};

const PAGE_KEYS: [&str; 2] = ["page", "pageSize"];
const OFFSET_KEYS: [&str; 2] = ["start", "limit"];

/// Normalizes page-style and offset-style notations into one [`Pagination`]
pub struct PaginationResolver;

impl PaginationResolver {
    pub fn resolve(raw: &Value, limits: &PaginationLimits) -> Result<Pagination> {
        let map = match raw {
            Value::Null => return Ok(Pagination::default_for(limits)),
            Value::Object(map) => map,
            other => {
                return Err(QueryError::invalid_notation(
                    ParamKind::Pagination,
                    &AttributePath::root(),
                    format!("pagination must be an object, got {}", other),
                ))
            }
        };

        for key in map.keys() {
            let known = PAGE_KEYS.contains(&key.as_str())
                || OFFSET_KEYS.contains(&key.as_str())
                || key == "withCount";
            if !known {
                return Err(QueryError::invalid_notation(
                    ParamKind::Pagination,
                    &AttributePath::from_segments([key.as_str()]),
                    format!("unknown pagination key '{}'", key),
                ));
            }
        }

        let page = integer(map, "page")?;
        let page_size = integer(map, "pageSize")?;
        let start = integer(map, "start")?;
        let limit = integer(map, "limit")?;
        let with_count = with_count(map)?;

        let page_family = page.is_some() || page_size.is_some();
        let offset_family = start.is_some() || limit.is_some();
        let page_default_only = page == Some(1) && page_size.is_none();
        let offset_default_only = start == Some(0) && limit.is_none();

        if page_family && offset_family && !page_default_only && !offset_default_only {
            return Err(QueryError::new(
                ErrorKind::ConflictingPaginationNotation,
                ParamKind::Pagination,
                &AttributePath::root(),
                "page/pageSize and start/limit cannot be combined",
            ));
        }

        let use_offset =
            offset_family && (!page_family || (page_default_only && !offset_default_only));

        let mut pagination = if use_offset {
            let size = clamp_size("limit", limit.unwrap_or(limits.default_page_size), limits);
            Pagination::offset(start.unwrap_or(0), size)
        } else {
            let page = match page.unwrap_or(1) {
                0 => {
                    warn!("Pagination page 0 clamped to 1");
                    1
                }
                page => page,
            };
            let size = clamp_size("pageSize", page_size.unwrap_or(limits.default_page_size), limits);
            Pagination::page(page, size)
        };
        pagination.with_count = with_count;
        Ok(pagination)
    }
}

fn clamp_size(key: &str, requested: u64, limits: &PaginationLimits) -> u64 {
    if requested == 0 {
        warn!("Pagination {} 0 clamped to 1", key);
        return 1;
    }
    if requested > limits.max_page_size {
        warn!(
            "Pagination {} {} clamped to maximum {}",
            key, requested, limits.max_page_size
        );
        return limits.max_page_size;
    }
    requested
}

/// Non-negative integer, accepting numeric strings from query strings
fn integer(map: &Map<String, Value>, key: &str) -> Result<Option<u64>> {
    let Some(raw) = map.get(key) else {
        return Ok(None);
    };
    let path = AttributePath::from_segments([key]);

    let parsed = match raw {
        Value::Number(number) => match (number.as_u64(), number.as_i64()) {
            (Some(value), _) => Ok(value),
            (None, Some(_)) => Err(format!("'{}' must not be negative", key)),
            (None, None) => Err(format!("'{}' must be an integer, got {}", key, number)),
        },
        Value::String(text) => match text.trim().parse::<i64>() {
            Ok(value) if value < 0 => Err(format!("'{}' must not be negative", key)),
            Ok(value) => Ok(value as u64),
            Err(_) => Err(format!("'{}' must be an integer, got '{}'", key, text)),
        },
        other => Err(format!("'{}' must be an integer, got {}", key, other)),
    };

    parsed
        .map(Some)
        .map_err(|message| QueryError::invalid_operand(ParamKind::Pagination, &path, message))
}

fn with_count(map: &Map<String, Value>) -> Result<bool> {
    match map.get("withCount") {
        None => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(Value::String(text)) if text == "true" => Ok(true),
        Some(Value::String(text)) if text == "false" => Ok(false),
        Some(other) => Err(QueryError::invalid_operand(
            ParamKind::Pagination,
            &AttributePath::from_segments(["withCount"]),
            format!("'withCount' must be a boolean, got {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaginationWindow;
    use serde_json::json;

    fn resolve(raw: Value) -> Result<Pagination> {
        PaginationResolver::resolve(&raw, &PaginationLimits::default())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(resolve(Value::Null).unwrap(), Pagination::page(1, 25));
        assert_eq!(resolve(json!({})).unwrap(), Pagination::page(1, 25));
        assert_eq!(resolve(json!({ "start": 10 })).unwrap(), Pagination::offset(10, 25));
    }

    #[test]
    fn test_mixed_notations_conflict() {
        let err = resolve(json!({ "page": 1, "pageSize": 10, "start": 0, "limit": 5 })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConflictingPaginationNotation);
        assert_eq!(err.parameter, ParamKind::Pagination);
    }

    #[test]
    fn test_default_only_family_yields_to_the_other() {
        assert_eq!(
            resolve(json!({ "page": 1, "start": 20, "limit": 5 })).unwrap(),
            Pagination::offset(20, 5)
        );
        assert_eq!(
            resolve(json!({ "page": 3, "pageSize": 10, "start": 0 })).unwrap(),
            Pagination::page(3, 10)
        );
        assert_eq!(resolve(json!({ "page": 1, "start": 0 })).unwrap(), Pagination::page(1, 25));
    }

    #[test]
    fn test_clamping() {
        assert_eq!(resolve(json!({ "pageSize": 1000 })).unwrap(), Pagination::page(1, 100));
        assert_eq!(resolve(json!({ "page": 0, "pageSize": 0 })).unwrap(), Pagination::page(1, 1));
        assert_eq!(resolve(json!({ "limit": 0 })).unwrap(), Pagination::offset(0, 1));
    }

    #[test]
    fn test_invalid_values() {
        let err = resolve(json!({ "pageSize": -5 })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperand);
        assert_eq!(err.path, "pageSize");

        let err = resolve(json!({ "start": "-1" })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperand);

        let err = resolve(json!({ "page": 1.5 })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperand);

        let err = resolve(json!({ "offset": 3 })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidNotation);
    }

    #[test]
    fn test_string_values_and_with_count() {
        let pagination = resolve(json!({ "page": "2", "pageSize": "10", "withCount": "true" })).unwrap();
        assert_eq!(pagination.window, PaginationWindow::Page { page: 2, page_size: 10 });
        assert!(pagination.with_count);
        assert_eq!(pagination.as_offset_limit(), (10, 10));
    }
}
