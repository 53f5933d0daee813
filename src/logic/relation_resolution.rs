use crate::error::{ErrorKind, QueryError, Result};
use crate::model::{
    Attribute, AttributePath, ParamKind, PositionedTarget, RelationMutationPlan, RelationOperation,
    RelationOperationKind, RelationPosition, RelationTarget,
};
use serde_json::{Map, Value};

const OPERATION_KEYS: [&str; 3] = ["connect", "disconnect", "set"];

/// Normalizes relation write payloads into ordered connect/disconnect/set operations
pub struct RelationMutationResolver;

impl RelationMutationResolver {
    pub fn resolve(raw: &Value, attribute: &Attribute) -> Result<RelationMutationPlan> {
        let path = AttributePath::from_segments([attribute.name.as_str()]);
        if !attribute.is_relational() {
            return Err(QueryError::invalid_notation(
                ParamKind::Relation,
                &path,
                format!("'{}' is not a relation", attribute.name),
            ));
        }

        let operations = match raw {
            Value::Object(map) if !is_target_object(map) => Self::incremental(map, attribute, &path)?,
            _ => {
                let targets = Self::targets(raw, RelationOperationKind::Set, attribute, &path)?;
                vec![RelationOperation {
                    kind: RelationOperationKind::Set,
                    targets,
                }]
            }
        };

        Ok(RelationMutationPlan {
            attribute: attribute.name.clone(),
            operations,
        })
    }

    fn incremental(
        map: &Map<String, Value>,
        attribute: &Attribute,
        path: &AttributePath,
    ) -> Result<Vec<RelationOperation>> {
        if let Some(key) = map.keys().find(|key| !OPERATION_KEYS.contains(&key.as_str())) {
            return Err(QueryError::invalid_notation(
                ParamKind::Relation,
                path,
                format!("unknown relation operation '{}'", key),
            ));
        }

        let set = map.get("set");
        let connect = map.get("connect");
        let disconnect = map.get("disconnect");
        if set.is_some() && (connect.is_some() || disconnect.is_some()) {
            return Err(QueryError::new(
                ErrorKind::ConflictingRelationMutation,
                ParamKind::Relation,
                path,
                "'set' replaces the relation and cannot be combined with 'connect' or 'disconnect'",
            ));
        }

        let mut operations = Vec::new();
        if let Some(raw) = set {
            operations.push(RelationOperation {
                kind: RelationOperationKind::Set,
                targets: Self::targets(raw, RelationOperationKind::Set, attribute, path)?,
            });
        }
        if let Some(raw) = disconnect {
            operations.push(RelationOperation {
                kind: RelationOperationKind::Disconnect,
                targets: Self::targets(raw, RelationOperationKind::Disconnect, attribute, path)?,
            });
        }
        if let Some(raw) = connect {
            operations.push(RelationOperation {
                kind: RelationOperationKind::Connect,
                targets: Self::targets(raw, RelationOperationKind::Connect, attribute, path)?,
            });
        }
        Ok(operations)
    }

    fn targets(
        raw: &Value,
        kind: RelationOperationKind,
        attribute: &Attribute,
        path: &AttributePath,
    ) -> Result<Vec<PositionedTarget>> {
        let items: Vec<&Value> = match raw {
            Value::Null => Vec::new(),
            Value::Array(items) => items.iter().collect(),
            single => vec![single],
        };

        let mut targets: Vec<PositionedTarget> = Vec::new();
        for item in items {
            let target = parse_item(item, kind, attribute, path)?;
            // Repeated targets keep their last occurrence
            targets.retain(|existing| existing.target != target.target);
            targets.push(target);
        }

        if !attribute.is_many && kind != RelationOperationKind::Disconnect && targets.len() > 1 {
            return Err(QueryError::invalid_operand(
                ParamKind::Relation,
                path,
                format!(
                    "'{}' holds a single entry but {} received {} targets",
                    attribute.name,
                    kind.as_str(),
                    targets.len()
                ),
            ));
        }
        Ok(targets)
    }
}

fn is_target_object(map: &Map<String, Value>) -> bool {
    (map.contains_key("id") || map.contains_key("documentId"))
        && !OPERATION_KEYS.iter().any(|key| map.contains_key(*key))
}

fn parse_item(
    item: &Value,
    kind: RelationOperationKind,
    attribute: &Attribute,
    path: &AttributePath,
) -> Result<PositionedTarget> {
    let Value::Object(map) = item else {
        return parse_target(item, path).map(PositionedTarget::unplaced);
    };

    let position = match map.get("position") {
        None => None,
        Some(_) if kind != RelationOperationKind::Connect => {
            return Err(QueryError::new(
                ErrorKind::InvalidPositionArgument,
                ParamKind::Relation,
                path,
                format!("'position' is only accepted on connect, not {}", kind.as_str()),
            ))
        }
        Some(_) if !attribute.is_many => {
            return Err(QueryError::new(
                ErrorKind::InvalidPositionArgument,
                ParamKind::Relation,
                path,
                format!("'{}' is not ordered; 'position' needs a to-many relation", attribute.name),
            ))
        }
        Some(raw) => Some(parse_position(raw, path)?),
    };

    Ok(PositionedTarget {
        target: parse_target(item, path)?,
        position,
    })
}

fn parse_target(raw: &Value, path: &AttributePath) -> Result<RelationTarget> {
    match raw {
        Value::Number(number) => number.as_i64().map(RelationTarget::id).ok_or_else(|| {
            QueryError::invalid_operand(
                ParamKind::Relation,
                path,
                format!("relation id must be an integer, got {}", number),
            )
        }),
        Value::String(document_id) if !document_id.trim().is_empty() => {
            Ok(RelationTarget::document(document_id.trim()))
        }
        Value::Object(map) => {
            if let Some(document_id) = map.get("documentId") {
                let RelationTarget::Document { document_id, .. } = parse_target(document_id, path)? else {
                    return Err(QueryError::invalid_operand(
                        ParamKind::Relation,
                        path,
                        "'documentId' must be a string",
                    ));
                };
                return Ok(RelationTarget::Document {
                    document_id,
                    locale: optional_string(map, "locale", path)?,
                    status: optional_string(map, "status", path)?,
                });
            }
            match map.get("id") {
                Some(id @ Value::Number(_)) => parse_target(id, path),
                _ => Err(QueryError::invalid_operand(
                    ParamKind::Relation,
                    path,
                    "relation targets need a numeric 'id' or a 'documentId'",
                )),
            }
        }
        other => Err(QueryError::invalid_operand(
            ParamKind::Relation,
            path,
            format!("invalid relation target {}", other),
        )),
    }
}

fn optional_string(map: &Map<String, Value>, key: &str, path: &AttributePath) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(QueryError::invalid_operand(
            ParamKind::Relation,
            path,
            format!("'{}' must be a string, got {}", key, other),
        )),
    }
}

fn parse_position(raw: &Value, path: &AttributePath) -> Result<RelationPosition> {
    let invalid = |message: &str| {
        QueryError::new(ErrorKind::InvalidPositionArgument, ParamKind::Relation, path, message)
    };

    let Value::Object(map) = raw else {
        return Err(invalid("'position' must be an object"));
    };
    if map.len() != 1 {
        return Err(invalid("'position' takes exactly one of before, after, start or end"));
    }

    match map.iter().next() {
        Some((key, value)) if key == "before" => parse_target(value, path)
            .map(RelationPosition::Before)
            .map_err(|_| invalid("'before' needs a relation target")),
        Some((key, value)) if key == "after" => parse_target(value, path)
            .map(RelationPosition::After)
            .map_err(|_| invalid("'after' needs a relation target")),
        Some((key, Value::Bool(true))) if key == "start" => Ok(RelationPosition::Start),
        Some((key, Value::Bool(true))) if key == "end" => Ok(RelationPosition::End),
        _ => Err(invalid("'position' takes exactly one of before, after, start: true or end: true")),
    }
}
