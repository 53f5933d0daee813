use crate::model::{AttributePath, ParamKind, SchemaId};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

/// Kind of validation failure raised while resolving request parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    UnknownAttribute,
    InvalidNotation,
    InvalidFilterOperator,
    InvalidOperand,
    InvalidFragmentTarget,
    PopulateDepthExceeded,
    DuplicateSortKey,
    ConflictingPaginationNotation,
    ConflictingRelationMutation,
    InvalidPositionArgument,
    SchemaNotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownAttribute => "UnknownAttribute",
            ErrorKind::InvalidNotation => "InvalidNotation",
            ErrorKind::InvalidFilterOperator => "InvalidFilterOperator",
            ErrorKind::InvalidOperand => "InvalidOperand",
            ErrorKind::InvalidFragmentTarget => "InvalidFragmentTarget",
            ErrorKind::PopulateDepthExceeded => "PopulateDepthExceeded",
            ErrorKind::DuplicateSortKey => "DuplicateSortKey",
            ErrorKind::ConflictingPaginationNotation => "ConflictingPaginationNotation",
            ErrorKind::ConflictingRelationMutation => "ConflictingRelationMutation",
            ErrorKind::InvalidPositionArgument => "InvalidPositionArgument",
            ErrorKind::SchemaNotFound => "SchemaNotFound",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured resolution error surfaced to the HTTP error-translation layer.
///
/// Resolution is fail-fast: the first violation aborts the whole request, so a
/// caller only ever sees one of these per call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind} in {parameter} at '{path}': {message}")]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
    pub kind: ErrorKind,
    #[serde(rename = "parameterName")]
    pub parameter: ParamKind,
    #[serde(rename = "attributePath")]
    pub path: String,
    pub message: String,
}

impl QueryError {
    pub fn new(
        kind: ErrorKind,
        parameter: ParamKind,
        path: &AttributePath,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            parameter,
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub fn unknown_attribute(
        parameter: ParamKind,
        path: &AttributePath,
        schema_id: &str,
    ) -> Self {
        let name = path.last().unwrap_or_default();
        Self::new(
            ErrorKind::UnknownAttribute,
            parameter,
            path,
            format!("attribute '{}' does not exist on '{}'", name, schema_id),
        )
    }

    pub fn invalid_notation(
        parameter: ParamKind,
        path: &AttributePath,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::InvalidNotation, parameter, path, message)
    }

    pub fn invalid_operand(
        parameter: ParamKind,
        path: &AttributePath,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::InvalidOperand, parameter, path, message)
    }

    pub fn depth_exceeded(parameter: ParamKind, path: &AttributePath, max: usize) -> Self {
        Self::new(
            ErrorKind::PopulateDepthExceeded,
            parameter,
            path,
            format!("nesting exceeds the maximum depth of {}", max),
        )
    }

    pub fn schema_not_found(parameter: ParamKind, path: &AttributePath, id: &str) -> Self {
        Self::new(
            ErrorKind::SchemaNotFound,
            parameter,
            path,
            format!("schema '{}' is not registered", id),
        )
    }
}

/// Errors raised while building or loading a schema registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("schema '{0}' is registered twice")]
    DuplicateSchema(SchemaId),

    #[error("attribute '{attribute}' is declared twice on '{schema}'")]
    DuplicateAttribute { schema: SchemaId, attribute: String },

    #[error("attribute '{attribute}' on '{schema}' is invalid: {reason}")]
    InvalidAttribute {
        schema: SchemaId,
        attribute: String,
        reason: String,
    },

    #[error("attribute '{attribute}' on '{schema}' targets unregistered schema '{target}'")]
    UnknownTarget {
        schema: SchemaId,
        attribute: String,
        target: SchemaId,
    },

    #[error("failed to parse registry: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read registry: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_with_http_field_names() {
        let path = AttributePath::root().child("author").child("name");
        let err = QueryError::new(
            ErrorKind::InvalidFilterOperator,
            ParamKind::Filters,
            &path,
            "operator '$gt' is not valid for text attributes",
        );

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "InvalidFilterOperator");
        assert_eq!(json["parameterName"], "filters");
        assert_eq!(json["attributePath"], "author.name");
        assert!(err.to_string().starts_with("InvalidFilterOperator in filters at 'author.name'"));
    }
}
