use crate::model::{ScalarDomain, SchemaId};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Canonical, schema-checked filter condition tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterTree {
    /// `$and` / `$or` / `$not` over ordered children
    Group {
        operator: LogicalOperator,
        children: Vec<FilterTree>,
    },
    /// Leaf comparison on a filterable scalar of the current schema
    Condition {
        attribute: String,
        operator: FilterOperator,
        operand: Operand,
    },
    /// Hop through a relation/component into its target schema
    Nested {
        attribute: String,
        target: SchemaId,
        condition: Box<FilterTree>,
    },
}

impl FilterTree {
    pub fn and(children: Vec<FilterTree>) -> Self {
        FilterTree::Group {
            operator: LogicalOperator::And,
            children,
        }
    }

    /// Empty conjunction; matches every entry
    pub fn always() -> Self {
        FilterTree::and(Vec::new())
    }

    /// Negated [`FilterTree::always`]; matches no entry
    pub fn never() -> Self {
        FilterTree::Group {
            operator: LogicalOperator::Not,
            children: vec![FilterTree::always()],
        }
    }

    pub fn condition(attribute: &str, operator: FilterOperator, operand: Operand) -> Self {
        FilterTree::Condition {
            attribute: attribute.to_string(),
            operator,
            operand,
        }
    }

    pub fn nested(attribute: &str, target: &str, condition: FilterTree) -> Self {
        FilterTree::Nested {
            attribute: attribute.to_string(),
            target: target.to_string(),
            condition: Box::new(condition),
        }
    }

    /// Collapses a single-child conjunction; `None` when there are no children
    pub fn conjunction(mut children: Vec<FilterTree>) -> Option<Self> {
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(FilterTree::and(children)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LogicalOperator {
    #[serde(rename = "$and")]
    And,
    #[serde(rename = "$or")]
    Or,
    #[serde(rename = "$not")]
    Not,
}

impl LogicalOperator {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$and" => Some(LogicalOperator::And),
            "$or" => Some(LogicalOperator::Or),
            "$not" => Some(LogicalOperator::Not),
            _ => None,
        }
    }
}

/// Operator family, which decides operand arity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorFamily {
    Equality,
    Ordering,
    Membership,
    Range,
    Pattern,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FilterOperator {
    #[serde(rename = "$eq")]
    Eq,
    #[serde(rename = "$eqi")]
    Eqi,
    #[serde(rename = "$ne")]
    Ne,
    #[serde(rename = "$nei")]
    Nei,
    #[serde(rename = "$gt")]
    Gt,
    #[serde(rename = "$gte")]
    Gte,
    #[serde(rename = "$lt")]
    Lt,
    #[serde(rename = "$lte")]
    Lte,
    #[serde(rename = "$in")]
    In,
    #[serde(rename = "$notIn")]
    NotIn,
    #[serde(rename = "$between")]
    Between,
    #[serde(rename = "$contains")]
    Contains,
    #[serde(rename = "$notContains")]
    NotContains,
    #[serde(rename = "$containsi")]
    Containsi,
    #[serde(rename = "$notContainsi")]
    NotContainsi,
    #[serde(rename = "$startsWith")]
    StartsWith,
    #[serde(rename = "$startsWithi")]
    StartsWithi,
    #[serde(rename = "$notStartsWith")]
    NotStartsWith,
    #[serde(rename = "$endsWith")]
    EndsWith,
    #[serde(rename = "$endsWithi")]
    EndsWithi,
    #[serde(rename = "$notEndsWith")]
    NotEndsWith,
    #[serde(rename = "$null")]
    Null,
    #[serde(rename = "$notNull")]
    NotNull,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 23] = [
        FilterOperator::Eq,
        FilterOperator::Eqi,
        FilterOperator::Ne,
        FilterOperator::Nei,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::In,
        FilterOperator::NotIn,
        FilterOperator::Between,
        FilterOperator::Contains,
        FilterOperator::NotContains,
        FilterOperator::Containsi,
        FilterOperator::NotContainsi,
        FilterOperator::StartsWith,
        FilterOperator::StartsWithi,
        FilterOperator::NotStartsWith,
        FilterOperator::EndsWith,
        FilterOperator::EndsWithi,
        FilterOperator::NotEndsWith,
        FilterOperator::Null,
        FilterOperator::NotNull,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "$eq",
            FilterOperator::Eqi => "$eqi",
            FilterOperator::Ne => "$ne",
            FilterOperator::Nei => "$nei",
            FilterOperator::Gt => "$gt",
            FilterOperator::Gte => "$gte",
            FilterOperator::Lt => "$lt",
            FilterOperator::Lte => "$lte",
            FilterOperator::In => "$in",
            FilterOperator::NotIn => "$notIn",
            FilterOperator::Between => "$between",
            FilterOperator::Contains => "$contains",
            FilterOperator::NotContains => "$notContains",
            FilterOperator::Containsi => "$containsi",
            FilterOperator::NotContainsi => "$notContainsi",
            FilterOperator::StartsWith => "$startsWith",
            FilterOperator::StartsWithi => "$startsWithi",
            FilterOperator::NotStartsWith => "$notStartsWith",
            FilterOperator::EndsWith => "$endsWith",
            FilterOperator::EndsWithi => "$endsWithi",
            FilterOperator::NotEndsWith => "$notEndsWith",
            FilterOperator::Null => "$null",
            FilterOperator::NotNull => "$notNull",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.as_str() == key)
    }

    pub fn family(&self) -> OperatorFamily {
        match self {
            FilterOperator::Eq | FilterOperator::Ne | FilterOperator::Eqi | FilterOperator::Nei => {
                OperatorFamily::Equality
            }
            FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte => {
                OperatorFamily::Ordering
            }
            FilterOperator::In | FilterOperator::NotIn => OperatorFamily::Membership,
            FilterOperator::Between => OperatorFamily::Range,
            FilterOperator::Null | FilterOperator::NotNull => OperatorFamily::Null,
            _ => OperatorFamily::Pattern,
        }
    }

    /// Whether this operator may be applied to attributes of `domain`
    pub fn accepts(&self, domain: ScalarDomain) -> bool {
        match self {
            FilterOperator::Eq | FilterOperator::Ne => true,
            FilterOperator::Eqi | FilterOperator::Nei => domain.is_text_like(),
            FilterOperator::In | FilterOperator::NotIn => domain != ScalarDomain::Json,
            FilterOperator::Null | FilterOperator::NotNull => true,
            _ => match self.family() {
                OperatorFamily::Ordering | OperatorFamily::Range => domain.is_ordered(),
                _ => domain.is_text_like(),
            },
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed operand bound to an attribute's value domain
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    Value(ScalarValue),
    List(Vec<ScalarValue>),
    Range(ScalarValue, ScalarValue),
    /// Operand of `$null` / `$notNull`
    Flag(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Number(serde_json::Number),
    Text(String),
    Boolean(bool),
    Temporal(TemporalValue),
    Json(serde_json::Value),
}

impl ScalarValue {
    pub fn text(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }

    pub fn integer(value: i64) -> Self {
        ScalarValue::Number(serde_json::Number::from(value))
    }

    /// Ordering between two values of the same ordered domain
    pub fn compare(&self, other: &ScalarValue) -> Option<Ordering> {
        match (self, other) {
            (ScalarValue::Number(a), ScalarValue::Number(b)) => {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            (ScalarValue::Temporal(a), ScalarValue::Temporal(b)) => a.compare(b),
            (ScalarValue::Text(a), ScalarValue::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TemporalValue {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl TemporalValue {
    fn compare(&self, other: &TemporalValue) -> Option<Ordering> {
        match (self, other) {
            (TemporalValue::DateTime(a), TemporalValue::DateTime(b)) => Some(a.cmp(b)),
            (TemporalValue::Date(a), TemporalValue::Date(b)) => Some(a.cmp(b)),
            (TemporalValue::Time(a), TemporalValue::Time(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}
