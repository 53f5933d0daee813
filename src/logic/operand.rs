use crate::model::{
    Attribute, FilterOperator, Operand, OperatorFamily, ScalarDomain, ScalarValue, TemporalValue,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// Binds raw JSON operands to an attribute's value domain.
///
/// Errors are plain messages; the filter resolver wraps them into
/// `InvalidOperand` with the attribute path it is working on.
pub struct OperandCoercer;

impl OperandCoercer {
    pub fn coerce(
        operator: FilterOperator,
        domain: ScalarDomain,
        attribute: Option<&Attribute>,
        raw: &Value,
    ) -> Result<Operand, String> {
        match operator.family() {
            OperatorFamily::Null => Self::flag(raw).map(Operand::Flag),
            OperatorFamily::Membership => {
                let Value::Array(items) = raw else {
                    return Err(format!("{} expects an array of values", operator));
                };
                items
                    .iter()
                    .map(|item| Self::scalar(domain, attribute, item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Operand::List)
            }
            OperatorFamily::Range => {
                let bounds = match raw {
                    Value::Array(items) if items.len() == 2 => items,
                    _ => return Err(format!("{} expects exactly two bounds", operator)),
                };
                let low = Self::scalar(domain, attribute, &bounds[0])?;
                let high = Self::scalar(domain, attribute, &bounds[1])?;
                match low.compare(&high) {
                    Some(Ordering::Greater) => {
                        Err(format!("{} lower bound is greater than its upper bound", operator))
                    }
                    Some(_) => Ok(Operand::Range(low, high)),
                    None => Err(format!("{} bounds are not comparable", operator)),
                }
            }
            OperatorFamily::Pattern => match raw {
                Value::String(text) => Ok(Operand::Value(ScalarValue::Text(text.clone()))),
                Value::Number(number) => Ok(Operand::Value(ScalarValue::Text(number.to_string()))),
                other => Err(format!("{} expects a string, got {}", operator, other)),
            },
            OperatorFamily::Equality | OperatorFamily::Ordering => {
                Self::scalar(domain, attribute, raw).map(Operand::Value)
            }
        }
    }

    /// Coerce one value into `domain`, accepting the loose encodings query strings produce
    pub fn scalar(
        domain: ScalarDomain,
        attribute: Option<&Attribute>,
        raw: &Value,
    ) -> Result<ScalarValue, String> {
        if raw.is_null() {
            return Err("null is not a valid operand; use $null instead".to_string());
        }

        match domain {
            ScalarDomain::Numeric => Self::number(raw).map(ScalarValue::Number),
            ScalarDomain::Text | ScalarDomain::Uid => match raw {
                Value::String(text) => Ok(ScalarValue::Text(text.clone())),
                Value::Number(number) => Ok(ScalarValue::Text(number.to_string())),
                other => Err(format!("expected a {} value, got {}", domain.as_str(), other)),
            },
            ScalarDomain::Enumeration => {
                let value = match raw {
                    Value::String(text) => text.clone(),
                    other => return Err(format!("expected an enumeration value, got {}", other)),
                };
                let allowed = attribute.and_then(|attr| attr.enum_values.as_ref());
                match allowed {
                    Some(values) if !values.contains(&value) => Err(format!(
                        "'{}' is not one of [{}]",
                        value,
                        values.join(", ")
                    )),
                    _ => Ok(ScalarValue::Text(value)),
                }
            }
            ScalarDomain::Boolean => Self::flag(raw).map(ScalarValue::Boolean),
            ScalarDomain::Temporal => Self::temporal(raw).map(ScalarValue::Temporal),
            ScalarDomain::Json => Ok(ScalarValue::Json(raw.clone())),
        }
    }

    fn number(raw: &Value) -> Result<serde_json::Number, String> {
        match raw {
            Value::Number(number) => Ok(number.clone()),
            Value::String(text) => {
                let text = text.trim();
                if let Ok(integer) = text.parse::<i64>() {
                    return Ok(serde_json::Number::from(integer));
                }
                text.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .ok_or_else(|| format!("'{}' is not a number", text))
            }
            other => Err(format!("expected a number, got {}", other)),
        }
    }

    fn flag(raw: &Value) -> Result<bool, String> {
        match raw {
            Value::Bool(flag) => Ok(*flag),
            Value::Number(number) => match number.as_i64() {
                Some(1) => Ok(true),
                Some(0) => Ok(false),
                _ => Err(format!("'{}' is not a boolean", number)),
            },
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(true),
                "false" | "f" | "0" => Ok(false),
                _ => Err(format!("'{}' is not a boolean", text)),
            },
            other => Err(format!("expected a boolean, got {}", other)),
        }
    }

    fn temporal(raw: &Value) -> Result<TemporalValue, String> {
        match raw {
            Value::String(text) => parse_temporal(text.trim())
                .ok_or_else(|| format!("'{}' is not a date, time or datetime", text)),
            Value::Number(number) => {
                let millis = number
                    .as_i64()
                    .ok_or_else(|| format!("'{}' is not a millisecond timestamp", number))?;
                let nanos = (millis.rem_euclid(1000) * 1_000_000) as u32;
                DateTime::from_timestamp(millis.div_euclid(1000), nanos)
                    .map(TemporalValue::DateTime)
                    .ok_or_else(|| format!("timestamp {} is out of range", millis))
            }
            other => Err(format!("expected a temporal value, got {}", other)),
        }
    }
}

fn parse_temporal(text: &str) -> Option<TemporalValue> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(TemporalValue::DateTime(datetime.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(TemporalValue::DateTime(Utc.from_utc_datetime(&naive)));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(TemporalValue::Date(date));
    }
    for format in ["%H:%M:%S%.f", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(text, format) {
            return Some(TemporalValue::Time(time));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_accepts_numeric_strings() {
        let value = OperandCoercer::scalar(ScalarDomain::Numeric, None, &json!("42")).unwrap();
        assert_eq!(value, ScalarValue::integer(42));

        let value = OperandCoercer::scalar(ScalarDomain::Numeric, None, &json!("2.5")).unwrap();
        assert!(matches!(value, ScalarValue::Number(n) if n.as_f64() == Some(2.5)));

        assert!(OperandCoercer::scalar(ScalarDomain::Numeric, None, &json!("many")).is_err());
    }

    #[test]
    fn test_booleans_accept_query_string_forms() {
        for (raw, expected) in [(json!("true"), true), (json!("0"), false), (json!(1), true), (json!(false), false)] {
            assert_eq!(
                OperandCoercer::scalar(ScalarDomain::Boolean, None, &raw).unwrap(),
                ScalarValue::Boolean(expected)
            );
        }
        assert!(OperandCoercer::scalar(ScalarDomain::Boolean, None, &json!("yes")).is_err());
    }

    #[test]
    fn test_temporal_forms() {
        let parse = |raw: Value| OperandCoercer::scalar(ScalarDomain::Temporal, None, &raw).unwrap();

        assert!(matches!(
            parse(json!("2024-03-01T10:00:00Z")),
            ScalarValue::Temporal(TemporalValue::DateTime(_))
        ));
        assert!(matches!(
            parse(json!("2024-03-01 10:00:00")),
            ScalarValue::Temporal(TemporalValue::DateTime(_))
        ));
        assert!(matches!(
            parse(json!("2024-03-01")),
            ScalarValue::Temporal(TemporalValue::Date(_))
        ));
        assert!(matches!(parse(json!("10:30")), ScalarValue::Temporal(TemporalValue::Time(_))));
        assert_eq!(
            parse(json!(0)),
            ScalarValue::Temporal(TemporalValue::DateTime(DateTime::from_timestamp(0, 0).unwrap()))
        );
        assert!(OperandCoercer::scalar(ScalarDomain::Temporal, None, &json!("yesterday")).is_err());
    }

    #[test]
    fn test_enumeration_checks_declared_values() {
        let category = Attribute::enumeration("category", &["news", "tutorial"]);
        assert!(OperandCoercer::scalar(ScalarDomain::Enumeration, Some(&category), &json!("news")).is_ok());
        let err = OperandCoercer::scalar(ScalarDomain::Enumeration, Some(&category), &json!("gossip"))
            .unwrap_err();
        assert!(err.contains("gossip"));
    }

    #[test]
    fn test_between_requires_ordered_bounds() {
        let range = OperandCoercer::coerce(
            FilterOperator::Between,
            ScalarDomain::Numeric,
            None,
            &json!([1, "10"]),
        )
        .unwrap();
        assert_eq!(range, Operand::Range(ScalarValue::integer(1), ScalarValue::integer(10)));

        assert!(OperandCoercer::coerce(FilterOperator::Between, ScalarDomain::Numeric, None, &json!([10, 1])).is_err());
        assert!(OperandCoercer::coerce(FilterOperator::Between, ScalarDomain::Numeric, None, &json!([1])).is_err());
        assert!(OperandCoercer::coerce(
            FilterOperator::Between,
            ScalarDomain::Temporal,
            None,
            &json!(["2024-01-01", "10:00"])
        )
        .is_err());
    }

    #[test]
    fn test_membership_and_null_families() {
        assert_eq!(
            OperandCoercer::coerce(FilterOperator::In, ScalarDomain::Text, None, &json!(["a", "b"])).unwrap(),
            Operand::List(vec![ScalarValue::text("a"), ScalarValue::text("b")])
        );
        assert!(OperandCoercer::coerce(FilterOperator::In, ScalarDomain::Text, None, &json!("a")).is_err());
        assert_eq!(
            OperandCoercer::coerce(FilterOperator::Null, ScalarDomain::Text, None, &json!("true")).unwrap(),
            Operand::Flag(true)
        );
        assert!(OperandCoercer::coerce(FilterOperator::Eq, ScalarDomain::Text, None, &Value::Null).is_err());
    }
}
