use serde_json::{Number, Value};

use crate::handler::ValueType;

/// Raw value found for a named binding before conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// One or more string values (query/form parameters, headers, path
    /// variables, cookies)
    Strings(Vec<String>),
    /// An already-structured value (session attributes)
    Json(Value),
}

impl RawValue {
    #[must_use]
    pub fn single(value: impl Into<String>) -> Self {
        RawValue::Strings(vec![value.into()])
    }

    /// A single empty string, the trigger for default substitution.
    #[must_use]
    pub fn is_empty_string(&self) -> bool {
        match self {
            RawValue::Strings(values) => values.len() == 1 && values[0].is_empty(),
            RawValue::Json(Value::String(s)) => s.is_empty(),
            RawValue::Json(_) => false,
        }
    }

    /// Short rendering for error messages.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            RawValue::Strings(values) => values.join(","),
            RawValue::Json(Value::String(s)) => s.clone(),
            RawValue::Json(other) => other.to_string(),
        }
    }
}

/// Convert a raw value to `target`. `Ok(Value::Null)` means "no value"
/// (an empty string for a non-string scalar).
pub fn convert(raw: &RawValue, target: &ValueType) -> Result<Value, String> {
    match raw {
        RawValue::Strings(values) => convert_strings(values, target),
        RawValue::Json(value) => convert_json(value, target),
    }
}

/// Structured values must already fit scalar and list targets; strings
/// take the string conversion path.
fn convert_json(value: &Value, target: &ValueType) -> Result<Value, String> {
    match (target.nested(), value) {
        (_, Value::Null) => Ok(Value::Null),
        (scalar, Value::String(s)) if target.is_simple() => {
            convert_strings(std::slice::from_ref(s), scalar)
        }
        (ValueType::String, Value::Number(_) | Value::Bool(_)) => Ok(Value::String(value.to_string())),
        (ValueType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        (ValueType::Float, Value::Number(_)) | (ValueType::Boolean, Value::Bool(_)) => Ok(value.clone()),
        (ValueType::List(inner), Value::Array(items)) => items
            .iter()
            .map(|item| convert_json(item, inner))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (ValueType::List(inner), single) => convert_json(single, inner).map(|item| Value::Array(vec![item])),
        (ValueType::Map, Value::Object(_)) => Ok(value.clone()),
        (ValueType::String | ValueType::Integer | ValueType::Float | ValueType::Boolean | ValueType::Map, other) => {
            Err(format!("cannot convert {} to {}", json_kind(other), target.nested()))
        }
        _ => Ok(value.clone()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn convert_strings(values: &[String], target: &ValueType) -> Result<Value, String> {
    match target.nested() {
        ValueType::List(inner) => {
            let items: Vec<&str> = match values {
                [single] if single.is_empty() => Vec::new(),
                [single] => single.split(',').map(str::trim).collect(),
                many => many.iter().map(String::as_str).collect(),
            };
            items
                .into_iter()
                .map(|item| convert_scalar(item, inner))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        ValueType::Map => Err("a single value cannot be converted to a map".to_string()),
        scalar => match values.first() {
            Some(first) => convert_scalar(first, scalar),
            None => Ok(Value::Null),
        },
    }
}

fn convert_scalar(raw: &str, target: &ValueType) -> Result<Value, String> {
    if raw.is_empty() && *target.nested() != ValueType::String {
        return Ok(Value::Null);
    }
    match target.nested() {
        ValueType::String => Ok(Value::String(raw.to_string())),
        ValueType::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| e.to_string()),
        ValueType::Float => {
            let parsed = raw.trim().parse::<f64>().map_err(|e| e.to_string())?;
            Number::from_f64(parsed)
                .map(Value::Number)
                .ok_or_else(|| "not a finite number".to_string())
        }
        ValueType::Boolean => parse_bool(raw.trim())
            .map(Value::Bool)
            .ok_or_else(|| "invalid boolean value".to_string()),
        ValueType::Json => Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))),
        other => Err(format!("cannot convert a string to {other}")),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(convert(&RawValue::single("42"), &ValueType::Integer), Ok(json!(42)));
        assert_eq!(convert(&RawValue::single("2.5"), &ValueType::Float), Ok(json!(2.5)));
        assert_eq!(convert(&RawValue::single("yes"), &ValueType::Boolean), Ok(json!(true)));
        assert_eq!(convert(&RawValue::single("OFF"), &ValueType::Boolean), Ok(json!(false)));
        assert!(convert(&RawValue::single("abc"), &ValueType::Integer).is_err());
        assert!(convert(&RawValue::single("maybe"), &ValueType::Boolean).is_err());
    }

    #[test]
    fn test_empty_string_is_null_for_non_strings() {
        assert_eq!(convert(&RawValue::single(""), &ValueType::Integer), Ok(Value::Null));
        assert_eq!(convert(&RawValue::single(""), &ValueType::String), Ok(json!("")));
    }

    #[test]
    fn test_lists() {
        let ints = ValueType::list(ValueType::Integer);
        assert_eq!(convert(&RawValue::single("1, 2,3"), &ints), Ok(json!([1, 2, 3])));
        assert_eq!(
            convert(&RawValue::Strings(vec!["4".into(), "5".into()]), &ints),
            Ok(json!([4, 5]))
        );
        assert_eq!(convert(&RawValue::single(""), &ints), Ok(json!([])));
    }

    #[test]
    fn test_json_passthrough() {
        let raw = RawValue::Json(json!({"theme": "dark"}));
        assert_eq!(convert(&raw, &ValueType::Json), Ok(json!({"theme": "dark"})));
        assert_eq!(convert(&RawValue::Json(json!("7")), &ValueType::Integer), Ok(json!(7)));
    }

    #[test]
    fn test_structured_values_must_fit_scalar_targets() {
        let json = |v: Value| RawValue::Json(v);
        assert_eq!(convert(&json(json!(7)), &ValueType::Integer), Ok(json!(7)));
        assert_eq!(convert(&json(json!(true)), &ValueType::Boolean), Ok(json!(true)));
        assert_eq!(convert(&json(json!(1.5)), &ValueType::Float), Ok(json!(1.5)));
        assert_eq!(convert(&json(json!(7)), &ValueType::String), Ok(json!("7")));
        assert_eq!(
            convert(&json(json!({"a": 1})), &ValueType::optional(ValueType::Integer)),
            Err("cannot convert an object to Integer".to_string())
        );
        assert!(convert(&json(json!([1, 2])), &ValueType::Boolean).is_err());
        assert!(convert(&json(json!(1.5)), &ValueType::Integer).is_err());
        assert!(convert(&json(json!("x")), &ValueType::Integer).is_err());
        assert!(convert(&json(json!([1])), &ValueType::Map).is_err());

        let ints = ValueType::list(ValueType::Integer);
        assert_eq!(convert(&json(json!([1, "2"])), &ints), Ok(json!([1, 2])));
        assert_eq!(convert(&json(json!(3)), &ints), Ok(json!([3])));
        assert!(convert(&json(json!([1, {"b": 2}])), &ints).is_err());
        assert_eq!(convert(&json(Value::Null), &ValueType::Integer), Ok(Value::Null));
    }
}
