use field_engine::SaveOperation;
use serde_json::{Number, Value, json};

use crate::error::StoreError;

/// Coerces a submitted value into the shape the store keeps for `operation`.
///
/// Strings and dates are stringified, integers truncated, list items
/// stringified and file names wrapped into `{metadata: {object_name}}`.
/// Tables are stored as submitted.
pub fn normalize(operation: SaveOperation, value: &Value) -> Result<Value, StoreError> {
    let invalid = || StoreError::InvalidValue {
        operation,
        value: value.to_string(),
    };
    match operation {
        SaveOperation::String | SaveOperation::Date => {
            stringify(value).map(Value::String).ok_or_else(invalid)
        }
        SaveOperation::Integer => parse_integer(value).map(Value::from).ok_or_else(invalid),
        SaveOperation::Float => parse_float(value)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        SaveOperation::List => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| stringify(item).map(Value::String))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array)
                .ok_or_else(invalid),
            _ => Err(invalid()),
        },
        SaveOperation::File => Ok(json!({ "metadata": { "object_name": value } })),
        SaveOperation::Table => Ok(value.clone()),
    }
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Array(items) => items
            .iter()
            .map(stringify)
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(",")),
        Value::Object(_) => None,
    }
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64)),
        Value::String(text) => {
            let text = text.trim_start();
            let digits_end = text
                .char_indices()
                .find(|(index, ch)| !(ch.is_ascii_digit() || (*index == 0 && matches!(ch, '+' | '-'))))
                .map_or(text.len(), |(index, _)| index);
            text[..digits_end].parse().ok()
        }
        _ => None,
    }
}

fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_coerced_per_operation() {
        assert_eq!(normalize(SaveOperation::String, &json!(15)).unwrap(), json!("15"));
        assert_eq!(normalize(SaveOperation::Integer, &json!("42abc")).unwrap(), json!(42));
        assert_eq!(normalize(SaveOperation::Integer, &json!(-3.9)).unwrap(), json!(-3));
        assert_eq!(normalize(SaveOperation::Float, &json!("1.25")).unwrap(), json!(1.25));
        assert_eq!(
            normalize(SaveOperation::Date, &json!("2024-02-29")).unwrap(),
            json!("2024-02-29")
        );
    }

    #[test]
    fn lists_and_files_are_reshaped() {
        assert_eq!(
            normalize(SaveOperation::List, &json!(["a", 2, true])).unwrap(),
            json!(["a", "2", "true"])
        );
        assert_eq!(
            normalize(SaveOperation::File, &json!("scan.pdf")).unwrap(),
            json!({ "metadata": { "object_name": "scan.pdf" } })
        );
        let rows = json!([{ "a": 1 }]);
        assert_eq!(normalize(SaveOperation::Table, &rows).unwrap(), rows);
    }

    #[test]
    fn unparseable_values_are_rejected() {
        assert!(matches!(
            normalize(SaveOperation::Integer, &json!("abc")),
            Err(StoreError::InvalidValue { .. })
        ));
        assert!(normalize(SaveOperation::Float, &json!({})).is_err());
        assert!(normalize(SaveOperation::List, &json!("single")).is_err());
        assert!(normalize(SaveOperation::String, &json!({ "a": 1 })).is_err());
    }
}
