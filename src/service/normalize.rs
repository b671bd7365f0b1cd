//! Coerce form-style request bodies into the shapes the columns expect.

use crate::model::{ColumnType, ResolvedEntity};
use serde_json::Value;
use std::collections::HashMap;

/// Keep only writable columns and coerce values by column type:
/// - dates keep the `YYYY-MM-DD` prefix of ISO datetimes
/// - times drop seconds (`HH:MM:SS` -> `HH:MM`)
/// - numeric and boolean strings become JSON numbers / booleans
/// - empty strings become null for non-text columns
pub fn normalize_body(entity: &ResolvedEntity, body: HashMap<String, Value>) -> HashMap<String, Value> {
    body.into_iter()
        .filter_map(|(k, v)| {
            let col = entity.column(&k).filter(|c| !c.read_only)?;
            let v = normalize_value(col.column_type, v);
            Some((k, v))
        })
        .collect()
}

fn normalize_value(ty: ColumnType, v: Value) -> Value {
    let Value::String(s) = v else { return v };
    let trimmed = s.trim();
    if trimmed.is_empty() && ty != ColumnType::Text {
        return Value::Null;
    }
    match ty {
        ColumnType::Date => {
            if trimmed.len() > 10 && matches!(trimmed.as_bytes()[10], b'T' | b' ') {
                Value::String(trimmed[..10].to_string())
            } else {
                Value::String(trimmed.to_string())
            }
        }
        ColumnType::Time => {
            if trimmed.len() > 5 && trimmed.as_bytes()[5] == b':' {
                Value::String(trimmed[..5].to_string())
            } else {
                Value::String(trimmed.to_string())
            }
        }
        ColumnType::Integer | ColumnType::Serial => match trimmed.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(s),
        },
        ColumnType::Double => match trimmed.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            Some(n) => Value::Number(n),
            None => Value::String(s),
        },
        ColumnType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(s),
        },
        ColumnType::Text | ColumnType::Timestamptz => Value::String(s),
    }
}
