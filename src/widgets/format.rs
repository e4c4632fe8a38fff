//! Coercions from loosely typed row values.

use serde_json::Value;

use crate::backend::Row;

/// Reads a flag the way the database exposes it: booleans, `t`/`f`,
/// `yes`/`no`, `1`/`0` and numbers. Null is false.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" | "on" => true,
            "false" | "f" | "0" | "no" | "n" | "off" | "" => false,
            _ => true,
        },
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(fields)) => !fields.is_empty(),
    }
}

/// Numeric value of a column, 0.0 when missing or not numeric.
pub fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Column value or JSON null.
pub fn column(row: &Row, name: &str) -> Value {
    row.get(name).cloned().unwrap_or(Value::Null)
}

/// Renders a scalar or array cell for a text table.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| display_value(Some(item)))
            .collect::<Vec<_>>()
            .join(" / "),
        Some(other) => other.to_string(),
    }
}

/// Joins a symbols array, skipping null and empty entries.
pub fn join_symbols(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| display_value(Some(item)))
            .filter(|symbol| !symbol.is_empty())
            .collect::<Vec<_>>()
            .join(" / "),
        _ => String::new(),
    }
}
