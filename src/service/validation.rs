//! Request validation from column types and catalog rules.

use crate::error::AppError;
use crate::model::{ColumnInfo, ColumnType, ResolvedEntity, ValidationRule};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a full body (POST/PUT): every required column must be present and non-null.
    pub fn validate(body: &HashMap<String, Value>, entity: &ResolvedEntity) -> Result<(), AppError> {
        let mut required: Vec<&String> = entity
            .validation
            .iter()
            .filter(|(_, rule)| rule.required == Some(true))
            .map(|(col, _)| col)
            .collect();
        required.sort();
        for col in required {
            match body.get(col) {
                None | Some(Value::Null) => return Err(AppError::Validation(format!("{} is required", col))),
                _ => {}
            }
        }
        Self::validate_partial(body, entity)
    }

    /// Validate only the fields present in body (PATCH). Required is not enforced for missing fields.
    pub fn validate_partial(body: &HashMap<String, Value>, entity: &ResolvedEntity) -> Result<(), AppError> {
        let mut keys: Vec<&String> = body.keys().collect();
        keys.sort();
        for col in keys {
            let Some(info) = entity.column(col) else { continue };
            let v = &body[col];
            if v.is_null() {
                if !info.nullable {
                    return Err(AppError::Validation(format!("{} cannot be null", col)));
                }
                continue;
            }
            validate_type(info, v)?;
            if let Some(rule) = entity.validation.get(col) {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }
}

fn validate_type(col: &ColumnInfo, v: &Value) -> Result<(), AppError> {
    let name = &col.name;
    let ok = match col.column_type {
        ColumnType::Serial | ColumnType::Integer => v.as_i64().map(|n| i32::try_from(n).is_ok()).unwrap_or(false),
        ColumnType::Double => v.is_number(),
        ColumnType::Boolean => v.is_boolean(),
        ColumnType::Text => v.is_string(),
        ColumnType::Date => v
            .as_str()
            .map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
            .unwrap_or(false),
        ColumnType::Time => v
            .as_str()
            .map(|s| {
                chrono::NaiveTime::parse_from_str(s, "%H:%M").is_ok()
                    || chrono::NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok()
            })
            .unwrap_or(false),
        ColumnType::Timestamptz => v
            .as_str()
            .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
            .unwrap_or(false),
    };
    if ok {
        return Ok(());
    }
    let expected = match col.column_type {
        ColumnType::Serial | ColumnType::Integer => "an integer",
        ColumnType::Double => "a number",
        ColumnType::Boolean => "a boolean",
        ColumnType::Text => "a string",
        ColumnType::Date => "a date (YYYY-MM-DD)",
        ColumnType::Time => "a time (HH:MM)",
        ColumnType::Timestamptz => "an RFC 3339 timestamp",
    };
    Err(AppError::Validation(format!("{} must be {}", name, expected)))
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(max) = rule.max_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
    }
    if let Some(min) = rule.min_length {
        if let Some(s) = v.as_str() {
            if s.trim().chars().count() < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
    }
    if let Some(ref pattern) = rule.pattern {
        let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", col)))?;
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", col)));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            let names: Vec<&str> = allowed.iter().filter_map(Value::as_str).collect();
            return Err(AppError::Validation(format!(
                "{} must be one of: {}",
                col,
                names.join(", ")
            )));
        }
    }
    if let Some(min) = rule.minimum {
        if let Some(n) = v.as_f64() {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    if format.eq_ignore_ascii_case("email") {
        if let Some(s) = v.as_str() {
            let valid = match s.split_once('@') {
                Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
                None => false,
            };
            if !valid {
                return Err(AppError::Validation(format!("{} must be a valid email", col)));
            }
        }
    }
    Ok(())
}
