//! Field readers for PATCH bodies, where an omitted key, an explicit `null`
//! and a value all mean different things.

use serde_json::Value;

pub enum NullableValue<T> {
    Omitted,
    Null,
    Value(T),
}

impl<T> NullableValue<T> {
    /// `None` leaves the column untouched, `Some(None)` clears it.
    pub fn into_change(self) -> Option<Option<T>> {
        match self {
            NullableValue::Omitted => None,
            NullableValue::Null => Some(None),
            NullableValue::Value(value) => Some(Some(value)),
        }
    }
}

pub fn classify_nullable(optional_value: Option<&Value>) -> Result<NullableValue<String>, String> {
    match optional_value {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(NullableValue::Null)
            } else {
                Ok(NullableValue::Value(trimmed.to_owned()))
            }
        }
        Some(other) => Err(format!("expected string or null, got {other}")),
    }
}

pub fn classify_nullable_int(
    optional_value: Option<&Value>,
) -> Result<NullableValue<i32>, String> {
    match optional_value {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(NullableValue::Value)
            .ok_or_else(|| format!("expected integer, got {n}")),
        Some(other) => Err(format!("expected integer or null, got {other}")),
    }
}

/// A required-if-present string: `null` and blank strings are rejected.
pub fn optional_string(body: &Value, key: &str) -> Result<Option<String>, String> {
    match classify_nullable(body.get(key))? {
        NullableValue::Omitted => Ok(None),
        NullableValue::Null => Err(format!("{key} cannot be empty")),
        NullableValue::Value(value) => Ok(Some(value)),
    }
}

pub fn optional_int(body: &Value, key: &str) -> Result<Option<i32>, String> {
    match classify_nullable_int(body.get(key))? {
        NullableValue::Omitted => Ok(None),
        NullableValue::Null => Err(format!("{key} cannot be null")),
        NullableValue::Value(value) => Ok(Some(value)),
    }
}

pub fn optional_bool(body: &Value, key: &str) -> Result<Option<bool>, String> {
    match body.get(key) {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(other) => Err(format!("{key}: expected boolean, got {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn omitted_null_and_value_are_distinct_changes() {
        let body = json!({ "program": null, "description": "Intro course" });
        assert_eq!(
            classify_nullable(body.get("program")).unwrap().into_change(),
            Some(None)
        );
        assert_eq!(
            classify_nullable(body.get("description"))
                .unwrap()
                .into_change(),
            Some(Some("Intro course".to_string()))
        );
        assert_eq!(classify_nullable(body.get("credits")).unwrap().into_change(), None);
    }

    #[test]
    fn required_strings_reject_null_and_blank() {
        let body = json!({ "name": "  ", "code": null, "faculty": "FICT" });
        assert!(optional_string(&body, "name").is_err());
        assert!(optional_string(&body, "code").is_err());
        assert_eq!(optional_string(&body, "faculty").unwrap().as_deref(), Some("FICT"));
        assert_eq!(optional_string(&body, "missing").unwrap(), None);
    }

    #[test]
    fn integers_must_fit_and_be_whole() {
        let body = json!({ "credits": 12, "total": 3.5, "big": 9_000_000_000i64 });
        assert_eq!(optional_int(&body, "credits").unwrap(), Some(12));
        assert!(optional_int(&body, "total").is_err());
        assert!(optional_int(&body, "big").is_err());
    }

    #[test]
    fn flags_must_be_booleans() {
        let body = json!({ "is_active": false, "other": "yes" });
        assert_eq!(optional_bool(&body, "is_active").unwrap(), Some(false));
        assert!(optional_bool(&body, "other").is_err());
    }
}
