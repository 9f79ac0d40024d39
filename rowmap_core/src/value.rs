//! Scalar values exchanged between entities and storage adapters.

use serde::{Deserialize, Serialize};

/// A backend-agnostic representation of a column value.
///
/// Entities convert their fields into `Value`s when persisted and back with
/// [`FromValue`] when hydrated. Adapters translate them into driver values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    I32(i32),
    I64(i64),
    F64(f64),
    Bool(bool),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F64(_) => "f64",
            Value::Bool(_) => "bool",
            Value::Null => "null",
        }
    }

    /// Integer view of the value, if it holds one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(i) => Some(i64::from(*i)),
            Value::I64(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::I32(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::I64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::F64(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Failure converting a [`Value`] into a field type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("integer {value} does not fit in {target}")]
    OutOfRange { value: i64, target: &'static str },
}

fn mismatch(expected: &'static str, found: &Value) -> ValueError {
    ValueError::Mismatch {
        expected,
        found: found.type_name(),
    }
}

/// Conversion from a storage value into a physical field type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::I64(i) => Ok(i),
            Value::I32(i) => Ok(i64::from(i)),
            Value::Bool(b) => Ok(i64::from(b)),
            other => Err(mismatch("i64", &other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::I32(i) => Ok(i),
            Value::I64(i) => i32::try_from(i).map_err(|_| ValueError::OutOfRange {
                value: i,
                target: "i32",
            }),
            Value::Bool(b) => Ok(i32::from(b)),
            other => Err(mismatch("i32", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::F64(f) => Ok(f),
            // SQLite hands back integral REAL values as integers.
            Value::I64(i) => Ok(i as f64),
            Value::I32(i) => Ok(f64::from(i)),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::I64(i) => Ok(i != 0),
            Value::I32(i) => Ok(i != 0),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some(3_i64)), Value::I64(3));
        assert_eq!(Option::<i64>::from_value(Value::Null), Ok(None));
    }

    #[test]
    fn integers_widen_and_narrow() {
        assert_eq!(i64::from_value(Value::I32(7)), Ok(7));
        assert_eq!(i32::from_value(Value::I64(7)), Ok(7));
        assert_eq!(
            i32::from_value(Value::I64(i64::MAX)),
            Err(ValueError::OutOfRange {
                value: i64::MAX,
                target: "i32"
            })
        );
    }

    #[test]
    fn sqlite_style_storage_classes_convert() {
        assert_eq!(f64::from_value(Value::I64(12)), Ok(12.0));
        assert_eq!(bool::from_value(Value::I64(0)), Ok(false));
        assert_eq!(bool::from_value(Value::I64(1)), Ok(true));
    }

    #[test]
    fn mismatch_reports_both_sides() {
        let err = String::from_value(Value::I64(1)).unwrap_err();
        assert_eq!(format!("{}", err), "expected string, found i64");
        let err = Option::<f64>::from_value(Value::String("x".into())).unwrap_err();
        assert_eq!(
            err,
            ValueError::Mismatch {
                expected: "f64",
                found: "string"
            }
        );
    }

    #[test]
    fn untagged_serialization_is_plain_json() {
        let json = serde_json::to_value(vec![
            Value::String("Chair".into()),
            Value::I64(3),
            Value::F64(9.5),
            Value::Bool(true),
            Value::Null,
        ])
        .unwrap();
        assert_eq!(json, serde_json::json!(["Chair", 3, 9.5, true, null]));
    }
}
