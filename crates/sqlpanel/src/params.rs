//! Recorded statement parameters.
//!
//! Engines take parameters as [`ParamValue`]s so the interceptor can keep an owned
//! copy of exactly what was bound. The same values are re-bound when a recorded
//! statement is replayed, and serialized (best effort) for display.

use bytes::BytesMut;
use serde::ser::{Error as _, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use url::form_urlencoded;

/// A single statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// SQL NULL
    Null,
    /// Boolean
    Bool(bool),
    /// Integer (narrowed to the column width on bind)
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// JSON document
    Json(serde_json::Value),
    /// Engine-specific value that can be displayed but neither serialized nor re-bound.
    Opaque {
        /// Name of the source type.
        type_name: String,
        /// Debug representation captured at record time.
        repr: String,
    },
}

impl ParamValue {
    /// Capture a value the panel has no structured representation for.
    pub fn opaque<T: fmt::Debug + ?Sized>(value: &T) -> Self {
        Self::Opaque {
            type_name: std::any::type_name::<T>().to_string(),
            repr: format!("{value:?}"),
        }
    }

    /// Whether the value can be bound again for replay.
    pub fn is_bindable(&self) -> bool {
        !matches!(self, Self::Opaque { .. })
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Null => serializer.serialize_unit(),
            ParamValue::Bool(v) => serializer.serialize_bool(*v),
            ParamValue::Int(v) => serializer.serialize_i64(*v),
            ParamValue::Float(v) => serializer.serialize_f64(*v),
            ParamValue::Text(v) => serializer.serialize_str(v),
            ParamValue::Bytes(v) => match std::str::from_utf8(v) {
                Ok(s) => serializer.serialize_str(s),
                Err(e) => Err(S::Error::custom(format!("bytes are not valid UTF-8: {e}"))),
            },
            ParamValue::Json(v) => v.serialize(serializer),
            ParamValue::Opaque { type_name, .. } => Err(S::Error::custom(format!(
                "{type_name} is not serializable"
            ))),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => write!(f, "NULL"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => write!(f, "'{v}'"),
            ParamValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            ParamValue::Json(v) => write!(f, "{v}"),
            ParamValue::Opaque { repr, .. } => write!(f, "{repr}"),
        }
    }
}

/// Serialize parameters to JSON and form-encode the result for use in URLs.
///
/// Any serialization failure yields an empty string.
pub fn encode_params(params: &[ParamValue]) -> String {
    match serde_json::to_string(params) {
        Ok(json) => form_urlencoded::byte_serialize(json.as_bytes()).collect(),
        Err(_) => String::new(),
    }
}

impl ToSql for ParamValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            ParamValue::Null => Ok(IsNull::Yes),
            ParamValue::Bool(v) => v.to_sql(ty, out),
            ParamValue::Int(v) => {
                if *ty == Type::INT2 {
                    i16::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*v as f64).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            ParamValue::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            ParamValue::Text(v) => v.as_str().to_sql(ty, out),
            ParamValue::Bytes(v) => v.as_slice().to_sql(ty, out),
            ParamValue::Json(v) => v.to_sql(ty, out),
            ParamValue::Opaque { type_name, .. } => {
                Err(format!("{type_name} cannot be bound for re-execution").into())
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(feature = "sqlite")]
impl rusqlite::ToSql for ParamValue {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value, ValueRef};

        Ok(match self {
            ParamValue::Null => ToSqlOutput::Owned(Value::Null),
            ParamValue::Bool(v) => ToSqlOutput::Owned(Value::Integer(i64::from(*v))),
            ParamValue::Int(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            ParamValue::Float(v) => ToSqlOutput::Owned(Value::Real(*v)),
            ParamValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            ParamValue::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
            ParamValue::Json(v) => ToSqlOutput::Owned(Value::Text(v.to_string())),
            ParamValue::Opaque { type_name, .. } => {
                return Err(rusqlite::Error::ToSqlConversionFailure(
                    format!("{type_name} cannot be bound for re-execution").into(),
                ));
            }
        })
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for ParamValue {
    fn from(v: i16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_serializable_params() {
        let params = vec![
            ParamValue::from(1),
            ParamValue::from("alice"),
            ParamValue::Null,
            ParamValue::from(json!({"k": [1, 2]})),
        ];
        let encoded = encode_params(&params);
        assert!(!encoded.is_empty());

        let decoded: String = form_urlencoded::parse(format!("p={encoded}").as_bytes())
            .map(|(_, v)| v.into_owned())
            .next()
            .unwrap();
        assert_eq!(decoded, r#"[1,"alice",null,{"k":[1,2]}]"#);
    }

    #[test]
    fn test_encode_empty_params_is_not_empty() {
        assert_eq!(encode_params(&[]), "%5B%5D");
    }

    #[test]
    fn test_encode_opaque_degrades_to_empty() {
        let params = vec![ParamValue::from(1), ParamValue::opaque(&std::time::Instant::now())];
        assert_eq!(encode_params(&params), "");
    }

    #[test]
    fn test_encode_invalid_utf8_degrades_to_empty() {
        let params = vec![ParamValue::Bytes(vec![0xff, 0xfe, 0x00])];
        assert_eq!(encode_params(&params), "");
    }

    #[test]
    fn test_utf8_bytes_serialize_as_text() {
        let params = vec![ParamValue::Bytes(b"abc".to_vec())];
        assert_eq!(encode_params(&params), "%5B%22abc%22%5D");
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(ParamValue::from(None::<i32>), ParamValue::Null);
        assert_eq!(ParamValue::from(Some(7)), ParamValue::Int(7));
    }

    fn bind(value: &ParamValue, ty: &Type) -> Result<Vec<u8>, Box<dyn Error + Sync + Send>> {
        let mut out = BytesMut::new();
        match value.to_sql(ty, &mut out)? {
            IsNull::Yes => Ok(Vec::new()),
            IsNull::No => Ok(out.to_vec()),
        }
    }

    #[test]
    fn test_int_narrows_to_column_width() {
        assert_eq!(bind(&ParamValue::Int(7), &Type::INT2).unwrap(), 7i16.to_be_bytes());
        assert_eq!(bind(&ParamValue::Int(7), &Type::INT4).unwrap(), 7i32.to_be_bytes());
        assert_eq!(bind(&ParamValue::Int(7), &Type::INT8).unwrap(), 7i64.to_be_bytes());
        assert_eq!(bind(&ParamValue::Int(2), &Type::FLOAT4).unwrap(), 2f32.to_be_bytes());
        assert_eq!(bind(&ParamValue::Int(2), &Type::FLOAT8).unwrap(), 2f64.to_be_bytes());
    }

    #[test]
    fn test_int_overflowing_column_width_is_rejected() {
        assert!(bind(&ParamValue::Int(70_000), &Type::INT2).is_err());
        assert!(bind(&ParamValue::Int(i64::from(i32::MAX) + 1), &Type::INT4).is_err());
        assert!(bind(&ParamValue::Int(-32_768), &Type::INT2).is_ok());
    }

    #[test]
    fn test_float_narrows_for_float4() {
        assert_eq!(bind(&ParamValue::Float(1.5), &Type::FLOAT4).unwrap(), 1.5f32.to_be_bytes());
        assert_eq!(bind(&ParamValue::Float(1.5), &Type::FLOAT8).unwrap(), 1.5f64.to_be_bytes());
    }

    #[test]
    fn test_postgres_bind_null_and_opaque() {
        let mut out = BytesMut::new();
        let is_null = ParamValue::Null.to_sql(&Type::INT4, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(out.is_empty());

        let opaque = ParamValue::opaque(&std::time::Instant::now());
        let err = bind(&opaque, &Type::TEXT).unwrap_err();
        assert!(err.to_string().contains("cannot be bound"));
    }

    #[test]
    fn test_opaque_is_not_bindable() {
        let value = ParamValue::opaque(&[1u8, 2, 3]);
        assert!(!value.is_bindable());
        assert!(ParamValue::Int(1).is_bindable());
        assert_eq!(value.to_string(), "[1, 2, 3]");
    }
}
