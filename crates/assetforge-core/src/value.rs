//! Materialized values and their wire encoding.
//!
//! [`Value`] is what materializers produce and what the memoization cache
//! stores. The engine never looks inside a value; it only moves it around by
//! the hash of the node that produced it. Domain crates plug their own types
//! in through [`DomainValue`], which supplies the wire encoding.
//!
//! The wire format is JSON:
//! - scalars encode as JSON scalars, lists as arrays
//! - `Binary` encodes as `{"kind": "Binary", "data": <base64>}`
//! - `SourceFile` encodes as `{"kind": "SourceFile", "extension", "content"}`
//! - failures encode as `{"kind": "Error", "info": [..]}`
//! - the incremental skip signal is `{"kind": "Signal", "info": "unchanged"}`

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use serde_json::json;

use crate::error::SerializationError;
use crate::node::LiteralData;

/// Extension point for domain values (meshes, textures, tensors, ...).
pub trait DomainValue: fmt::Debug + Send + Sync {
    /// Name used in diagnostics and error messages.
    fn type_name(&self) -> &str;

    /// Wire encoding of the value.
    fn encode(&self) -> Result<serde_json::Value, SerializationError>;

    /// Downcasting hook for materializers consuming this value.
    fn as_any(&self) -> &dyn Any;
}

/// A value produced by a materializer.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Binary(Vec<u8>),
    List(Vec<Arc<Value>>),
    SourceFile { extension: String, content: String },
    Domain(Arc<dyn DomainValue>),
}

impl Value {
    /// The value a literal node of the same data would carry.
    pub fn from_literal(data: &LiteralData) -> Value {
        match data {
            LiteralData::Null => Value::Null,
            LiteralData::Bool(b) => Value::Bool(*b),
            LiteralData::Int(v) => Value::Int(*v),
            LiteralData::UInt(v) => Value::UInt(*v),
            LiteralData::Float(v) => Value::Float(*v),
            LiteralData::Str(s) => Value::Str(s.clone()),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::UInt(_) => "UInt",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::Binary(_) => "Binary",
            Value::List(_) => "List",
            Value::SourceFile { .. } => "SourceFile",
            Value::Domain(domain) => domain.type_name(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Non-negative integers as `u64`, regardless of signedness.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Any number widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Arc<Value>]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Downcasts a domain value to its concrete type.
    pub fn as_domain<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Domain(domain) => domain.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Builds the JSON wire representation.
    pub fn to_wire(&self) -> Result<serde_json::Value, SerializationError> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Int(v) => json!(v),
            Value::UInt(v) => json!(v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .ok_or_else(|| {
                    SerializationError::new("Float", format!("{v} has no JSON representation"))
                })?,
            Value::Str(s) => json!(s),
            Value::Binary(bytes) => json!({
                "kind": "Binary",
                "data": base64::engine::general_purpose::STANDARD.encode(bytes),
            }),
            Value::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| item.to_wire())
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Value::SourceFile { extension, content } => json!({
                "kind": "SourceFile",
                "extension": extension,
                "content": content,
            }),
            Value::Domain(domain) => domain.encode()?,
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (
                Value::SourceFile {
                    extension: ea,
                    content: ca,
                },
                Value::SourceFile {
                    extension: eb,
                    content: cb,
                },
            ) => ea == eb && ca == cb,
            // Domain values have no structural equality; identity only.
            (Value::Domain(a), Value::Domain(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Serializes a value into the wire payload text.
pub fn serialize(value: &Value) -> Result<String, SerializationError> {
    let wire = value.to_wire()?;
    serde_json::to_string(&wire)
        .map_err(|e| SerializationError::new(value.type_name(), e.to_string()))
}

/// Payload returned in place of a value when a failure is captured.
pub fn error_payload(info: &[String]) -> String {
    json!({ "kind": "Error", "info": info }).to_string()
}

/// Payload returned when the incremental index reports nothing changed.
pub fn unchanged_signal() -> String {
    json!({ "kind": "Signal", "info": "unchanged" }).to_string()
}

/// True if `payload` is an error payload produced by [`error_payload`].
pub fn is_error_payload(payload: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(payload)
        .map(|v| v.get("kind").and_then(|k| k.as_str()) == Some("Error"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Mesh {
        vertices: usize,
    }

    impl DomainValue for Mesh {
        fn type_name(&self) -> &str {
            "Mesh"
        }

        fn encode(&self) -> Result<serde_json::Value, SerializationError> {
            if self.vertices == 0 {
                return Err(SerializationError::new("Mesh", "empty mesh"));
            }
            Ok(json!({ "kind": "Mesh", "vertices": self.vertices }))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn scalars_serialize_as_json_scalars() {
        assert_eq!(serialize(&Value::UInt(12)).unwrap(), "12");
        assert_eq!(serialize(&Value::Int(-3)).unwrap(), "-3");
        assert_eq!(serialize(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(serialize(&Value::Str("hi".into())).unwrap(), "\"hi\"");
        assert_eq!(serialize(&Value::Null).unwrap(), "null");
    }

    #[test]
    fn binary_is_base64_encoded() {
        let payload = serialize(&Value::Binary(b"abc".to_vec())).unwrap();
        let wire: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(wire["kind"], "Binary");
        assert_eq!(wire["data"], "YWJj");
    }

    #[test]
    fn lists_encode_recursively() {
        let list = Value::List(vec![
            Arc::new(Value::UInt(1)),
            Arc::new(Value::List(vec![Arc::new(Value::Str("x".into()))])),
        ]);
        assert_eq!(serialize(&list).unwrap(), "[1,[\"x\"]]");
    }

    #[test]
    fn non_finite_float_is_a_serialization_error() {
        let err = serialize(&Value::Float(f64::NAN)).unwrap_err();
        assert_eq!(err.type_name, "Float");

        let nested = Value::List(vec![Arc::new(Value::Float(f64::INFINITY))]);
        assert!(serialize(&nested).is_err());
    }

    #[test]
    fn domain_values_supply_their_encoding() {
        let mesh = Value::Domain(Arc::new(Mesh { vertices: 3 }));
        assert_eq!(mesh.type_name(), "Mesh");
        assert_eq!(mesh.as_domain::<Mesh>().map(|m| m.vertices), Some(3));
        let wire: serde_json::Value = serde_json::from_str(&serialize(&mesh).unwrap()).unwrap();
        assert_eq!(wire["vertices"], 3);

        let empty = Value::Domain(Arc::new(Mesh { vertices: 0 }));
        assert!(serialize(&empty).is_err());
    }

    #[test]
    fn error_and_signal_payloads() {
        let payload = error_payload(&["outer".to_string(), "inner".to_string()]);
        assert!(is_error_payload(&payload));
        let wire: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(wire["info"][1], "inner");

        let signal = unchanged_signal();
        assert!(!is_error_payload(&signal));
        assert_eq!(signal, r#"{"info":"unchanged","kind":"Signal"}"#);
    }

    #[test]
    fn numeric_accessors_widen() {
        assert_eq!(Value::Int(5).as_u64(), Some(5));
        assert_eq!(Value::Int(-5).as_u64(), None);
        assert_eq!(Value::UInt(5).as_f64(), Some(5.0));
        assert_eq!(Value::Str("5".into()).as_u64(), None);
    }
}
