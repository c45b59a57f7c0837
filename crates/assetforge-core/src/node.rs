//! Literal and Derived node shapes.
//!
//! A [`Node`] is immutable: its [`ContentHash`] is computed once in the
//! constructor and cached on the node. Derived nodes refer to their
//! dependencies only by hash, never by value, so building a node never
//! recurses.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::hash::{hash_derived, hash_literal, ContentHash};

/// Primitive data carried by a literal node, decoded from program text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralData {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

impl LiteralData {
    /// Decodes a primitive JSON value. Arrays and objects return `None`.
    ///
    /// Integers that fit in `i64` always decode as `Int`, so the same
    /// number in program text always yields the same literal (and hash).
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(LiteralData::Null),
            serde_json::Value::Bool(b) => Some(LiteralData::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Some(LiteralData::Int(v))
                } else if let Some(v) = n.as_u64() {
                    Some(LiteralData::UInt(v))
                } else {
                    n.as_f64().map(LiteralData::Float)
                }
            }
            serde_json::Value::String(s) => Some(LiteralData::Str(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    /// Human-readable name of the data type.
    pub fn type_name(&self) -> &'static str {
        match self {
            LiteralData::Null => "null",
            LiteralData::Bool(_) => "bool",
            LiteralData::Int(_) | LiteralData::UInt(_) => "integer",
            LiteralData::Float(_) => "float",
            LiteralData::Str(_) => "string",
        }
    }
}

/// Shape-specific payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeShape {
    Literal(LiteralData),
    /// Dependency hashes in operation-specific order.
    Derived(SmallVec<[ContentHash; 4]>),
}

/// A content-addressed program node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: String,
    shape: NodeShape,
    hash: ContentHash,
}

impl Node {
    pub fn literal(kind: impl Into<String>, data: LiteralData) -> Self {
        let kind = kind.into();
        let hash = hash_literal(&kind, &data);
        Node {
            kind,
            shape: NodeShape::Literal(data),
            hash,
        }
    }

    pub fn derived(kind: impl Into<String>, deps: impl IntoIterator<Item = ContentHash>) -> Self {
        let kind = kind.into();
        let deps: SmallVec<[ContentHash; 4]> = deps.into_iter().collect();
        let hash = hash_derived(&kind, &deps);
        Node {
            kind,
            shape: NodeShape::Derived(deps),
            hash,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn shape(&self) -> &NodeShape {
        &self.shape
    }

    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.shape, NodeShape::Literal(_))
    }

    /// Dependency hashes; empty for literals.
    pub fn deps(&self) -> &[ContentHash] {
        match &self.shape {
            NodeShape::Literal(_) => &[],
            NodeShape::Derived(deps) => deps,
        }
    }
}
