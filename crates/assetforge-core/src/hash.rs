//! Deterministic content hashing for program nodes using blake3.
//!
//! A node's identity is its [`ContentHash`], composed Merkle-style from the
//! node's kind and either its literal data or the hashes of its
//! dependencies. Two nodes built independently from the same structure
//! always hash equal, in any process, which is what lets the memoization
//! cache and the incremental index treat them as the same computation.
//!
//! # Determinism
//!
//! - Every variable-length field is length prefixed before hashing, so no
//!   two distinct structures share a byte stream.
//! - Literal and derived nodes hash under separate domain tags.
//! - Numbers hash by their little-endian bytes; floats by their bit pattern.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;
use crate::node::LiteralData;

/// Width in bytes of a [`ContentHash`].
pub const HASH_LEN: usize = 32;

const LITERAL_DOMAIN: &[u8] = b"assetforge:literal";
const DERIVED_DOMAIN: &[u8] = b"assetforge:derived";

/// Fixed-width content address of a node, a program text, or a file set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub [u8; HASH_LEN]);

impl ContentHash {
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// Parses the output of [`ContentHash::to_hex`].
    pub fn from_hex(input: &str) -> Result<Self, CoreError> {
        blake3::Hash::from_hex(input)
            .map(|hash| ContentHash(*hash.as_bytes()))
            .map_err(|_| CoreError::InvalidHash {
                input: input.to_string(),
            })
    }
}

impl From<blake3::Hash> for ContentHash {
    fn from(hash: blake3::Hash) -> Self {
        ContentHash(*hash.as_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "ContentHash({})", &hex[..12])
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        ContentHash::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Feeds `bytes` into the hasher behind a little-endian length prefix.
pub(crate) fn update_framed(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn update_literal_data(hasher: &mut blake3::Hasher, data: &LiteralData) {
    match data {
        LiteralData::Null => {
            hasher.update(&[0]);
        }
        LiteralData::Bool(b) => {
            hasher.update(&[1, *b as u8]);
        }
        LiteralData::Int(v) => {
            hasher.update(&[2]);
            hasher.update(&v.to_le_bytes());
        }
        LiteralData::UInt(v) => {
            hasher.update(&[3]);
            hasher.update(&v.to_le_bytes());
        }
        LiteralData::Float(v) => {
            hasher.update(&[4]);
            hasher.update(&v.to_bits().to_le_bytes());
        }
        LiteralData::Str(s) => {
            hasher.update(&[5]);
            update_framed(hasher, s.as_bytes());
        }
    }
}

/// Hash of a literal node: `H(kind, data)`.
pub fn hash_literal(kind: &str, data: &LiteralData) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(LITERAL_DOMAIN);
    update_framed(&mut hasher, kind.as_bytes());
    update_literal_data(&mut hasher, data);
    hasher.finalize().into()
}

/// Hash of a derived node: `H(kind, dep_hash_0, dep_hash_1, ...)`.
///
/// Dependency order is significant.
pub fn hash_derived(kind: &str, deps: &[ContentHash]) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DERIVED_DOMAIN);
    update_framed(&mut hasher, kind.as_bytes());
    hasher.update(&(deps.len() as u64).to_le_bytes());
    for dep in deps {
        hasher.update(dep.as_bytes());
    }
    hasher.finalize().into()
}

/// Plain digest of a byte string (used for program texts).
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    blake3::hash(bytes).into()
}
