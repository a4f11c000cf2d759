//! Core value model and identifier types.
//!
//! This module defines the identifiers and the tagged value union that every
//! other component builds on:
//!
//! - [`AtomId`] / [`EntityId`]: opaque 16-byte identifiers
//! - [`AtomClass`]: storage discipline of an atom
//! - [`AtomValue`]: the closed 8-variant value union
//! - [`Atom`]: an immutable content record
//! - [`EntityRef`]: one entry in an entity's reference list

use std::fmt;
use std::hash::{Hash, Hasher};

/// Log sequence number, strictly monotonic per store. 0 is never allocated.
pub type Lsn = u64;

/// Microseconds since the Unix epoch, sampled at append time.
pub type Timestamp = u64;

/// Reserved transaction identifier; 0 means auto-commit.
pub type TransactionId = u64;

/// Returns true if the transaction id denotes auto-commit.
pub fn is_auto_commit(tx_id: TransactionId) -> bool {
    tx_id == 0
}

/// Opaque 16-byte atom identifier.
///
/// Canonical atoms use the content hash of `(tag, value)`; Temporal and
/// Mutable atoms use a store-local sequential counter packed into the first
/// 8 bytes (remaining bytes zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AtomId(pub [u8; 16]);

/// Opaque 16-byte entity identifier, assigned by the caller.
///
/// The engine never interprets entity id bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntityId(pub [u8; 16]);

macro_rules! impl_id_common {
    ($name:ident) => {
        impl $name {
            /// The all-zero (nil) identifier.
            pub const NIL: $name = $name([0u8; 16]);

            /// Packs a sequential counter into the first 8 bytes (little-endian),
            /// leaving the remaining bytes zero.
            pub fn from_sequence(seq: u64) -> Self {
                let mut bytes = [0u8; 16];
                bytes[..8].copy_from_slice(&seq.to_le_bytes());
                Self(bytes)
            }

            /// Returns true if every byte is zero.
            pub fn is_nil(&self) -> bool {
                self.0.iter().all(|&b| b == 0)
            }

            /// Returns the raw bytes.
            pub fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }

            /// Renders the identifier as a 32-character lowercase hex string.
            pub fn to_hex(&self) -> String {
                self.to_string()
            }
        }

        // Identifiers are either uniform hash output (Canonical atom ids) or
        // sequential counters packed into the leading bytes, so the first
        // 8 bytes are enough to key a hash map. Not a cryptographic MAC.
        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                state.write_u64(u64::from_le_bytes(self.0[..8].try_into().unwrap()));
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for byte in &self.0 {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    };
}

impl_id_common!(AtomId);
impl_id_common!(EntityId);

/// Storage and deduplication discipline of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AtomClass {
    /// Immutable, content-addressed, globally deduplicated.
    Canonical = 0,
    /// Append-only time-series data, chunked storage, never deduplicated.
    Temporal = 1,
    /// Stable id, in-place current value with delta logging and snapshots.
    Mutable = 2,
}

impl AtomClass {
    /// Creates an AtomClass from a u8 value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Canonical),
            1 => Some(Self::Temporal),
            2 => Some(Self::Mutable),
            _ => None,
        }
    }
}

/// An edge value: a typed link to another entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeValue {
    /// The entity this edge points at.
    pub target: EntityId,
    /// Relation name (e.g., `"follows"`).
    pub relation: String,
}

/// The universal value container for atom payloads.
///
/// The discriminant of each variant is part of the persisted wire format and
/// must stay stable.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AtomValue {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// IEEE-754 double.
    Float(f64),
    /// UTF-8 string.
    Text(String),
    /// Embedding vector of 32-bit floats.
    FloatVec(Vec<f32>),
    /// Opaque byte blob.
    Blob(Vec<u8>),
    /// Typed link to another entity.
    Edge(EdgeValue),
}

impl AtomValue {
    /// Returns the wire discriminant of this variant, in `[0, 7]`.
    pub fn discriminant(&self) -> u8 {
        match self {
            AtomValue::Null => 0,
            AtomValue::Bool(_) => 1,
            AtomValue::Int(_) => 2,
            AtomValue::Float(_) => 3,
            AtomValue::Text(_) => 4,
            AtomValue::FloatVec(_) => 5,
            AtomValue::Blob(_) => 6,
            AtomValue::Edge(_) => 7,
        }
    }

    /// Returns the string payload if this is a `Text` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AtomValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload if this is an `Int` value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AtomValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// An immutable content record.
///
/// Atoms carry no entity id and no LSN; those live in the per-entity
/// reference layer of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Identifier: content hash (Canonical) or sequential (Temporal/Mutable).
    pub atom_id: AtomId,
    /// Storage discipline.
    pub class: AtomClass,
    /// Semantic type tag (e.g., `"user.name"`).
    pub tag: String,
    /// Payload.
    pub value: AtomValue,
    /// Creation time, microseconds since the epoch.
    pub created_at: Timestamp,
    /// Reserved; always 0 (auto-commit) today and not persisted.
    pub tx_id: TransactionId,
}

impl Atom {
    /// Creates a new content record with an auto-commit transaction id.
    pub fn new(
        atom_id: AtomId,
        class: AtomClass,
        tag: String,
        value: AtomValue,
        created_at: Timestamp,
    ) -> Self {
        Self {
            atom_id,
            class,
            tag,
            value,
            created_at,
            tx_id: 0,
        }
    }

    /// Returns true for content-addressed atoms.
    pub fn is_canonical(&self) -> bool {
        self.class == AtomClass::Canonical
    }

    /// Returns true for time-series atoms.
    pub fn is_temporal(&self) -> bool {
        self.class == AtomClass::Temporal
    }

    /// Returns true for delta-logged atoms.
    pub fn is_mutable(&self) -> bool {
        self.class == AtomClass::Mutable
    }
}

/// One entry in an entity's ordered reference list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRef {
    /// The referenced content record.
    pub atom_id: AtomId,
    /// Global log sequence number at the time of the append.
    pub lsn: Lsn,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_sequence_packs_leading_bytes() {
        let id = AtomId::from_sequence(0x0102_0304);
        assert_eq!(&id.0[..8], &0x0102_0304u64.to_le_bytes());
        assert_eq!(&id.0[8..], &[0u8; 8]);
    }

    #[test]
    fn test_nil_detection() {
        assert!(AtomId::NIL.is_nil());
        assert!(!AtomId::from_sequence(1).is_nil());
        assert!(EntityId::NIL.is_nil());
    }

    #[test]
    fn test_hex_rendering() {
        let mut bytes = [0u8; 16];
        bytes[0] = 0xab;
        bytes[15] = 0x01;
        let id = AtomId(bytes);
        assert_eq!(id.to_hex(), "ab000000000000000000000000000001");
    }

    #[test]
    fn test_ids_as_map_keys() {
        let mut map = HashMap::new();
        map.insert(EntityId::from_sequence(7), "seven");
        map.insert(EntityId::from_sequence(8), "eight");
        assert_eq!(map.get(&EntityId::from_sequence(7)), Some(&"seven"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_class_from_u8() {
        assert_eq!(AtomClass::from_u8(0), Some(AtomClass::Canonical));
        assert_eq!(AtomClass::from_u8(1), Some(AtomClass::Temporal));
        assert_eq!(AtomClass::from_u8(2), Some(AtomClass::Mutable));
        assert_eq!(AtomClass::from_u8(3), None);
    }

    #[test]
    fn test_value_discriminants_are_stable() {
        let values = [
            AtomValue::Null,
            AtomValue::Bool(true),
            AtomValue::Int(-1),
            AtomValue::Float(0.5),
            AtomValue::Text("x".to_string()),
            AtomValue::FloatVec(vec![1.0]),
            AtomValue::Blob(vec![0xff]),
            AtomValue::Edge(EdgeValue {
                target: EntityId::NIL,
                relation: "r".to_string(),
            }),
        ];
        for (expected, value) in values.iter().enumerate() {
            assert_eq!(value.discriminant(), expected as u8);
        }
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(AtomValue::Text("a".to_string()).as_str(), Some("a"));
        assert_eq!(AtomValue::Int(42).as_int(), Some(42));
        assert_eq!(AtomValue::Int(42).as_str(), None);
        assert_eq!(AtomValue::Null.as_int(), None);
    }

    #[test]
    fn test_atom_class_helpers() {
        let atom = Atom::new(
            AtomId::from_sequence(1),
            AtomClass::Temporal,
            "sensor.temp".to_string(),
            AtomValue::Float(23.5),
            0,
        );
        assert!(atom.is_temporal());
        assert!(!atom.is_canonical());
        assert!(!atom.is_mutable());
        assert!(is_auto_commit(atom.tx_id));
    }
}
