//! GTAF - General Typed Atom Fabric
//!
//! This crate provides an embedded, in-process data engine built around an
//! append-only log of content-addressed facts ("atoms").
//!
//! # Components
//!
//! - [`AtomStore`]: Append-only atom log with three write disciplines and a
//!   per-entity reference index
//! - [`ProjectionEngine`] / [`Node`]: Entity state reconstruction by replaying
//!   references
//! - [`QueryIndex`]: Per-tag string indexes for filter queries
//! - [`BinaryWriter`] / [`BinaryReader`]: Versioned on-disk format I/O
//!
//! # Example
//!
//! ```rust,ignore
//! use gtaf::{AtomStore, AtomClass, AtomValue, EntityId, ProjectionEngine};
//!
//! let mut store = AtomStore::new();
//! let user = EntityId::from_sequence(1);
//!
//! // Canonical atoms are content-addressed and globally deduplicated
//! store.append(user, "user.name", AtomValue::Text("alice".into()), AtomClass::Canonical);
//! store.append(user, "user.status", AtomValue::Text("active".into()), AtomClass::Canonical);
//!
//! // Persist and restore
//! store.save("users.gtaf")?;
//!
//! // Rebuild entity state from the reference log
//! let engine = ProjectionEngine::new(&store);
//! let node = engine.rebuild(user);
//! assert!(node.get("user.name").is_some());
//! ```

#![deny(missing_docs)]

pub mod codec;
pub mod error;
pub mod hash;
pub mod projection;
pub mod query;
pub mod store;
pub mod types;

pub use codec::{BinaryReader, BinaryWriter, READ_BUFFER_SIZE, STORE_MAGIC, STORE_VERSION};
pub use error::{Result, StoreError};
pub use hash::content_hash;
pub use projection::{Node, ProjectionEngine};
pub use query::{IndexStats, QueryIndex};
pub use store::{
    AppendItem, AtomStore, StoreStats, TemporalQuery, DEFAULT_CHUNK_SIZE_THRESHOLD,
    DEFAULT_SNAPSHOT_DELTA_THRESHOLD,
};
pub use types::{
    Atom, AtomClass, AtomId, AtomValue, EdgeValue, EntityId, EntityRef, Lsn, Timestamp,
    TransactionId,
};
