//! Error and Result types for atom store operations.

use crate::store::chunk::ChunkId;
use std::io;
use thiserror::Error;

/// A convenience `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The error type for store operations.
///
/// Query-shaped misses (unknown entity, unknown atom, unindexed tag) are not
/// errors; those surface as `Option::None` or empty results.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid magic bytes in a store file header.
    #[error("Invalid magic bytes: expected GTAF, got {0:?}")]
    InvalidMagic([u8; 4]),

    /// Unsupported store file format version.
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    /// Unknown value discriminator while decoding an atom value.
    #[error("Unknown value tag: {0}")]
    UnknownValueTag(u8),

    /// Append attempted on a sealed temporal chunk.
    #[error("Chunk {chunk_id} is sealed, cannot append")]
    ChunkSealed {
        /// Identifier of the sealed chunk within its stream.
        chunk_id: ChunkId,
    },

    /// Seal attempted on an already-sealed temporal chunk.
    #[error("Chunk {chunk_id} is already sealed")]
    AlreadySealed {
        /// Identifier of the chunk within its stream.
        chunk_id: ChunkId,
    },

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
