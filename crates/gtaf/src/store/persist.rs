//! Store persistence: the version-2 `GTAF` file format.
//!
//! Only the content log, the reference layer, and the refcounts are
//! persisted. Temporal chunk columns and mutable delta buffers are in-memory
//! only; after `load`, temporal queries on pre-restart streams return empty
//! until new appends arrive. The reference layer is sufficient to
//! reconstruct current state via projection.
//!
//! ## Layout (all integers little-endian)
//!
//! ```text
//! magic            4 bytes   "GTAF"
//! version          u32       must be 2
//! next_lsn         u64
//! next_atom_id     u64
//! atom_count       u64
//! atoms            atom_id (16) | class (u8) | tag (u32 len + UTF-8)
//!                  | value (tagged) | created_at (u64)
//! entity_count     u64
//! entity buckets   entity_id (16) | ref_count (u64)
//!                  | refs (ref_count x (atom_id (16) | lsn (u64)))
//! refcount_count   u64
//! refcounts        atom_id (16) | count (u32)
//! ```

use super::AtomStore;
use crate::codec::{BinaryReader, BinaryWriter, STORE_MAGIC, STORE_VERSION};
use crate::error::{Result, StoreError};
use crate::types::{Atom, AtomClass, EntityRef};
use std::io;
use std::path::Path;
use tracing::debug;

impl AtomStore {
    /// Writes the store to `path` in the version-2 format.
    ///
    /// Write-all-or-fail: on any I/O error the operation returns the error
    /// and may leave a partially-written file behind; the caller is
    /// responsible for cleanup.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BinaryWriter::create(path)?;

        writer.write_bytes(&STORE_MAGIC)?;
        writer.write_u32(STORE_VERSION)?;
        writer.write_u64(self.next_lsn)?;
        writer.write_u64(self.next_atom_id)?;

        writer.write_u64(self.atoms.len() as u64)?;
        for atom in &self.atoms {
            writer.write_atom_id(&atom.atom_id)?;
            writer.write_u8(atom.class as u8)?;
            writer.write_string(&atom.tag)?;
            writer.write_value(&atom.value)?;
            writer.write_timestamp(atom.created_at)?;
        }

        writer.write_u64(self.entity_refs.len() as u64)?;
        for (entity, refs) in &self.entity_refs {
            writer.write_entity_id(entity)?;
            writer.write_u64(refs.len() as u64)?;
            for entity_ref in refs {
                writer.write_atom_id(&entity_ref.atom_id)?;
                writer.write_lsn(entity_ref.lsn)?;
            }
        }

        writer.write_u64(self.refcounts.len() as u64)?;
        for (atom_id, count) in &self.refcounts {
            writer.write_atom_id(atom_id)?;
            writer.write_u32(*count)?;
        }

        writer.flush()?;
        debug!(
            path = %path.display(),
            atoms = self.atoms.len(),
            entities = self.entity_refs.len(),
            "saved store"
        );
        Ok(())
    }

    /// Replaces the store's contents with the file at `path`.
    ///
    /// All in-memory state is cleared before reading. On any error the store
    /// is left empty, never partially loaded. The canonical dedup map and
    /// the content index are rebuilt by replaying the record log;
    /// `deduplicated_hits` and `snapshot_count` are session counters and
    /// reset to zero.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.clear();
        let result = self.load_from(path.as_ref());
        if result.is_err() {
            self.clear();
        }
        result
    }

    fn load_from(&mut self, path: &Path) -> Result<()> {
        let mut reader = BinaryReader::open(path)?;

        let mut magic = [0u8; 4];
        reader.read_bytes(&mut magic)?;
        if magic != STORE_MAGIC {
            return Err(StoreError::InvalidMagic(magic));
        }
        let version = reader.read_u32()?;
        if version != STORE_VERSION {
            return Err(StoreError::UnsupportedVersion(version));
        }

        self.next_lsn = reader.read_u64()?;
        self.next_atom_id = reader.read_u64()?;

        let atom_count = reader.read_u64()? as usize;
        self.atoms.reserve(atom_count);
        self.content_index.reserve(atom_count);
        for _ in 0..atom_count {
            let atom_id = reader.read_atom_id()?;
            let class_byte = reader.read_u8()?;
            let class = AtomClass::from_u8(class_byte).ok_or_else(|| {
                StoreError::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown atom classification: {class_byte}"),
                ))
            })?;
            let tag = reader.read_string()?;
            let value = reader.read_value()?;
            let created_at = reader.read_timestamp()?;

            let index = self.atoms.len();
            if class == AtomClass::Canonical && !self.canonical_dedup.contains_key(&atom_id) {
                self.canonical_dedup.insert(atom_id, index);
                self.canonical_count += 1;
            }
            // Mutable records share a stable id; the latest one wins, same
            // as at append time.
            self.content_index.insert(atom_id, index);
            self.atoms.push(Atom::new(atom_id, class, tag, value, created_at));
        }

        let entity_count = reader.read_u64()? as usize;
        self.entity_refs.reserve(entity_count);
        for _ in 0..entity_count {
            let entity = reader.read_entity_id()?;
            let ref_count = reader.read_u64()? as usize;
            let mut refs = Vec::with_capacity(ref_count);
            for _ in 0..ref_count {
                let atom_id = reader.read_atom_id()?;
                let lsn = reader.read_lsn()?;
                refs.push(EntityRef { atom_id, lsn });
            }
            self.total_refs += ref_count as u64;
            self.entity_refs.insert(entity, refs);
        }

        let refcount_count = reader.read_u64()? as usize;
        self.refcounts.reserve(refcount_count);
        for _ in 0..refcount_count {
            let atom_id = reader.read_atom_id()?;
            let count = reader.read_u32()?;
            self.refcounts.insert(atom_id, count);
        }

        debug!(
            path = %path.display(),
            atoms = self.atoms.len(),
            entities = self.entity_refs.len(),
            "loaded store"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreStats;
    use crate::types::{AtomValue, EntityId};
    use tempfile::TempDir;

    #[test]
    fn test_empty_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.gtaf");

        let store = AtomStore::new();
        store.save(&path).unwrap();

        let mut restored = AtomStore::new();
        restored.load(&path).unwrap();
        assert!(restored.all().is_empty());
        assert_eq!(restored.get_stats(), StoreStats::default());
    }

    #[test]
    fn test_load_missing_file_leaves_store_empty() {
        let dir = TempDir::new().unwrap();
        let mut store = AtomStore::new();
        store.append(
            EntityId::from_sequence(1),
            "a",
            AtomValue::Int(1),
            AtomClass::Canonical,
        );

        let err = store.load(dir.path().join("missing.gtaf")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(store.all().is_empty());
    }

    #[test]
    fn test_load_rejects_bad_magic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.gtaf");
        std::fs::write(&path, b"NOPE\x02\x00\x00\x00").unwrap();

        let mut store = AtomStore::new();
        let err = store.load(&path).unwrap_err();
        assert!(matches!(err, StoreError::InvalidMagic(m) if &m == b"NOPE"));
    }

    #[test]
    fn test_load_rejects_wrong_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v9.gtaf");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&STORE_MAGIC);
        bytes.extend_from_slice(&9u32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        let mut store = AtomStore::new();
        let err = store.load(&path).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion(9)));
    }
}
