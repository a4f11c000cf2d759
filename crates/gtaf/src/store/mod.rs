//! Append-only atom store with three write disciplines.
//!
//! The [`AtomStore`] is the engine's write side. Every append allocates a
//! globally monotonic LSN, records an [`EntityRef`] on the owning entity's
//! ordered reference list, and routes the payload by [`AtomClass`]:
//!
//! - **Canonical**: content-addressed, globally deduplicated. Equal
//!   `(tag, value)` pairs share one content record; reuse adds references,
//!   not content.
//! - **Temporal**: time-series values buffered in columnar chunks per
//!   `(entity, tag)` stream; chunks seal at a size threshold and rotate.
//!   Never deduplicated.
//! - **Mutable**: one stable atom id per `(entity, tag)` stream with
//!   in-place current value, delta logging, and periodic snapshot emission
//!   as Canonical `"<tag>.snapshot"` atoms.
//!
//! The store is single-threaded: no internal locking, no background work.
//! Callers serialize access; borrows returned by query methods must not be
//! held across mutating calls.

pub mod chunk;
pub mod mutable;
mod persist;

use crate::hash::content_hash;
use crate::store::chunk::TemporalChunk;
use crate::store::mutable::MutableState;
use crate::types::{Atom, AtomClass, AtomId, AtomValue, EntityId, EntityRef, Lsn, Timestamp};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::debug;

/// Default number of values per temporal chunk before it is sealed.
pub const DEFAULT_CHUNK_SIZE_THRESHOLD: usize = 1000;

/// Default number of deltas on a mutable stream before a snapshot is emitted.
pub const DEFAULT_SNAPSHOT_DELTA_THRESHOLD: u32 = 10;

/// Key of a temporal or mutable stream.
type StreamKey = (EntityId, String);

/// One item of a batch append.
#[derive(Debug, Clone)]
pub struct AppendItem {
    /// Entity the atom is recorded against.
    pub entity: EntityId,
    /// Semantic type tag.
    pub tag: String,
    /// Payload.
    pub value: AtomValue,
    /// Storage discipline.
    pub class: AtomClass,
}

/// Store-wide counters and sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Content records in the log (one per unique Canonical atom, one per
    /// Temporal append, one per Mutable append, one per snapshot).
    pub total_atoms: usize,
    /// Canonical content records in the log.
    pub canonical_atoms: usize,
    /// Distinct canonical atom ids (dedup map size).
    pub unique_canonical_atoms: usize,
    /// Canonical appends that hit an existing record. Session counter; reset
    /// to zero by `load`.
    pub deduplicated_hits: u64,
    /// Entities with at least one reference.
    pub total_entities: usize,
    /// Total entries across all entity reference lists.
    pub total_references: u64,
    /// Snapshots emitted from mutable streams. Session counter; reset to
    /// zero by `load`.
    pub snapshot_count: u64,
}

/// Result of a temporal range query: three parallel columns plus the count.
#[derive(Debug, Clone, Default)]
pub struct TemporalQuery {
    /// Matching values in insertion order.
    pub values: Vec<AtomValue>,
    /// Timestamps parallel to `values`.
    pub timestamps: Vec<Timestamp>,
    /// LSNs parallel to `values`.
    pub lsns: Vec<Lsn>,
    /// Number of matching entries.
    pub total_count: usize,
}

/// Append-only atom store: content log, reference layer, dedup map, temporal
/// chunks, and mutable stream states.
pub struct AtomStore {
    /// Append-only content record log; `all()` exposes it.
    atoms: Vec<Atom>,
    /// Atom id -> index into `atoms`. For mutable atoms (stable id reused
    /// across mutations) the entry tracks the latest record.
    content_index: HashMap<AtomId, usize>,
    /// Content hash -> index, canonical atoms only.
    canonical_dedup: HashMap<AtomId, usize>,
    /// Per-entity ordered reference lists, LSN strictly increasing.
    entity_refs: HashMap<EntityId, Vec<EntityRef>>,
    /// References pointing at each atom id.
    refcounts: HashMap<AtomId, u32>,
    /// At most one active chunk per temporal stream.
    active_chunks: HashMap<StreamKey, TemporalChunk>,
    /// Sealed chunks per stream, in chunk-id order.
    sealed_chunks: HashMap<StreamKey, Vec<TemporalChunk>>,
    /// Next chunk id per stream.
    next_chunk_ids: HashMap<StreamKey, chunk::ChunkId>,
    /// Delta-logged state per mutable stream.
    mutable_states: HashMap<StreamKey, MutableState>,
    next_lsn: u64,
    next_atom_id: u64,
    canonical_count: usize,
    dedup_hits: u64,
    snapshot_count: u64,
    total_refs: u64,
    chunk_size_threshold: usize,
    snapshot_delta_threshold: u32,
}

impl Default for AtomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomStore {
    /// Creates an empty store with default thresholds.
    pub fn new() -> Self {
        Self::with_thresholds(DEFAULT_CHUNK_SIZE_THRESHOLD, DEFAULT_SNAPSHOT_DELTA_THRESHOLD)
    }

    /// Creates an empty store with custom chunk and snapshot thresholds.
    pub fn with_thresholds(chunk_size_threshold: usize, snapshot_delta_threshold: u32) -> Self {
        Self {
            atoms: Vec::new(),
            content_index: HashMap::new(),
            canonical_dedup: HashMap::new(),
            entity_refs: HashMap::new(),
            refcounts: HashMap::new(),
            active_chunks: HashMap::new(),
            sealed_chunks: HashMap::new(),
            next_chunk_ids: HashMap::new(),
            mutable_states: HashMap::new(),
            next_lsn: 0,
            next_atom_id: 0,
            canonical_count: 0,
            dedup_hits: 0,
            snapshot_count: 0,
            total_refs: 0,
            chunk_size_threshold,
            snapshot_delta_threshold,
        }
    }

    /// Pre-sizes the internal maps for a known workload.
    pub fn reserve(&mut self, atom_hint: usize, entity_hint: usize) {
        self.atoms.reserve(atom_hint);
        self.content_index.reserve(atom_hint);
        self.canonical_dedup.reserve(atom_hint);
        self.refcounts.reserve(atom_hint);
        self.entity_refs.reserve(entity_hint);
    }

    /// Appends one atom, dispatching on its classification, and returns the
    /// content record (new or pre-existing).
    pub fn append(
        &mut self,
        entity: EntityId,
        tag: &str,
        value: AtomValue,
        class: AtomClass,
    ) -> &Atom {
        let now = now_micros();
        let index = match class {
            AtomClass::Canonical => self.append_canonical(entity, tag, value, now),
            AtomClass::Temporal => self.append_temporal(entity, tag, value, now),
            AtomClass::Mutable => self.append_mutable(entity, tag, value, now),
        };
        &self.atoms[index]
    }

    /// Appends a batch of atoms, sampling one timestamp for the whole batch.
    ///
    /// LSNs are allocated contiguously across the batch; there is no
    /// rollback on partial application. Returns the number of new content
    /// records stored (deduplicated canonical hits are not re-stored and not
    /// counted; snapshot emissions triggered by the batch are).
    pub fn append_batch(&mut self, items: Vec<AppendItem>) -> usize {
        let now = now_micros();
        let before = self.atoms.len();
        for item in items {
            match item.class {
                AtomClass::Canonical => {
                    self.append_canonical(item.entity, &item.tag, item.value, now);
                }
                AtomClass::Temporal => {
                    self.append_temporal(item.entity, &item.tag, item.value, now);
                }
                AtomClass::Mutable => {
                    self.append_mutable(item.entity, &item.tag, item.value, now);
                }
            }
        }
        self.atoms.len() - before
    }

    /// Content-addressed append: one dedup-map probe covers both the lookup
    /// and the insert.
    fn append_canonical(
        &mut self,
        entity: EntityId,
        tag: &str,
        value: AtomValue,
        now: Timestamp,
    ) -> usize {
        let atom_id = content_hash(tag, &value);
        let lsn = self.alloc_lsn();
        self.push_ref(entity, atom_id, lsn);

        match self.canonical_dedup.entry(atom_id) {
            Entry::Occupied(slot) => {
                self.dedup_hits += 1;
                *slot.get()
            }
            Entry::Vacant(slot) => {
                let index = self.atoms.len();
                slot.insert(index);
                self.atoms.push(Atom::new(
                    atom_id,
                    AtomClass::Canonical,
                    tag.to_string(),
                    value,
                    now,
                ));
                self.content_index.insert(atom_id, index);
                self.canonical_count += 1;
                index
            }
        }
    }

    /// Time-series append: buffer into the stream's active chunk, seal and
    /// rotate at the threshold, then record a companion content record under
    /// a fresh sequential id. Identical values never deduplicate.
    fn append_temporal(
        &mut self,
        entity: EntityId,
        tag: &str,
        value: AtomValue,
        now: Timestamp,
    ) -> usize {
        let lsn = self.alloc_lsn();
        let key: StreamKey = (entity, tag.to_string());

        if !self.active_chunks.contains_key(&key) {
            let chunk_id = {
                let next = self.next_chunk_ids.entry(key.clone()).or_insert(0);
                let id = *next;
                *next += 1;
                id
            };
            self.active_chunks.insert(
                key.clone(),
                TemporalChunk::new(chunk_id, entity, tag.to_string(), lsn, now),
            );
        }

        let chunk = self.active_chunks.get_mut(&key).unwrap();
        chunk
            .append(value.clone(), lsn, now)
            .expect("active chunk is never sealed");

        if chunk.should_seal(self.chunk_size_threshold) {
            self.seal_active_chunk(&key, now);
        }

        let atom_id = self.alloc_atom_id();
        self.push_ref(entity, atom_id, lsn);

        let index = self.atoms.len();
        self.atoms.push(Atom::new(
            atom_id,
            AtomClass::Temporal,
            tag.to_string(),
            value,
            now,
        ));
        self.content_index.insert(atom_id, index);
        index
    }

    /// Delta-logged append: mutate the stream state under its stable id,
    /// record the reference and companion record, then emit a snapshot if
    /// the delta threshold was reached.
    ///
    /// The mutation's reference is inserted before any snapshot reference so
    /// the entity list stays in LSN order.
    fn append_mutable(
        &mut self,
        entity: EntityId,
        tag: &str,
        value: AtomValue,
        now: Timestamp,
    ) -> usize {
        let lsn = self.alloc_lsn();
        let key: StreamKey = (entity, tag.to_string());

        if !self.mutable_states.contains_key(&key) {
            let atom_id = self.alloc_atom_id();
            self.mutable_states.insert(
                key.clone(),
                MutableState::new(atom_id, entity, tag.to_string(), value.clone(), lsn),
            );
        }

        let state = self.mutable_states.get_mut(&key).unwrap();
        state.mutate(value.clone(), lsn, now);
        let atom_id = state.meta().atom_id;
        let snapshot_due = state.should_snapshot(self.snapshot_delta_threshold);

        self.push_ref(entity, atom_id, lsn);

        let index = self.atoms.len();
        self.atoms.push(Atom::new(
            atom_id,
            AtomClass::Mutable,
            tag.to_string(),
            value,
            now,
        ));
        // Latest record wins for the stable id.
        self.content_index.insert(atom_id, index);

        if snapshot_due {
            self.emit_snapshot(&key, now);
        }

        index
    }

    /// Seals the stream's active chunk and moves it to the sealed list.
    fn seal_active_chunk(&mut self, key: &StreamKey, now: Timestamp) {
        if let Some(mut sealed) = self.active_chunks.remove(key) {
            let final_lsn = self.next_lsn;
            sealed
                .seal(final_lsn, now)
                .expect("active chunk cannot already be sealed");
            debug!(
                entity = %key.0,
                tag = %key.1,
                chunk_id = sealed.meta().chunk_id,
                values = sealed.value_count(),
                "sealed temporal chunk"
            );
            self.sealed_chunks.entry(key.clone()).or_default().push(sealed);
        }
    }

    /// Emits a snapshot for a mutable stream: a Canonical atom tagged
    /// `"<tag>.snapshot"` carrying the current value, under its own LSN.
    /// Snapshots are content-addressed and deduplicate like any other
    /// Canonical atom.
    fn emit_snapshot(&mut self, key: &StreamKey, now: Timestamp) {
        let (snapshot_tag, value, entity) = {
            let state = &self.mutable_states[key];
            (
                format!("{}.snapshot", state.meta().tag),
                state.current_value().clone(),
                state.meta().entity_id,
            )
        };

        let snapshot_id = content_hash(&snapshot_tag, &value);
        let lsn = self.alloc_lsn();
        self.push_ref(entity, snapshot_id, lsn);

        match self.canonical_dedup.entry(snapshot_id) {
            Entry::Occupied(_) => {
                self.dedup_hits += 1;
            }
            Entry::Vacant(slot) => {
                let index = self.atoms.len();
                slot.insert(index);
                self.atoms.push(Atom::new(
                    snapshot_id,
                    AtomClass::Canonical,
                    snapshot_tag,
                    value,
                    now,
                ));
                self.content_index.insert(snapshot_id, index);
                self.canonical_count += 1;
            }
        }

        self.snapshot_count += 1;
        let state = self.mutable_states.get_mut(key).unwrap();
        state.mark_snapshot(lsn, now);
        debug!(entity = %entity, tag = %key.1, lsn, "emitted mutable snapshot");
    }

    /// Allocates the next LSN. The first append gets 1.
    fn alloc_lsn(&mut self) -> Lsn {
        self.next_lsn += 1;
        self.next_lsn
    }

    /// Allocates the next sequential atom id.
    fn alloc_atom_id(&mut self) -> AtomId {
        self.next_atom_id += 1;
        AtomId::from_sequence(self.next_atom_id)
    }

    /// Records a reference on the entity's list and bumps the refcount.
    fn push_ref(&mut self, entity: EntityId, atom_id: AtomId, lsn: Lsn) {
        self.entity_refs
            .entry(entity)
            .or_default()
            .push(EntityRef { atom_id, lsn });
        *self.refcounts.entry(atom_id).or_insert(0) += 1;
        self.total_refs += 1;
    }

    /// Returns the entity's ordered reference list, or `None` for an unknown
    /// entity. O(1), no copy.
    pub fn get_entity_atoms(&self, entity: EntityId) -> Option<&[EntityRef]> {
        self.entity_refs.get(&entity).map(|refs| refs.as_slice())
    }

    /// Looks up a content record by atom id. O(1).
    pub fn get_atom(&self, atom_id: AtomId) -> Option<&Atom> {
        self.content_index.get(&atom_id).map(|&i| &self.atoms[i])
    }

    /// Iterates over every entity with at least one reference.
    pub fn get_all_entities(&self) -> impl Iterator<Item = &EntityId> {
        self.entity_refs.keys()
    }

    /// Returns every content record ever created, in log order.
    pub fn all(&self) -> &[Atom] {
        &self.atoms
    }

    /// Returns the number of references pointing at an atom id.
    pub fn refcount(&self, atom_id: AtomId) -> u32 {
        self.refcounts.get(&atom_id).copied().unwrap_or(0)
    }

    /// Returns store-wide counters and sizes.
    pub fn get_stats(&self) -> StoreStats {
        StoreStats {
            total_atoms: self.atoms.len(),
            canonical_atoms: self.canonical_count,
            unique_canonical_atoms: self.canonical_dedup.len(),
            deduplicated_hits: self.dedup_hits,
            total_entities: self.entity_refs.len(),
            total_references: self.total_refs,
            snapshot_count: self.snapshot_count,
        }
    }

    /// Returns every value of a temporal stream in insertion order.
    pub fn query_temporal_all(&self, entity: EntityId, tag: &str) -> TemporalQuery {
        self.query_temporal_range(entity, tag, 0, u64::MAX)
    }

    /// Returns the values of a temporal stream whose timestamps fall in
    /// `[start_ts, end_ts]` (inclusive both ends).
    ///
    /// Sealed chunks are scanned in chunk-id order, then the active chunk;
    /// insertion order within a chunk is preserved and nothing is re-sorted.
    pub fn query_temporal_range(
        &self,
        entity: EntityId,
        tag: &str,
        start_ts: Timestamp,
        end_ts: Timestamp,
    ) -> TemporalQuery {
        let key: StreamKey = (entity, tag.to_string());
        let mut result = TemporalQuery::default();

        if let Some(sealed) = self.sealed_chunks.get(&key) {
            for chunk in sealed {
                collect_chunk_values(chunk, start_ts, end_ts, &mut result);
            }
        }
        if let Some(active) = self.active_chunks.get(&key) {
            collect_chunk_values(active, start_ts, end_ts, &mut result);
        }

        result.total_count = result.values.len();
        result
    }

    /// Returns the active (unsealed) chunk of a temporal stream, if any.
    pub fn active_chunk(&self, entity: EntityId, tag: &str) -> Option<&TemporalChunk> {
        self.active_chunks.get(&(entity, tag.to_string()))
    }

    /// Returns the sealed chunks of a temporal stream in chunk-id order.
    pub fn sealed_chunks(&self, entity: EntityId, tag: &str) -> &[TemporalChunk] {
        self.sealed_chunks
            .get(&(entity, tag.to_string()))
            .map(|chunks| chunks.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the delta-logged state of a mutable stream, if any.
    pub fn mutable_state(&self, entity: EntityId, tag: &str) -> Option<&MutableState> {
        self.mutable_states.get(&(entity, tag.to_string()))
    }

    /// Drops all state except the configured thresholds.
    fn clear(&mut self) {
        self.atoms.clear();
        self.content_index.clear();
        self.canonical_dedup.clear();
        self.entity_refs.clear();
        self.refcounts.clear();
        self.active_chunks.clear();
        self.sealed_chunks.clear();
        self.next_chunk_ids.clear();
        self.mutable_states.clear();
        self.next_lsn = 0;
        self.next_atom_id = 0;
        self.canonical_count = 0;
        self.dedup_hits = 0;
        self.snapshot_count = 0;
        self.total_refs = 0;
    }
}

/// Appends a chunk's values inside the timestamp window to the result
/// columns.
fn collect_chunk_values(
    chunk: &TemporalChunk,
    start_ts: Timestamp,
    end_ts: Timestamp,
    result: &mut TemporalQuery,
) {
    let timestamps = chunk.timestamps();
    let values = chunk.values();
    let lsns = chunk.lsns();

    for i in 0..timestamps.len() {
        let ts = timestamps[i];
        if ts >= start_ts && ts <= end_ts {
            result.values.push(values[i].clone());
            result.timestamps.push(ts);
            result.lsns.push(lsns[i]);
        }
    }
}

/// Current wall-clock time in microseconds since the Unix epoch.
fn now_micros() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
