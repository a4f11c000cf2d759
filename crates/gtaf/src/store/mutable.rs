//! Delta-logged state for mutable atom streams.
//!
//! A mutable stream keyed by `(entity, tag)` keeps one stable atom id, the
//! current value, and an ordered buffer of deltas since the last snapshot.
//! Old values are kept in each delta so history between snapshots can be
//! reconstructed.

use crate::types::{AtomId, AtomValue, EntityId, Lsn, Timestamp};

/// A single logged mutation of a mutable atom.
#[derive(Debug, Clone, PartialEq)]
pub struct MutableDelta {
    /// LSN at which the mutation was applied.
    pub lsn: Lsn,
    /// Wall-clock time of the mutation.
    pub timestamp: Timestamp,
    /// Value before the mutation.
    pub old_value: AtomValue,
    /// Value after the mutation.
    pub new_value: AtomValue,
}

/// Identity and snapshot bookkeeping for one mutable stream.
#[derive(Debug, Clone, PartialEq)]
pub struct MutableStateMeta {
    /// Stable identifier, chosen once at creation and reused across
    /// mutations.
    pub atom_id: AtomId,
    /// Entity that owns this stream.
    pub entity_id: EntityId,
    /// Property name (e.g., `"login_count"`).
    pub tag: String,
    /// LSN at which the stream was created.
    pub created_lsn: Lsn,
    /// LSN of the last emitted snapshot; 0 if none yet.
    pub last_snapshot_lsn: Lsn,
    /// Time of the last emitted snapshot; 0 if none yet.
    pub last_snapshot_time: Timestamp,
    /// Mutations applied since the last snapshot.
    pub delta_count_since_snapshot: u32,
}

/// Current value plus delta log for one mutable stream.
///
/// The delta buffer is bounded only by the snapshot threshold: after a
/// snapshot it is cleared, so at rest it holds at most `threshold - 1`
/// entries.
#[derive(Debug, Clone)]
pub struct MutableState {
    meta: MutableStateMeta,
    current: AtomValue,
    deltas: Vec<MutableDelta>,
}

impl MutableState {
    /// Creates the state for a new mutable stream.
    pub fn new(
        atom_id: AtomId,
        entity_id: EntityId,
        tag: String,
        initial_value: AtomValue,
        created_lsn: Lsn,
    ) -> Self {
        Self {
            meta: MutableStateMeta {
                atom_id,
                entity_id,
                tag,
                created_lsn,
                last_snapshot_lsn: 0,
                last_snapshot_time: 0,
                delta_count_since_snapshot: 0,
            },
            current: initial_value,
            deltas: Vec::new(),
        }
    }

    /// Applies a mutation, logging the delta with the previous value.
    pub fn mutate(&mut self, new_value: AtomValue, lsn: Lsn, timestamp: Timestamp) {
        let old_value = std::mem::replace(&mut self.current, new_value.clone());
        self.deltas.push(MutableDelta {
            lsn,
            timestamp,
            old_value,
            new_value,
        });
        self.meta.delta_count_since_snapshot += 1;
    }

    /// Returns true if the delta count has reached the snapshot threshold.
    pub fn should_snapshot(&self, delta_threshold: u32) -> bool {
        self.meta.delta_count_since_snapshot >= delta_threshold
    }

    /// Records an emitted snapshot: updates snapshot metadata, clears the
    /// delta buffer, and resets the counter.
    pub fn mark_snapshot(&mut self, lsn: Lsn, timestamp: Timestamp) {
        self.meta.last_snapshot_lsn = lsn;
        self.meta.last_snapshot_time = timestamp;
        self.meta.delta_count_since_snapshot = 0;
        self.deltas.clear();
    }

    /// Returns the current value.
    pub fn current_value(&self) -> &AtomValue {
        &self.current
    }

    /// Returns the stream metadata.
    pub fn meta(&self) -> &MutableStateMeta {
        &self.meta
    }

    /// Returns the deltas logged since the last snapshot (or creation).
    pub fn deltas(&self) -> &[MutableDelta] {
        &self.deltas
    }

    /// Returns the number of deltas since the last snapshot.
    pub fn delta_count(&self) -> u32 {
        self.meta.delta_count_since_snapshot
    }
}
