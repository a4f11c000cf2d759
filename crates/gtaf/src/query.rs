//! Lazily-built string indexes for filter queries.
//!
//! A [`QueryIndex`] maps, per indexed tag, each entity to the latest string
//! value of that tag. Indexes hold only the indexed field values, never full
//! nodes, which keeps filtering cheap on stores far larger than memory would
//! allow for a full projection.
//!
//! Two build paths exist and produce identical indexes for the same store
//! state:
//!
//! - the **direct** path scans the store's reference lists, tracking the
//!   largest-LSN value per requested tag;
//! - the **fallback** path streams node rebuilds through the projection
//!   engine and asks each node for its latest value.
//!
//! In both paths an entry is emitted only when the latest value is a string;
//! non-string values are silently omitted.

use crate::projection::ProjectionEngine;
use crate::store::AtomStore;
use crate::types::{Atom, AtomValue, EntityId, Lsn};
use std::collections::{HashMap, HashSet};

/// Where an index build reads its data from.
#[derive(Clone, Copy)]
enum IndexSource<'a> {
    /// Direct store scan (faster: no node allocation, no history tracking).
    Direct(&'a AtomStore),
    /// Streaming node rebuilds through the projection engine.
    Projection(&'a ProjectionEngine<'a>),
}

/// Statistics about the built indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexStats {
    /// Number of indexed tags.
    pub num_indexed_tags: usize,
    /// Largest per-tag entity count.
    pub num_indexed_entities: usize,
    /// Entries across all tag indexes.
    pub total_entries: usize,
}

/// Per-tag entity-to-string indexes over an atom store.
pub struct QueryIndex<'a> {
    source: IndexSource<'a>,
    /// tag -> (entity -> latest string value)
    string_indexes: HashMap<String, HashMap<EntityId, String>>,
}

impl<'a> QueryIndex<'a> {
    /// Creates an index that builds by scanning the store directly.
    pub fn from_store(store: &'a AtomStore) -> Self {
        Self {
            source: IndexSource::Direct(store),
            string_indexes: HashMap::new(),
        }
    }

    /// Creates an index that builds through the projection engine.
    pub fn from_projection(engine: &'a ProjectionEngine<'a>) -> Self {
        Self {
            source: IndexSource::Projection(engine),
            string_indexes: HashMap::new(),
        }
    }

    /// Builds the index for one tag. Returns the number of entities indexed.
    pub fn build_index(&mut self, tag: &str) -> usize {
        self.build_indexes(&[tag])
    }

    /// Builds indexes for several tags in a single pass. Returns the total
    /// number of index entries created.
    ///
    /// Rebuilding an already-indexed tag fully replaces its prior contents.
    pub fn build_indexes(&mut self, tags: &[&str]) -> usize {
        for &tag in tags {
            self.string_indexes.insert(tag.to_string(), HashMap::new());
        }

        match self.source {
            IndexSource::Direct(store) => self.build_direct(store, tags),
            IndexSource::Projection(engine) => self.build_from_projection(engine, tags),
        }
    }

    /// Single scan over the reference lists: for each entity and requested
    /// tag, keep the atom behind the largest-LSN reference, then emit the
    /// entry if that latest value is a string. Tracking the latest value of
    /// any type (rather than the latest *string*) is what keeps this path
    /// identical to the projection path on mixed-type tags.
    fn build_direct(&mut self, store: &'a AtomStore, tags: &[&str]) -> usize {
        let tag_set: HashSet<&str> = tags.iter().copied().collect();
        let entities: Vec<EntityId> = store.get_all_entities().copied().collect();
        let mut entries = 0usize;

        for entity in entities {
            let mut latest: HashMap<&str, (Lsn, &Atom)> = HashMap::new();
            if let Some(refs) = store.get_entity_atoms(entity) {
                for entity_ref in refs {
                    let Some(atom) = store.get_atom(entity_ref.atom_id) else {
                        continue;
                    };
                    let Some(&tag_key) = tag_set.get(atom.tag.as_str()) else {
                        continue;
                    };
                    match latest.get_mut(tag_key) {
                        Some(slot) if entity_ref.lsn <= slot.0 => {}
                        Some(slot) => *slot = (entity_ref.lsn, atom),
                        None => {
                            latest.insert(tag_key, (entity_ref.lsn, atom));
                        }
                    }
                }
            }

            for (tag_key, (_, atom)) in latest {
                if let Some(text) = atom.value.as_str() {
                    self.string_indexes
                        .get_mut(tag_key)
                        .unwrap()
                        .insert(entity, text.to_string());
                    entries += 1;
                }
            }
        }

        entries
    }

    /// Streaming fallback: one node rebuild per entity, asking each node for
    /// its latest value per tag.
    fn build_from_projection(&mut self, engine: &'a ProjectionEngine<'a>, tags: &[&str]) -> usize {
        let mut entries = 0usize;
        let string_indexes = &mut self.string_indexes;

        engine.rebuild_all_streaming(|node| {
            for &tag in tags {
                if let Some(AtomValue::Text(text)) = node.get(tag) {
                    string_indexes
                        .get_mut(tag)
                        .unwrap()
                        .insert(node.entity_id(), text.clone());
                    entries += 1;
                }
            }
        });

        entries
    }

    /// Returns entities whose indexed string equals `value` exactly
    /// (case-sensitive). An unindexed tag yields no results.
    pub fn find_equals(&self, tag: &str, value: &str) -> Vec<EntityId> {
        let Some(index) = self.string_indexes.get(tag) else {
            return Vec::new();
        };
        index
            .iter()
            .filter(|(_, indexed)| indexed.as_str() == value)
            .map(|(&entity, _)| entity)
            .collect()
    }

    /// Returns entities whose indexed string contains `substring`,
    /// ASCII case-insensitive (both sides are byte-wise upper-cased;
    /// Unicode casing is not attempted).
    pub fn find_contains(&self, tag: &str, substring: &str) -> Vec<EntityId> {
        let Some(index) = self.string_indexes.get(tag) else {
            return Vec::new();
        };
        let needle = substring.to_ascii_uppercase();
        index
            .iter()
            .filter(|(_, indexed)| indexed.to_ascii_uppercase().contains(&needle))
            .map(|(&entity, _)| entity)
            .collect()
    }

    /// Returns entities whose indexed string parses as a signed decimal
    /// integer satisfying `predicate`. Parse failures are silently skipped.
    pub fn find_int_where<F: Fn(i64) -> bool>(&self, tag: &str, predicate: F) -> Vec<EntityId> {
        let Some(index) = self.string_indexes.get(tag) else {
            return Vec::new();
        };
        index
            .iter()
            .filter_map(|(&entity, indexed)| {
                indexed
                    .parse::<i64>()
                    .ok()
                    .filter(|&value| predicate(value))
                    .map(|_| entity)
            })
            .collect()
    }

    /// Returns the indexed string value for an entity.
    pub fn get_string(&self, tag: &str, entity: EntityId) -> Option<&str> {
        self.string_indexes
            .get(tag)?
            .get(&entity)
            .map(String::as_str)
    }

    /// Returns true if the tag has been indexed.
    pub fn is_indexed(&self, tag: &str) -> bool {
        self.string_indexes.contains_key(tag)
    }

    /// Returns statistics over the built indexes.
    pub fn get_stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            num_indexed_tags: self.string_indexes.len(),
            ..Default::default()
        };
        for index in self.string_indexes.values() {
            stats.total_entries += index.len();
            stats.num_indexed_entities = stats.num_indexed_entities.max(index.len());
        }
        stats
    }
}
