//! Entity state reconstruction by replaying the reference log.
//!
//! A [`Node`] is a derived view of one entity: the latest value per tag plus
//! the complete reference history. The [`ProjectionEngine`] builds nodes by
//! walking an entity's ordered reference list and resolving each atom
//! through the store's content index.
//!
//! The engine holds a shared borrow of the store for its lifetime, so the
//! store cannot be mutated while a projection is in progress. Nodes own
//! their data and stay valid independently of the store afterwards.

use crate::store::AtomStore;
use crate::types::{AtomId, AtomValue, EntityId, Lsn};
use std::collections::HashMap;

/// Latest-wins slot for one tag.
#[derive(Debug, Clone)]
struct Slot {
    atom_id: AtomId,
    value: AtomValue,
    lsn: Lsn,
}

/// The projected state of a single entity.
#[derive(Debug, Clone)]
pub struct Node {
    entity_id: EntityId,
    latest_by_tag: HashMap<String, Slot>,
    history: Vec<(AtomId, Lsn)>,
}

impl Node {
    /// Creates an empty node for an entity.
    pub fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            latest_by_tag: HashMap::new(),
            history: Vec::new(),
        }
    }

    /// Returns the entity this node represents.
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Applies one atom observation: updates the tag's slot if the LSN beats
    /// the current one and always appends to history.
    pub fn apply(&mut self, atom_id: AtomId, tag: &str, value: &AtomValue, lsn: Lsn) {
        match self.latest_by_tag.get_mut(tag) {
            Some(slot) if lsn <= slot.lsn => {}
            Some(slot) => {
                slot.atom_id = atom_id;
                slot.value = value.clone();
                slot.lsn = lsn;
            }
            None => {
                self.latest_by_tag.insert(
                    tag.to_string(),
                    Slot {
                        atom_id,
                        value: value.clone(),
                        lsn,
                    },
                );
            }
        }
        self.history.push((atom_id, lsn));
    }

    /// Returns the atom id of the latest value for a tag.
    pub fn latest_atom(&self, tag: &str) -> Option<AtomId> {
        self.latest_by_tag.get(tag).map(|slot| slot.atom_id)
    }

    /// Returns the latest value for a tag (the value of the reference with
    /// the largest LSN for that tag).
    pub fn get(&self, tag: &str) -> Option<&AtomValue> {
        self.latest_by_tag.get(tag).map(|slot| &slot.value)
    }

    /// Returns a map of every tag to its latest value.
    pub fn get_all(&self) -> HashMap<String, AtomValue> {
        self.latest_by_tag
            .iter()
            .map(|(tag, slot)| (tag.clone(), slot.value.clone()))
            .collect()
    }

    /// Returns the full history of applied references in LSN order.
    pub fn history(&self) -> &[(AtomId, Lsn)] {
        &self.history
    }
}

/// Rebuilds entity projections from an atom store.
pub struct ProjectionEngine<'a> {
    store: &'a AtomStore,
}

impl<'a> ProjectionEngine<'a> {
    /// Creates an engine over a store. The store is borrowed for the
    /// engine's lifetime.
    pub fn new(store: &'a AtomStore) -> Self {
        Self { store }
    }

    /// Rebuilds the node for one entity by replaying its reference list in
    /// order.
    ///
    /// An unknown entity yields an empty node.
    pub fn rebuild(&self, entity: EntityId) -> Node {
        let mut node = Node::new(entity);
        if let Some(refs) = self.store.get_entity_atoms(entity) {
            for entity_ref in refs {
                if let Some(atom) = self.store.get_atom(entity_ref.atom_id) {
                    node.apply(entity_ref.atom_id, &atom.tag, &atom.value, entity_ref.lsn);
                }
            }
        }
        node
    }

    /// Rebuilds every entity into a map.
    ///
    /// Peak memory is proportional to the total projected state; prefer
    /// [`rebuild_all_streaming`](Self::rebuild_all_streaming) for large
    /// datasets.
    pub fn rebuild_all(&self) -> HashMap<EntityId, Node> {
        let entities: Vec<EntityId> = self.store.get_all_entities().copied().collect();
        let mut nodes = HashMap::with_capacity(entities.len());
        for entity in entities {
            nodes.insert(entity, self.rebuild(entity));
        }
        nodes
    }

    /// Rebuilds every entity, yielding each node to the callback and
    /// dropping it afterwards. Peak memory is bounded by one node.
    pub fn rebuild_all_streaming<F: FnMut(Node)>(&self, mut callback: F) {
        let entities: Vec<EntityId> = self.store.get_all_entities().copied().collect();
        for entity in entities {
            callback(self.rebuild(entity));
        }
    }

    /// Iterates over every entity known to the store.
    pub fn get_all_entities(&self) -> impl Iterator<Item = &EntityId> {
        self.store.get_all_entities()
    }
}
