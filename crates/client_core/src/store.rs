use std::collections::HashMap;

use shared::domain::{Item, ItemId};

/// Anything that can be located in an ordered sequence by [`ItemId`].
pub trait Keyed {
    fn key(&self) -> ItemId;
}

impl Keyed for Item {
    fn key(&self) -> ItemId {
        self.id
    }
}

impl Keyed for ItemId {
    fn key(&self) -> ItemId {
        *self
    }
}

/// List-move: removes `source_id` and reinserts it where `target_id` sits,
/// shifting everything in between by one. Returns the input unchanged when the
/// ids are equal or either is absent.
pub fn move_by_ids<T: Keyed + Clone>(seq: &[T], source_id: ItemId, target_id: ItemId) -> Vec<T> {
    if source_id == target_id {
        return seq.to_vec();
    }
    let (Some(from), Some(to)) = (position(seq, source_id), position(seq, target_id)) else {
        return seq.to_vec();
    };

    let mut moved = seq.to_vec();
    let element = moved.remove(from);
    moved.insert(to, element);
    moved
}

fn position<T: Keyed>(seq: &[T], id: ItemId) -> Option<usize> {
    seq.iter().position(|element| element.key() == id)
}

/// The displayed order. Array position is what gets submitted on reorder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedCollectionStore {
    items: Vec<Item>,
}

impl OrderedCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the sequence wholesale. Callers pre-sort by `sort_order`.
    pub fn load(&mut self, items: Vec<Item>) {
        self.items = items;
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, item_id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.get(item_id).is_some()
    }

    /// True when [`move_by_ids`] would leave the sequence untouched.
    pub fn is_noop_move(&self, source_id: ItemId, target_id: ItemId) -> bool {
        source_id == target_id || !self.contains(source_id) || !self.contains(target_id)
    }

    pub fn move_by_ids(&self, source_id: ItemId, target_id: ItemId) -> Vec<Item> {
        move_by_ids(&self.items, source_id, target_id)
    }

    /// Merges a fetch without trusting its `sort_order`: surviving ids keep
    /// their local position with refreshed fields, vanished ids drop out, and
    /// new ids are appended in the order given.
    pub fn reconcile(&mut self, fetched: Vec<Item>) {
        let mut incoming: HashMap<ItemId, Item> =
            fetched.iter().map(|item| (item.id, item.clone())).collect();

        let mut merged: Vec<Item> = self
            .items
            .iter()
            .filter_map(|local| incoming.remove(&local.id))
            .collect();
        merged.extend(
            fetched
                .into_iter()
                .filter(|item| incoming.contains_key(&item.id)),
        );
        self.items = merged;
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
