//! Player inventory.
//!
//! Items are kept per instance, not per count: two copies of the same item can
//! differ in tags and quality, so each id maps to an insertion-ordered list of
//! [`ItemInfo`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use verdant_core::{ItemInfo, ItemSerial};

/// Grouped-by-id multiset of item instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    items: BTreeMap<String, Vec<ItemInfo>>,
}

/// Persisted form of an [`Inventory`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySave {
    pub items: Vec<ItemInfo>,
}

impl Inventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instance to its id's list.
    pub fn add(&mut self, info: ItemInfo) {
        self.items.entry(info.id.clone()).or_default().push(info);
    }

    /// Number of instances held for an id.
    pub fn count(&self, id: &str) -> usize {
        self.items.get(id).map_or(0, Vec::len)
    }

    /// Total instances across all ids.
    pub fn total(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Instances of one id in insertion order.
    pub fn instances(&self, id: &str) -> &[ItemInfo] {
        self.items.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Held ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Remove the instance with the given serial.
    pub fn remove_instance(&mut self, id: &str, serial: ItemSerial) -> Option<ItemInfo> {
        self.remove_first_matching(id, |info| info.serial == serial)
    }

    /// Remove the first instance of `id` accepted by `filter`.
    pub fn remove_first_matching(
        &mut self,
        id: &str,
        filter: impl Fn(&ItemInfo) -> bool,
    ) -> Option<ItemInfo> {
        let list = self.items.get_mut(id)?;
        let index = list.iter().position(filter)?;
        let removed = list.remove(index);
        if list.is_empty() {
            self.items.remove(id);
        }
        Some(removed)
    }

    /// Flatten into a persistable value object, grouped by id.
    pub fn data_for_save(&self) -> InventorySave {
        InventorySave {
            items: self.items.values().flatten().cloned().collect(),
        }
    }

    /// Rebuild from a saved value object.
    pub fn from_save(save: InventorySave) -> Self {
        let mut inventory = Self::new();
        for info in save.items {
            inventory.add(info);
        }
        inventory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str, serial: u64) -> ItemInfo {
        ItemInfo::new(id, ItemSerial(serial))
    }

    #[test]
    fn count_matches_list_length() {
        let mut inventory = Inventory::new();
        inventory.add(info("wood", 1));
        inventory.add(info("wood", 2));
        inventory.add(info("stone", 3));
        assert_eq!(inventory.count("wood"), 2);
        assert_eq!(inventory.instances("wood").len(), 2);
        assert_eq!(inventory.count("gem"), 0);
        assert_eq!(inventory.total(), 3);
    }

    #[test]
    fn remove_by_identity_leaves_others() {
        let mut inventory = Inventory::new();
        for serial in 0..5 {
            inventory.add(info("berries", serial));
        }
        let removed = inventory.remove_instance("berries", ItemSerial(2)).unwrap();
        assert_eq!(removed.serial, ItemSerial(2));
        let left: Vec<u64> = inventory
            .instances("berries")
            .iter()
            .map(|i| i.serial.0)
            .collect();
        assert_eq!(left, vec![0, 1, 3, 4]);
        assert!(inventory.remove_instance("berries", ItemSerial(2)).is_none());
    }

    #[test]
    fn remove_first_matching_uses_insertion_order() {
        let mut inventory = Inventory::new();
        inventory.add(info("gem", 1).with_quality(2));
        inventory.add(info("gem", 2).with_quality(2));
        let removed = inventory
            .remove_first_matching("gem", |i| i.quality == 2)
            .unwrap();
        assert_eq!(removed.serial, ItemSerial(1));
    }

    #[test]
    fn empty_lists_are_dropped() {
        let mut inventory = Inventory::new();
        inventory.add(info("wood", 1));
        inventory.remove_instance("wood", ItemSerial(1));
        assert!(inventory.is_empty());
        assert_eq!(inventory.ids().count(), 0);
    }

    #[test]
    fn save_roundtrip_keeps_instances() {
        let mut inventory = Inventory::new();
        inventory.add(info("wood", 1).with_quality(1));
        inventory.add(info("stone", 2));
        inventory.add(info("wood", 3));

        let save = inventory.data_for_save();
        assert_eq!(save.items.len(), 3);
        let json = serde_json::to_string(&save).unwrap();
        let restored = Inventory::from_save(serde_json::from_str(&json).unwrap());
        assert_eq!(restored, inventory);
    }
}
