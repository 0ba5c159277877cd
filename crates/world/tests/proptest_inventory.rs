//! Property-based tests for inventories
//!
//! Validates:
//! - Per-id counts match what was added
//! - Removal by serial takes exactly that instance
//! - Save data round-trips through JSON without losing instances

use proptest::prelude::*;
use verdant_core::{ItemInfo, ItemSerial, SimTick};
use verdant_world::{Inventory, InventorySave};

const IDS: [&str; 4] = ["wood", "stone", "gem", "feather"];

fn build(picks: &[usize]) -> Inventory {
    let mut inventory = Inventory::new();
    for (serial, &pick) in picks.iter().enumerate() {
        let mut info = ItemInfo::new(IDS[pick], ItemSerial(serial as u64 + 1));
        info.picked_up_at = Some(SimTick(serial as u64));
        inventory.add(info);
    }
    inventory
}

proptest! {
    /// Property: counts per id sum to the number of added instances.
    #[test]
    fn counts_match_additions(picks in prop::collection::vec(0usize..IDS.len(), 0..64)) {
        let inventory = build(&picks);
        for (index, id) in IDS.iter().enumerate() {
            let expected = picks.iter().filter(|&&p| p == index).count();
            prop_assert_eq!(inventory.count(id), expected);
            prop_assert_eq!(inventory.instances(id).len(), expected);
        }
        prop_assert_eq!(inventory.total(), picks.len());
        prop_assert_eq!(inventory.is_empty(), picks.is_empty());
    }

    /// Property: removing by serial removes that instance only.
    #[test]
    fn remove_by_serial(
        picks in prop::collection::vec(0usize..IDS.len(), 1..32),
        victim in any::<prop::sample::Index>(),
    ) {
        let mut inventory = build(&picks);
        let position = victim.index(picks.len());
        let id = IDS[picks[position]];
        let serial = ItemSerial(position as u64 + 1);

        let removed = inventory.remove_instance(id, serial);
        prop_assert_eq!(removed.map(|info| info.serial), Some(serial));
        prop_assert_eq!(inventory.total(), picks.len() - 1);
        prop_assert!(inventory.instances(id).iter().all(|info| info.serial != serial));
        prop_assert!(inventory.remove_instance(id, serial).is_none());
    }

    /// Property: save data survives a JSON round trip.
    #[test]
    fn save_roundtrip(picks in prop::collection::vec(0usize..IDS.len(), 0..48)) {
        let inventory = build(&picks);
        let json = serde_json::to_string(&inventory.data_for_save()).expect("serialize");
        let save: InventorySave = serde_json::from_str(&json).expect("deserialize");
        let restored = Inventory::from_save(save);
        prop_assert_eq!(&restored, &inventory);
        for id in IDS {
            prop_assert_eq!(restored.instances(id), inventory.instances(id));
        }
    }
}
