//! Item instance info - the per-copy half of an item.
//!
//! Item *metadata* ([`crate::ItemDef`]) describes what kind of item something
//! is. [`ItemInfo`] describes one rolled copy of it and is the unit stored in
//! inventories and persisted by the save layer.

use serde::{Deserialize, Serialize};

use crate::{SimTick, TagSet};

/// Unique identity of one item instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemSerial(pub u64);

/// One rolled copy of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInfo {
    /// Item definition id.
    pub id: String,
    /// Instance identity used for removal by reference.
    pub serial: ItemSerial,
    /// Rolled tags for this copy.
    #[serde(default)]
    pub tags: TagSet,
    /// Quality tier (0 = normal).
    #[serde(default)]
    pub quality: u8,
    /// Tick at which a player collected this copy.
    #[serde(default)]
    pub picked_up_at: Option<SimTick>,
}

impl ItemInfo {
    /// Create an untagged, normal-quality copy.
    pub fn new(id: impl Into<String>, serial: ItemSerial) -> Self {
        Self {
            id: id.into(),
            serial,
            tags: TagSet::new(),
            quality: 0,
            picked_up_at: None,
        }
    }

    /// Attach rolled tags.
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    /// Set the quality tier.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_info_serialization() {
        let mut tags = TagSet::new();
        tags.insert("shiny");
        let info = ItemInfo::new("apple", ItemSerial(9))
            .with_tags(tags)
            .with_quality(2);

        let json = serde_json::to_string(&info).unwrap();
        let back: ItemInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
        assert!(back.tags.contains("shiny"));
    }

    #[test]
    fn missing_optional_fields_default() {
        let back: ItemInfo = serde_json::from_str(r#"{"id":"wood","serial":3}"#).unwrap();
        assert_eq!(back.quality, 0);
        assert!(back.tags.is_empty());
        assert_eq!(back.picked_up_at, None);
    }
}
