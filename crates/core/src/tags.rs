//! Rolled tag sets for items and mobs.
//!
//! A definition lists one or more [`TagSlot`]s. Each slot rolls `picks` tags
//! from its weighted choices without replacement. Weights are relative
//! multipliers: a choice with weight 3 is three times as likely as a choice
//! with weight 1.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single weighted tag candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagChoice {
    /// Tag name (e.g. "large", "golden").
    pub tag: String,
    /// Relative weight; zero-weight choices are never picked.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// One roll slot of a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSlot {
    /// Candidate tags.
    pub choices: Vec<TagChoice>,
    /// How many distinct tags to draw from this slot.
    #[serde(default = "default_picks")]
    pub picks: usize,
}

fn default_picks() -> usize {
    1
}

impl TagSlot {
    /// Draw `picks` distinct tags, weighted, without replacement.
    ///
    /// Stops early when the remaining choices carry no weight.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<String> {
        let mut remaining: Vec<&TagChoice> =
            self.choices.iter().filter(|c| c.weight > 0).collect();
        let mut picked = Vec::with_capacity(self.picks);

        while picked.len() < self.picks && !remaining.is_empty() {
            let total: u64 = remaining.iter().map(|c| c.weight as u64).sum();
            let mut roll = rng.gen_range(0..total);
            let mut index = 0;
            for (i, choice) in remaining.iter().enumerate() {
                let weight = choice.weight as u64;
                if roll < weight {
                    index = i;
                    break;
                }
                roll -= weight;
            }
            picked.push(remaining.swap_remove(index).tag.clone());
        }

        picked
    }
}

/// The rolled tags of one item or mob instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    tags: BTreeSet<String>,
}

impl TagSet {
    /// Create an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll every slot of a definition.
    pub fn roll<R: Rng + ?Sized>(slots: &[TagSlot], rng: &mut R) -> Self {
        let mut set = Self::new();
        for slot in slots {
            for tag in slot.roll(rng) {
                set.insert(tag);
            }
        }
        set
    }

    /// Add a tag; returns false if it was already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    /// Check for a tag.
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Iterate tags in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns true when no tags were rolled.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FromIterator<String> for TagSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn slot(choices: &[(&str, u32)], picks: usize) -> TagSlot {
        TagSlot {
            choices: choices
                .iter()
                .map(|(tag, weight)| TagChoice {
                    tag: tag.to_string(),
                    weight: *weight,
                })
                .collect(),
            picks,
        }
    }

    #[test]
    fn roll_without_replacement_never_repeats() {
        let mut rng = StdRng::seed_from_u64(1);
        let slot = slot(&[("a", 1), ("b", 5), ("c", 2)], 3);
        for _ in 0..100 {
            let mut picked = slot.roll(&mut rng);
            picked.sort();
            assert_eq!(picked, vec!["a", "b", "c"]);
        }
    }

    #[test]
    fn picks_stop_when_choices_run_out() {
        let mut rng = StdRng::seed_from_u64(2);
        let slot = slot(&[("a", 1), ("never", 0)], 4);
        assert_eq!(slot.roll(&mut rng), vec!["a".to_string()]);
    }

    #[test]
    fn weight_is_a_relative_multiplier() {
        let mut rng = StdRng::seed_from_u64(3);
        let slot = slot(&[("common", 3), ("rare", 1)], 1);
        let mut common = 0;
        let trials = 20_000;
        for _ in 0..trials {
            if slot.roll(&mut rng)[0] == "common" {
                common += 1;
            }
        }
        let ratio = common as f64 / trials as f64;
        assert!((ratio - 0.75).abs() < 0.02, "ratio {ratio}");
    }

    #[test]
    fn tag_set_rolls_all_slots() {
        let mut rng = StdRng::seed_from_u64(4);
        let slots = vec![slot(&[("big", 1)], 1), slot(&[("red", 1)], 1)];
        let set = TagSet::roll(&slots, &mut rng);
        assert!(set.contains("big"));
        assert!(set.contains("red"));
        assert_eq!(set.len(), 2);
    }
}
