use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod tokens;

pub use self::tokens::{TokenCost, cost_table, tokens_needed, total_cost};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GearError {
    #[error("unknown gear slot: {0}")]
    UnknownSlot(String),
    #[error("raid tier out of range: {0}")]
    TierOutOfRange(u8),
}

/// The ten equipment slots tracked per member. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GearSlot {
    Weapon,
    Head,
    Body,
    Hands,
    Legs,
    Feet,
    Ear,
    Neck,
    Wrist,
    Ring,
}

impl GearSlot {
    pub const ALL: [GearSlot; 10] = [
        GearSlot::Weapon,
        GearSlot::Head,
        GearSlot::Body,
        GearSlot::Hands,
        GearSlot::Legs,
        GearSlot::Feet,
        GearSlot::Ear,
        GearSlot::Neck,
        GearSlot::Wrist,
        GearSlot::Ring,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GearSlot::Weapon => "weapon",
            GearSlot::Head => "head",
            GearSlot::Body => "body",
            GearSlot::Hands => "hands",
            GearSlot::Legs => "legs",
            GearSlot::Feet => "feet",
            GearSlot::Ear => "ear",
            GearSlot::Neck => "neck",
            GearSlot::Wrist => "wrist",
            GearSlot::Ring => "ring",
        }
    }

    /// The raid tier whose loot covers this slot. This table is the single
    /// source of truth for slot/tier relationships.
    pub fn tier(self) -> RaidTier {
        match self {
            GearSlot::Ear | GearSlot::Neck | GearSlot::Wrist | GearSlot::Ring => RaidTier(1),
            GearSlot::Head | GearSlot::Hands | GearSlot::Feet => RaidTier(2),
            GearSlot::Body | GearSlot::Legs => RaidTier(3),
            GearSlot::Weapon => RaidTier(4),
        }
    }
}

impl fmt::Display for GearSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GearSlot {
    type Err = GearError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        GearSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| GearError::UnknownSlot(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RaidTier(u8);

impl RaidTier {
    pub const MAX: u8 = 4;
    pub const ALL: [RaidTier; 4] = [RaidTier(1), RaidTier(2), RaidTier(3), RaidTier(4)];

    pub fn new(number: u8) -> Result<Self, GearError> {
        if (1..=Self::MAX).contains(&number) {
            Ok(Self(number))
        } else {
            Err(GearError::TierOutOfRange(number))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Slots that must be owned before this tier stops showing up as needed.
    pub fn required_slots(self) -> Vec<GearSlot> {
        GearSlot::ALL
            .into_iter()
            .filter(|slot| slot.tier() == self)
            .collect()
    }
}

impl TryFrom<u8> for RaidTier {
    type Error = GearError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        RaidTier::new(value)
    }
}

impl From<RaidTier> for u8 {
    fn from(tier: RaidTier) -> Self {
        tier.0
    }
}

impl fmt::Display for RaidTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ownership flags keyed by slot. Absent keys read as "not owned".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GearSet(BTreeMap<GearSlot, bool>);

impl GearSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fully_equipped() -> Self {
        GearSlot::ALL.into_iter().map(|slot| (slot, true)).collect()
    }

    pub fn owns(&self, slot: GearSlot) -> bool {
        self.0.get(&slot).copied().unwrap_or(false)
    }

    pub fn set(&mut self, slot: GearSlot, owned: bool) {
        self.0.insert(slot, owned);
    }

    /// Flips one slot and returns the new value.
    pub fn toggle(&mut self, slot: GearSlot) -> bool {
        let next = !self.owns(slot);
        self.0.insert(slot, next);
        next
    }

    /// Every slot with an explicit value, missing ones filled as `false`.
    pub fn normalized(&self) -> Self {
        GearSlot::ALL
            .into_iter()
            .map(|slot| (slot, self.owns(slot)))
            .collect()
    }

    pub fn missing_slots(&self) -> Vec<GearSlot> {
        GearSlot::ALL
            .into_iter()
            .filter(|slot| !self.owns(*slot))
            .collect()
    }
}

impl FromIterator<(GearSlot, bool)> for GearSet {
    fn from_iter<I: IntoIterator<Item = (GearSlot, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-member gear snapshot as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearStatus {
    pub member_id: i64,
    #[serde(default)]
    pub opt_in: bool,
    #[serde(default)]
    pub gear: GearSet,
}

impl GearStatus {
    pub fn empty(member_id: i64) -> Self {
        Self {
            member_id,
            opt_in: false,
            gear: GearSet::new(),
        }
    }

    pub fn toggle(&mut self, slot: GearSlot) -> bool {
        self.gear.toggle(slot)
    }

    pub fn toggle_opt_in(&mut self) -> bool {
        self.opt_in = !self.opt_in;
        self.opt_in
    }

    pub fn needed_tiers(&self) -> Vec<RaidTier> {
        needed_tiers(&self.gear)
    }
}

/// Tiers that still have at least one unowned slot, ascending and deduplicated.
/// A fully equipped set yields an empty list.
pub fn needed_tiers(gear: &GearSet) -> Vec<RaidTier> {
    gear.missing_slots()
        .into_iter()
        .map(GearSlot::tier)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Highest tier `T` such that every tier up to `T` has nothing missing.
/// Returns 0 when tier 1 still has gaps.
pub fn highest_cleared_tier(gear: &GearSet) -> u8 {
    let needed = needed_tiers(gear);
    match needed.first() {
        Some(lowest) => lowest.number() - 1,
        None => RaidTier::MAX,
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn all_owned_except(missing: &[GearSlot]) -> GearSet {
        GearSlot::ALL
            .into_iter()
            .map(|slot| (slot, !missing.contains(&slot)))
            .collect()
    }

    fn numbers(tiers: &[RaidTier]) -> Vec<u8> {
        tiers.iter().map(|t| t.number()).collect()
    }

    #[test]
    fn fully_equipped_needs_nothing() {
        assert!(needed_tiers(&GearSet::fully_equipped()).is_empty());
        assert_eq!(highest_cleared_tier(&GearSet::fully_equipped()), 4);
    }

    #[test_case(GearSlot::Ear ; "ear")]
    #[test_case(GearSlot::Neck ; "neck")]
    #[test_case(GearSlot::Wrist ; "wrist")]
    #[test_case(GearSlot::Ring ; "ring")]
    fn single_missing_accessory_needs_tier_one(slot: GearSlot) {
        let gear = all_owned_except(&[slot]);
        assert_eq!(numbers(&needed_tiers(&gear)), vec![1]);
    }

    #[test]
    fn missing_weapon_needs_tier_four() {
        let gear = all_owned_except(&[GearSlot::Weapon]);
        assert_eq!(numbers(&needed_tiers(&gear)), vec![4]);
        assert_eq!(highest_cleared_tier(&gear), 3);
    }

    #[test]
    fn empty_set_counts_every_slot_as_missing() {
        assert_eq!(numbers(&needed_tiers(&GearSet::new())), vec![1, 2, 3, 4]);
        assert_eq!(highest_cleared_tier(&GearSet::new()), 0);
    }

    #[test]
    fn tiers_are_sorted_and_deduplicated() {
        let gear = all_owned_except(&[GearSlot::Legs, GearSlot::Body, GearSlot::Ring, GearSlot::Neck]);
        assert_eq!(numbers(&needed_tiers(&gear)), vec![1, 3]);
    }

    #[test]
    fn required_slots_follow_slot_tiers() {
        assert_eq!(
            RaidTier::ALL[0].required_slots(),
            vec![GearSlot::Ear, GearSlot::Neck, GearSlot::Wrist, GearSlot::Ring]
        );
        assert_eq!(
            RaidTier::ALL[1].required_slots(),
            vec![GearSlot::Head, GearSlot::Hands, GearSlot::Feet]
        );
        assert_eq!(
            RaidTier::ALL[2].required_slots(),
            vec![GearSlot::Body, GearSlot::Legs]
        );
        assert_eq!(RaidTier::ALL[3].required_slots(), vec![GearSlot::Weapon]);
    }

    #[test]
    fn partial_json_snapshot_treats_absent_slots_as_unowned() {
        let status: GearStatus = serde_json::from_str(
            r#"{"member_id":7,"opt_in":true,"gear":{"weapon":true,"head":true}}"#,
        )
        .expect("parse status");

        assert!(status.opt_in);
        assert!(status.gear.owns(GearSlot::Weapon));
        assert!(!status.gear.owns(GearSlot::Ring));
        assert_eq!(numbers(&status.needed_tiers()), vec![1, 2, 3]);
    }

    #[test]
    fn unknown_slot_names_are_rejected() {
        assert_eq!(
            "cape".parse::<GearSlot>(),
            Err(GearError::UnknownSlot("cape".to_string()))
        );
        assert_eq!("Weapon".parse::<GearSlot>(), Ok(GearSlot::Weapon));
        assert!(serde_json::from_str::<GearSet>(r#"{"cape":true}"#).is_err());
    }

    #[test]
    fn toggling_flips_slot_and_opt_in() {
        let mut status = GearStatus::empty(1);
        assert!(status.toggle(GearSlot::Head));
        assert!(!status.toggle(GearSlot::Head));
        assert!(status.toggle_opt_in());
        assert!(!status.toggle_opt_in());
    }

    #[test]
    fn raid_tier_rejects_out_of_range_numbers() {
        assert_eq!(RaidTier::new(0), Err(GearError::TierOutOfRange(0)));
        assert_eq!(RaidTier::new(5), Err(GearError::TierOutOfRange(5)));
        assert_eq!(serde_json::to_string(&RaidTier::ALL).unwrap(), "[1,2,3,4]");
    }
}
