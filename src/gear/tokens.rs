use std::collections::BTreeSet;

use serde::Serialize;

use super::GearSlot;

/// Raid token price of one upgrade piece for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenCost {
    pub slot: GearSlot,
    pub cost: u32,
}

impl GearSlot {
    pub fn token_cost(self) -> u32 {
        match self {
            GearSlot::Weapon => 500,
            GearSlot::Body | GearSlot::Legs => 825,
            GearSlot::Head | GearSlot::Hands | GearSlot::Feet => 495,
            GearSlot::Ear | GearSlot::Neck | GearSlot::Wrist | GearSlot::Ring => 375,
        }
    }
}

pub fn cost_table() -> Vec<TokenCost> {
    GearSlot::ALL
        .into_iter()
        .map(|slot| TokenCost {
            slot,
            cost: slot.token_cost(),
        })
        .collect()
}

/// Combined price of `selected`; a slot picked twice is counted once.
pub fn total_cost(selected: &[GearSlot]) -> u32 {
    let unique: BTreeSet<GearSlot> = selected.iter().copied().collect();
    unique.into_iter().map(GearSlot::token_cost).sum()
}

/// Tokens still to farm for `selected` given `owned` in hand. Never negative.
pub fn tokens_needed(selected: &[GearSlot], owned: u32) -> u32 {
    total_cost(selected).saturating_sub(owned)
}
