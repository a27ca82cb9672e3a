use crate::{
    config::RulesetConfig,
    items::ItemRecord,
    types::{AbilityScore, Weight},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EncumbranceTier {
    #[default]
    Light,
    Medium,
    Heavy,
    Overloaded,
}

impl EncumbranceTier {
    /// Each boundary belongs to the lighter tier.
    pub fn for_load(weight: Weight, capacity: Weight) -> Self {
        let weight = u64::from(*weight);
        let capacity = u64::from(*capacity);

        if weight * 3 <= capacity {
            EncumbranceTier::Light
        } else if weight * 3 <= capacity * 2 {
            EncumbranceTier::Medium
        } else if weight <= capacity {
            EncumbranceTier::Heavy
        } else {
            EncumbranceTier::Overloaded
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Encumbrance {
    pub weight: Weight,
    pub capacity: Weight,
    pub tier: EncumbranceTier,
}

pub fn carry_capacity(strength: AbilityScore, config: &RulesetConfig) -> Weight {
    let strength = (*strength).max(0) as u32;
    Weight::new(strength.saturating_mul(config.carry_capacity_per_strength))
}

pub fn carried_weight(inventory: &[ItemRecord]) -> Weight {
    Weight::new(
        inventory
            .iter()
            .map(ItemRecord::total_weight)
            .fold(0, u32::saturating_add),
    )
}

pub fn compute_encumbrance(
    strength: AbilityScore,
    inventory: &[ItemRecord],
    config: &RulesetConfig,
) -> Encumbrance {
    let weight = carried_weight(inventory);
    let capacity = carry_capacity(strength, config);

    Encumbrance {
        weight,
        capacity,
        tier: EncumbranceTier::for_load(weight, capacity),
    }
}
