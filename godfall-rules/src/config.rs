//! Immutable ruleset configuration.
//!
//! Loaded once by the host adapter and handed to every rules function that
//! needs it. Every field has a default, so an empty configuration source
//! yields the canonical ruleset.

use serde::{Deserialize, Serialize};

/// How warriors gain bonus hit points with level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HpProgression {
    /// `2 × max(level − 1, 0)`.
    #[default]
    Incremental,
    /// `1 × level`.
    Flat,
}

/// Whose modifier table resolves the ability terms of a save DC.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveDcSource {
    #[default]
    Defender,
    Caster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Difficulties {
    pub easy: i32,
    pub moderate: i32,
    pub hard: i32,
    pub extreme: i32,
}

impl Default for Difficulties {
    fn default() -> Self {
        Self {
            easy: 10,
            moderate: 15,
            hard: 20,
            extreme: 25,
        }
    }
}

impl Difficulties {
    pub fn from_name(&self, name: &str) -> Option<i32> {
        match name.trim().to_lowercase().as_str() {
            "easy" => Some(self.easy),
            "moderate" => Some(self.moderate),
            "hard" => Some(self.hard),
            "extreme" => Some(self.extreme),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesetConfig {
    pub hp_progression: HpProgression,
    pub carry_capacity_per_strength: u32,
    pub default_save_dc: i32,
    pub save_dc_source: SaveDcSource,
    pub critical_on_natural_max: bool,
    pub fumble_on_natural_one: bool,
    pub difficulties: Difficulties,
}

impl Default for RulesetConfig {
    fn default() -> Self {
        Self {
            hp_progression: HpProgression::default(),
            carry_capacity_per_strength: 10,
            default_save_dc: 10,
            save_dc_source: SaveDcSource::default(),
            critical_on_natural_max: true,
            fumble_on_natural_one: true,
            difficulties: Difficulties::default(),
        }
    }
}
