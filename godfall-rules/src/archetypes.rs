use crate::{
    abilities::AbilityModifiers,
    config::HpProgression,
    types::{AbilityModifier, HitPoints, Level},
};

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Archetype {
    Warrior,
    Rogue,
    Spellcaster,
    #[serde(alias = "spirit")]
    SpiritTouched,
    #[default]
    None,
}

impl Archetype {
    pub fn from_archetype_str(string: &str) -> Option<Self> {
        let string = string.trim().to_lowercase();
        match string.as_str() {
            "warrior" => Some(Self::Warrior),
            "rogue" => Some(Self::Rogue),
            "spellcaster" => Some(Self::Spellcaster),
            "spirit-touched" | "spirit_touched" | "spirit" => Some(Self::SpiritTouched),
            "none" | "" => Some(Self::None),
            _ => None,
        }
    }

    /// Saturates at `i16::MAX` for very high levels.
    pub fn hit_point_bonus(self, level: Level, progression: HpProgression) -> HitPoints {
        let level = i32::from(*level.normalized());
        let bonus = match (self, progression) {
            (Archetype::Warrior, HpProgression::Incremental) => 2 * (level - 1),
            (Archetype::Warrior, HpProgression::Flat) => level,
            _ => 0,
        };

        HitPoints::new(i16::try_from(bonus).unwrap_or(i16::MAX))
    }

    /// Modifier feeding maximum willpower.
    pub fn willpower_modifier(self, modifiers: &AbilityModifiers) -> AbilityModifier {
        match self {
            Archetype::Spellcaster | Archetype::SpiritTouched => {
                modifiers.wisdom.max(modifiers.intelligence)
            }
            _ => modifiers.wisdom,
        }
    }
}
