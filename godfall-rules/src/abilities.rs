use std::fmt;

use crate::types::{AbilityModifier, AbilityScore};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Deserialize, serde::Serialize,
)]
pub enum AbilityType {
    #[serde(rename = "str", alias = "strength")]
    Strength,
    #[serde(rename = "dex", alias = "dexterity")]
    Dexterity,
    #[serde(rename = "con", alias = "constitution")]
    Constitution,
    #[serde(rename = "int", alias = "intelligence")]
    Intelligence,
    #[serde(rename = "wis", alias = "wisdom")]
    Wisdom,
    #[serde(rename = "cha", alias = "charisma")]
    Charisma,
}

impl AbilityType {
    pub const ALL: [AbilityType; 6] = [
        AbilityType::Strength,
        AbilityType::Dexterity,
        AbilityType::Constitution,
        AbilityType::Intelligence,
        AbilityType::Wisdom,
        AbilityType::Charisma,
    ];

    /// Short lowercase key, also used as the roll binding name.
    pub fn key(self) -> &'static str {
        match self {
            AbilityType::Strength => "str",
            AbilityType::Dexterity => "dex",
            AbilityType::Constitution => "con",
            AbilityType::Intelligence => "int",
            AbilityType::Wisdom => "wis",
            AbilityType::Charisma => "cha",
        }
    }

    pub fn from_ability_str(string: &str) -> Option<Self> {
        let string = string.trim().to_lowercase();
        match string.as_str() {
            "str" | "strength" => Some(Self::Strength),
            "dex" | "dexterity" => Some(Self::Dexterity),
            "con" | "constitution" => Some(Self::Constitution),
            "int" | "intelligence" => Some(Self::Intelligence),
            "wis" | "wisdom" => Some(Self::Wisdom),
            "cha" | "charisma" => Some(Self::Charisma),
            _ => None,
        }
    }
}

impl fmt::Display for AbilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key().to_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct AbilityScores {
    #[serde(rename = "str")]
    pub strength: AbilityScore,
    #[serde(rename = "dex")]
    pub dexterity: AbilityScore,
    #[serde(rename = "con")]
    pub constitution: AbilityScore,
    #[serde(rename = "int")]
    pub intelligence: AbilityScore,
    #[serde(rename = "wis")]
    pub wisdom: AbilityScore,
    #[serde(rename = "cha")]
    pub charisma: AbilityScore,
}

impl AbilityScores {
    pub fn new(
        strength: i16,
        dexterity: i16,
        constitution: i16,
        intelligence: i16,
        wisdom: i16,
        charisma: i16,
    ) -> Self {
        Self {
            strength: AbilityScore::new(strength),
            dexterity: AbilityScore::new(dexterity),
            constitution: AbilityScore::new(constitution),
            intelligence: AbilityScore::new(intelligence),
            wisdom: AbilityScore::new(wisdom),
            charisma: AbilityScore::new(charisma),
        }
    }

    pub fn get(&self, ability: AbilityType) -> AbilityScore {
        match ability {
            AbilityType::Strength => self.strength,
            AbilityType::Dexterity => self.dexterity,
            AbilityType::Constitution => self.constitution,
            AbilityType::Intelligence => self.intelligence,
            AbilityType::Wisdom => self.wisdom,
            AbilityType::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, ability: AbilityType, score: AbilityScore) {
        match ability {
            AbilityType::Strength => self.strength = score,
            AbilityType::Dexterity => self.dexterity = score,
            AbilityType::Constitution => self.constitution = score,
            AbilityType::Intelligence => self.intelligence = score,
            AbilityType::Wisdom => self.wisdom = score,
            AbilityType::Charisma => self.charisma = score,
        }
    }

    pub fn modifiers(&self) -> AbilityModifiers {
        AbilityModifiers {
            strength: self.strength.modifier(),
            dexterity: self.dexterity.modifier(),
            constitution: self.constitution.modifier(),
            intelligence: self.intelligence.modifier(),
            wisdom: self.wisdom.modifier(),
            charisma: self.charisma.modifier(),
        }
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct AbilityModifiers {
    #[serde(rename = "str")]
    pub strength: AbilityModifier,
    #[serde(rename = "dex")]
    pub dexterity: AbilityModifier,
    #[serde(rename = "con")]
    pub constitution: AbilityModifier,
    #[serde(rename = "int")]
    pub intelligence: AbilityModifier,
    #[serde(rename = "wis")]
    pub wisdom: AbilityModifier,
    #[serde(rename = "cha")]
    pub charisma: AbilityModifier,
}

impl AbilityModifiers {
    pub fn get(&self, ability: AbilityType) -> AbilityModifier {
        match ability {
            AbilityType::Strength => self.strength,
            AbilityType::Dexterity => self.dexterity,
            AbilityType::Constitution => self.constitution,
            AbilityType::Intelligence => self.intelligence,
            AbilityType::Wisdom => self.wisdom,
            AbilityType::Charisma => self.charisma,
        }
    }

    /// Looks a modifier up by its textual key. Unknown keys resolve to a
    /// neutral modifier so a typo in a macro never stops a roll.
    pub fn get_by_key(&self, key: &str) -> AbilityModifier {
        match AbilityType::from_ability_str(key) {
            Some(ability) => self.get(ability),
            None => {
                tracing::warn!(key, "unknown ability reference, using modifier 0");
                AbilityModifier::new(0)
            }
        }
    }
}
