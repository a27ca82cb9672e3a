use thiserror::Error;

use crate::{
    abilities::AbilityType,
    types::{DamageReduction, DefenseValue, EvasionPenalty, Hardness, HitPoints, Quantity, Weight},
};

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct WeaponData {
    pub damage: String,
    #[serde(default)]
    pub versatile: bool,
    #[serde(default)]
    pub versatile_damage: Option<String>,
    #[serde(default)]
    pub two_handed: bool,
    #[serde(default = "default_weapon_attribute")]
    pub attribute: AbilityType,
    #[serde(default)]
    pub weapon_skill: Option<String>,
    #[serde(default)]
    pub properties: Vec<String>,
}

fn default_weapon_attribute() -> AbilityType {
    AbilityType::Strength
}

impl WeaponData {
    pub fn is_finesse(&self) -> bool {
        self.properties
            .iter()
            .any(|property| property.to_lowercase().contains("finesse"))
    }

    /// Damage formula for the current grip.
    pub fn damage_formula(&self) -> &str {
        match (&self.versatile_damage, self.versatile && self.two_handed) {
            (Some(versatile_damage), true) => versatile_damage,
            _ => &self.damage,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ArmorData {
    #[serde(default)]
    pub damage_reduction: DamageReduction,
    #[serde(default)]
    pub evasion_penalty: EvasionPenalty,
    #[serde(default)]
    pub defense: DefenseValue,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ShieldData {
    #[serde(default)]
    pub defense: DefenseValue,
    #[serde(default)]
    pub hardness: Hardness,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct SpellData {
    #[serde(default = "default_spell_attribute")]
    pub attack_attribute: AbilityType,
    #[serde(default)]
    pub damage: Option<String>,
    #[serde(default)]
    pub save: Option<String>,
    #[serde(default)]
    pub willpower_cost: i16,
    #[serde(default)]
    pub tradition: Option<String>,
}

fn default_spell_attribute() -> AbilityType {
    AbilityType::Intelligence
}

impl Default for SpellData {
    fn default() -> Self {
        Self {
            attack_attribute: default_spell_attribute(),
            damage: None,
            save: None,
            willpower_cost: 0,
            tradition: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ItemKind {
    Weapon(WeaponData),
    Armor(ArmorData),
    Shield(ShieldData),
    Gear,
    Talent,
    Background,
    Spell(SpellData),
    SpiritAbility(SpellData),
}

impl ItemKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ItemKind::Weapon(_) => "weapon",
            ItemKind::Armor(_) => "armor",
            ItemKind::Shield(_) => "shield",
            ItemKind::Gear => "gear",
            ItemKind::Talent => "talent",
            ItemKind::Background => "background",
            ItemKind::Spell(_) => "spell",
            ItemKind::SpiritAbility(_) => "spiritAbility",
        }
    }

    pub fn is_equippable(&self) -> bool {
        matches!(
            self,
            ItemKind::Weapon(_) | ItemKind::Armor(_) | ItemKind::Shield(_)
        )
    }

    /// Weapons, armor and shields can take damage.
    pub fn has_durability(&self) -> bool {
        self.is_equippable()
    }

    pub fn spell(&self) -> Option<&SpellData> {
        match self {
            ItemKind::Spell(spell) | ItemKind::SpiritAbility(spell) => Some(spell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Durability {
    pub current: HitPoints,
    pub max: HitPoints,
}

impl Durability {
    pub fn new(max: HitPoints) -> Self {
        let max = max.max(HitPoints::new(0));
        Self { current: max, max }
    }

    fn clamped(self) -> Self {
        let max = self.max.max(HitPoints::new(0));
        Self {
            current: self.current.clamp(HitPoints::new(0), max),
            max,
        }
    }

    pub fn is_broken(&self) -> bool {
        *self.current == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ItemRecord {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub kind: ItemKind,
    #[serde(default)]
    pub equipped: bool,
    #[serde(default)]
    pub weight: Weight,
    #[serde(default = "default_quantity")]
    pub quantity: Quantity,
    #[serde(default)]
    pub durability: Option<Durability>,
}

fn default_quantity() -> Quantity {
    Quantity::new(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityChange {
    Intact(Durability),
    Broken(Durability),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ItemValidationError {
    #[error("Only weapons, armor and shields can be equipped")]
    NotEquippable,

    #[error("Item has no durability")]
    NoDurability,

    #[error("Armor evasion penalty must not be positive")]
    PositiveEvasionPenalty,

    #[error("Willpower cost must not be negative")]
    NegativeWillpowerCost,

    #[error("Item name must not be empty")]
    EmptyName,
}

impl ItemRecord {
    pub fn new(id: i64, name: &str, kind: ItemKind) -> Self {
        Self {
            id,
            name: name.to_owned(),
            kind,
            equipped: false,
            weight: Weight::new(0),
            quantity: default_quantity(),
            durability: None,
        }
    }

    pub fn with_weight(mut self, weight: u32, quantity: u32) -> Self {
        self.weight = Weight::new(weight);
        self.quantity = Quantity::new(quantity);
        self
    }

    pub fn with_durability(mut self, max: i16) -> Self {
        self.durability = Some(Durability::new(HitPoints::new(max)));
        self
    }

    pub fn equipped(mut self) -> Self {
        self.equipped = true;
        self
    }

    /// Weight of the whole stack, saturating at `u32::MAX`.
    pub fn total_weight(&self) -> u32 {
        self.weight.saturating_mul(*self.quantity)
    }

    pub fn is_broken(&self) -> bool {
        self.durability
            .as_ref()
            .is_some_and(|durability| durability.is_broken())
    }

    /// Checks the record before it crosses into the store. Durability is
    /// normalized rather than rejected.
    pub fn validate(&mut self) -> Result<(), ItemValidationError> {
        if self.name.trim().is_empty() {
            return Err(ItemValidationError::EmptyName);
        }

        if self.equipped && !self.kind.is_equippable() {
            return Err(ItemValidationError::NotEquippable);
        }

        match &self.kind {
            ItemKind::Armor(armor) if *armor.evasion_penalty > 0 => {
                return Err(ItemValidationError::PositiveEvasionPenalty);
            }
            ItemKind::Spell(spell) | ItemKind::SpiritAbility(spell) if spell.willpower_cost < 0 => {
                return Err(ItemValidationError::NegativeWillpowerCost);
            }
            _ => {}
        }

        self.durability = match self.kind.has_durability() {
            true => self.durability.map(Durability::clamped),
            false => None,
        };

        Ok(())
    }

    /// Subtracts `amount` from durability, clamped to `[0, max]`.
    pub fn damage_durability(
        &mut self,
        amount: HitPoints,
    ) -> Result<DurabilityChange, ItemValidationError> {
        self.change_durability(amount.saturating_neg())
    }

    pub fn repair_durability(
        &mut self,
        amount: HitPoints,
    ) -> Result<DurabilityChange, ItemValidationError> {
        self.change_durability(*amount)
    }

    fn change_durability(
        &mut self,
        delta: i16,
    ) -> Result<DurabilityChange, ItemValidationError> {
        let Some(durability) = self.durability.as_mut() else {
            return Err(ItemValidationError::NoDurability);
        };

        durability.current = HitPoints::new((*durability.current).saturating_add(delta));
        *durability = durability.clamped();

        match durability.is_broken() {
            true => Ok(DurabilityChange::Broken(*durability)),
            false => Ok(DurabilityChange::Intact(*durability)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        abilities::AbilityType,
        items::{
            ArmorData, DurabilityChange, ItemKind, ItemRecord, ItemValidationError, SpellData,
            WeaponData,
        },
        types::{EvasionPenalty, HitPoints},
    };

    fn longsword() -> WeaponData {
        WeaponData {
            damage: "1d8".to_string(),
            versatile: true,
            versatile_damage: Some("1d10".to_string()),
            two_handed: false,
            attribute: AbilityType::Strength,
            weapon_skill: Some("long_blades".to_string()),
            properties: vec!["Versatile".to_string()],
        }
    }

    #[test]
    fn durability_clamps_and_reports_broken() {
        let mut shield = ItemRecord::new(1, "Buckler", ItemKind::Shield(Default::default()))
            .with_durability(5);

        assert_eq!(
            shield.damage_durability(HitPoints::new(3)),
            Ok(DurabilityChange::Intact(shield.durability.unwrap()))
        );
        assert_eq!(*shield.durability.unwrap().current, 2);

        let broken = shield.damage_durability(HitPoints::new(10)).unwrap();
        assert!(matches!(broken, DurabilityChange::Broken(_)));
        assert_eq!(*shield.durability.unwrap().current, 0);
        assert!(shield.is_broken());

        shield.repair_durability(HitPoints::new(40)).unwrap();
        assert_eq!(*shield.durability.unwrap().current, 5);
    }

    #[test]
    fn extreme_amounts_still_clamp() {
        let mut shield = ItemRecord::new(1, "Tower shield", ItemKind::Shield(Default::default()))
            .with_durability(5);
        shield.damage_durability(HitPoints::new(2)).unwrap();

        shield.repair_durability(HitPoints::new(i16::MAX)).unwrap();
        assert_eq!(*shield.durability.unwrap().current, 5);

        let healed = shield.damage_durability(HitPoints::new(i16::MIN)).unwrap();
        assert!(matches!(healed, DurabilityChange::Intact(_)));

        let broken = shield.damage_durability(HitPoints::new(i16::MAX)).unwrap();
        assert!(matches!(broken, DurabilityChange::Broken(_)));
        assert_eq!(*shield.durability.unwrap().current, 0);
    }

    #[test]
    fn stack_weight_saturates() {
        let hoard = ItemRecord::new(8, "Gold", ItemKind::Gear).with_weight(3_000_000_000, 2);

        assert_eq!(hoard.total_weight(), u32::MAX);
    }

    #[test]
    fn gear_has_no_durability() {
        let mut rope = ItemRecord::new(2, "Rope", ItemKind::Gear);

        assert_eq!(
            rope.damage_durability(HitPoints::new(1)),
            Err(ItemValidationError::NoDurability)
        );
    }

    #[test]
    fn validation_rejects_bad_records() {
        let mut equipped_gear = ItemRecord::new(3, "Lantern", ItemKind::Gear).equipped();
        assert_eq!(
            equipped_gear.validate(),
            Err(ItemValidationError::NotEquippable)
        );

        let mut odd_armor = ItemRecord::new(
            4,
            "Odd plate",
            ItemKind::Armor(ArmorData {
                evasion_penalty: EvasionPenalty::new(2),
                ..Default::default()
            }),
        );
        assert_eq!(
            odd_armor.validate(),
            Err(ItemValidationError::PositiveEvasionPenalty)
        );

        let mut spell = ItemRecord::new(
            5,
            "Firebolt",
            ItemKind::Spell(SpellData {
                willpower_cost: -1,
                ..Default::default()
            }),
        );
        assert_eq!(
            spell.validate(),
            Err(ItemValidationError::NegativeWillpowerCost)
        );
    }

    #[test]
    fn validation_normalizes_durability() {
        let mut sword = ItemRecord::new(6, "Sword", ItemKind::Weapon(longsword())).with_durability(4);
        if let Some(durability) = sword.durability.as_mut() {
            durability.current = HitPoints::new(9);
        }

        sword.validate().unwrap();
        assert_eq!(*sword.durability.unwrap().current, 4);
    }

    #[test]
    fn versatile_damage_needs_both_flags() {
        let mut weapon = longsword();
        assert_eq!(weapon.damage_formula(), "1d8");

        weapon.two_handed = true;
        assert_eq!(weapon.damage_formula(), "1d10");

        weapon.versatile = false;
        assert_eq!(weapon.damage_formula(), "1d8");
    }

    #[test]
    fn item_record_uses_tagged_type() {
        let json = r#"{
            "id": 7,
            "name": "Chain shirt",
            "type": "armor",
            "damage_reduction": 3,
            "evasion_penalty": -1,
            "equipped": true,
            "weight": 20
        }"#;

        let item: ItemRecord = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind.type_name(), "armor");
        assert_eq!(*item.quantity, 1);
        assert_eq!(item.total_weight(), 20);
        assert!(item.equipped);
    }
}
