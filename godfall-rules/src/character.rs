use crate::{
    abilities::{AbilityModifiers, AbilityScores},
    archetypes::Archetype,
    config::RulesetConfig,
    dice::Bindings,
    encumbrance::{Encumbrance, compute_encumbrance},
    items::{ItemKind, ItemRecord},
    types::{
        AbilityModifier, DamageReduction, DefenseValue, EvasionPenalty, Hardness, HitPoints,
        Level, WillpowerPoints,
    },
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    #[default]
    Character,
    Npc,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct CustomSkill {
    pub name: String,
    pub value: i16,
}

impl CustomSkill {
    /// Lowercase with whitespace runs collapsed to `_`, the form weapon
    /// skill keys are written in.
    pub fn key(&self) -> String {
        skill_key(&self.name)
    }

    fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.value == 0
    }
}

pub fn skill_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Drops entries that carry neither a name nor a value.
pub fn compact_skills(skills: Vec<CustomSkill>) -> Vec<CustomSkill> {
    skills
        .into_iter()
        .filter(|skill| !skill.is_blank())
        .collect()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ShieldStats {
    pub hardness: Hardness,
    pub hp: HitPoints,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct EquipmentBonuses {
    /// Highest DR among equipped armor.
    pub damage_reduction: DamageReduction,
    /// Most negative penalty among equipped armor.
    pub evasion_penalty: EvasionPenalty,
    pub armor_defense: DefenseValue,
    pub shield_defense: DefenseValue,
    pub shield: ShieldStats,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct DerivedStatBlock {
    pub modifiers: AbilityModifiers,
    pub defense_value: DefenseValue,
    pub evasion: AbilityModifier,
    pub initiative: AbilityModifier,
    pub max_hit_points: HitPoints,
    pub max_willpower: WillpowerPoints,
    pub encumbrance: Encumbrance,
    pub equipment: EquipmentBonuses,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct CharacterRecord {
    pub id: i64,
    pub name: String,
    pub kind: ActorKind,
    pub archetype: Archetype,
    pub level: Level,
    pub abilities: AbilityScores,
    pub current_hit_points: HitPoints,
    pub current_willpower: WillpowerPoints,
    pub inventory: Vec<ItemRecord>,
    pub weapon_skills: Vec<CustomSkill>,
    pub backgrounds: Vec<CustomSkill>,
    /// Cached result of [`resolve`]; never edited directly.
    pub derived: DerivedStatBlock,
}

pub fn equipment_bonuses(inventory: &[ItemRecord]) -> EquipmentBonuses {
    let equipped = || inventory.iter().filter(|item| item.equipped);

    let armor = || {
        equipped().filter_map(|item| match &item.kind {
            ItemKind::Armor(armor) => Some(armor),
            _ => None,
        })
    };

    let shields = || {
        equipped().filter_map(|item| match &item.kind {
            ItemKind::Shield(shield) => Some((item, shield)),
            _ => None,
        })
    };

    let shield = shields()
        .next()
        .map(|(item, shield)| ShieldStats {
            hardness: shield.hardness,
            hp: item
                .durability
                .map(|durability| durability.current)
                .unwrap_or_default(),
        })
        .unwrap_or_default();

    EquipmentBonuses {
        damage_reduction: armor()
            .map(|armor| armor.damage_reduction)
            .max()
            .unwrap_or_default(),
        evasion_penalty: armor()
            .map(|armor| armor.evasion_penalty)
            .min()
            .unwrap_or_default()
            .min(EvasionPenalty::new(0)),
        armor_defense: armor()
            .map(|armor| armor.defense)
            .max()
            .unwrap_or_default(),
        shield_defense: shields()
            .map(|(_, shield)| shield.defense)
            .max()
            .unwrap_or_default(),
        shield,
    }
}

pub fn max_hit_points(
    modifiers: &AbilityModifiers,
    archetype: Archetype,
    level: Level,
    config: &RulesetConfig,
) -> HitPoints {
    HitPoints::new(10)
        .saturating_add(modifiers.constitution.into())
        .saturating_add(archetype.hit_point_bonus(level, config.hp_progression))
}

pub fn max_willpower(modifiers: &AbilityModifiers, archetype: Archetype) -> WillpowerPoints {
    WillpowerPoints::new(5) + archetype.willpower_modifier(modifiers).into()
}

/// Derives every computed stat from the record's raw inputs. Pure: the
/// cached block on `character` is ignored.
pub fn resolve(character: &CharacterRecord, config: &RulesetConfig) -> DerivedStatBlock {
    let modifiers = character.abilities.modifiers();
    let equipment = equipment_bonuses(&character.inventory);
    let dexterity = modifiers.dexterity;

    DerivedStatBlock {
        defense_value: DefenseValue::new(10)
            .saturating_add(dexterity.into())
            .saturating_add(equipment.armor_defense)
            .saturating_add(equipment.shield_defense),
        evasion: dexterity.saturating_add(AbilityModifier::new(*equipment.evasion_penalty)),
        initiative: dexterity,
        max_hit_points: max_hit_points(
            &modifiers,
            character.archetype,
            character.level,
            config,
        ),
        max_willpower: max_willpower(&modifiers, character.archetype),
        encumbrance: compute_encumbrance(
            character.abilities.strength,
            &character.inventory,
            config,
        ),
        equipment,
        modifiers,
    }
}

impl CharacterRecord {
    /// A fresh character at full hit points and willpower.
    pub fn new(
        id: i64,
        name: &str,
        abilities: AbilityScores,
        archetype: Archetype,
        level: Level,
        config: &RulesetConfig,
    ) -> Self {
        let mut character = Self {
            id,
            name: name.to_owned(),
            kind: ActorKind::Character,
            archetype,
            level: level.normalized(),
            abilities,
            current_hit_points: HitPoints::new(0),
            current_willpower: WillpowerPoints::new(0),
            inventory: vec![],
            weapon_skills: vec![],
            backgrounds: vec![],
            derived: DerivedStatBlock::default(),
        };

        character.recompute(config);
        character.current_hit_points = character.derived.max_hit_points;
        character.current_willpower = character.derived.max_willpower;

        character
    }

    /// Replaces the cached derived block and clamps current pools to the
    /// new maxima.
    pub fn recompute(&mut self, config: &RulesetConfig) {
        self.derived = resolve(self, config);
        self.current_hit_points = self.current_hit_points.min(self.derived.max_hit_points);
        self.current_willpower = self.current_willpower.min(self.derived.max_willpower);

        tracing::debug!(
            character = self.id,
            max_hit_points = *self.derived.max_hit_points,
            max_willpower = *self.derived.max_willpower,
            "recomputed derived stats"
        );
    }

    pub fn modifiers(&self) -> &AbilityModifiers {
        &self.derived.modifiers
    }

    pub fn max_hit_points(&self) -> HitPoints {
        self.derived.max_hit_points
    }

    pub fn max_willpower(&self) -> WillpowerPoints {
        self.derived.max_willpower
    }

    pub fn damage_reduction(&self) -> DamageReduction {
        self.derived.equipment.damage_reduction
    }

    pub fn item(&self, item_id: i64) -> Option<&ItemRecord> {
        self.inventory.iter().find(|item| item.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: i64) -> Option<&mut ItemRecord> {
        self.inventory.iter_mut().find(|item| item.id == item_id)
    }

    pub fn weapon_skill_bonus(&self, skill: &str) -> i16 {
        let key = skill_key(skill);
        self.weapon_skills
            .iter()
            .filter(|weapon_skill| weapon_skill.key() == key)
            .map(|weapon_skill| weapon_skill.value)
            .last()
            .unwrap_or(0)
    }

    /// Variables available to formulas rolled by this character: every
    /// ability modifier by key plus `level`.
    pub fn roll_data(&self) -> Bindings {
        let modifiers = self.abilities.modifiers();
        let mut bindings: Bindings = crate::abilities::AbilityType::ALL
            .iter()
            .map(|ability| (ability.key().to_string(), i32::from(*modifiers.get(*ability))))
            .collect();
        bindings.insert("level".to_string(), i32::from(*self.level));

        bindings
    }
}
