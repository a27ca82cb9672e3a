use godfall_database::Pool;
use godfall_rules::{
    abilities::{AbilityScores, AbilityType},
    archetypes::Archetype,
    character::{ActorKind, CharacterRecord, CustomSkill, compact_skills},
    config::RulesetConfig,
    items::{DurabilityChange, ItemKind, ItemRecord, ItemValidationError},
    types::{AbilityScore, HitPoints, Level},
};

use crate::GameError;

pub async fn create_character(
    pool: &Pool,
    config: &RulesetConfig,
    name: &str,
    kind: ActorKind,
    abilities: AbilityScores,
    archetype: Archetype,
    level: Level,
) -> Result<CharacterRecord, GameError> {
    let mut character = CharacterRecord::new(0, name, abilities, archetype, level, config);
    character.kind = kind;

    character.id = godfall_database::create_character(pool, &character).await?;

    tracing::info!(character = character.id, %name, "created character");

    Ok(character)
}

/// Reads the record and recomputes its derived block from the stored raw
/// fields. Nothing is written back.
pub async fn get_character(
    pool: &Pool,
    config: &RulesetConfig,
    id: i64,
) -> Result<CharacterRecord, GameError> {
    let mut character = godfall_database::get_character(pool, id).await?;
    character.recompute(config);

    Ok(character)
}

/// Re-derives everything from the current raw state and persists the result
/// along with the clamped pools.
pub async fn on_character_mutated(
    pool: &Pool,
    config: &RulesetConfig,
    id: i64,
) -> Result<CharacterRecord, GameError> {
    let character = get_character(pool, config, id).await?;
    godfall_database::update_character(pool, &character).await?;

    Ok(character)
}

pub async fn on_item_mutated(
    pool: &Pool,
    config: &RulesetConfig,
    item_id: i64,
) -> Result<CharacterRecord, GameError> {
    let owner = godfall_database::get_item_owner(pool, item_id).await?;

    on_character_mutated(pool, config, owner).await
}

async fn update_raw(
    pool: &Pool,
    config: &RulesetConfig,
    id: i64,
    update: impl FnOnce(&mut CharacterRecord),
) -> Result<CharacterRecord, GameError> {
    let mut character = godfall_database::get_character(pool, id).await?;
    update(&mut character);
    character.recompute(config);

    godfall_database::update_character(pool, &character).await?;

    Ok(character)
}

pub async fn set_ability_score(
    pool: &Pool,
    config: &RulesetConfig,
    id: i64,
    ability: AbilityType,
    score: AbilityScore,
) -> Result<CharacterRecord, GameError> {
    update_raw(pool, config, id, |character| {
        character.abilities.set(ability, score)
    })
    .await
}

pub async fn set_level(
    pool: &Pool,
    config: &RulesetConfig,
    id: i64,
    level: Level,
) -> Result<CharacterRecord, GameError> {
    update_raw(pool, config, id, |character| {
        character.level = level.normalized()
    })
    .await
}

pub async fn set_archetype(
    pool: &Pool,
    config: &RulesetConfig,
    id: i64,
    archetype: Archetype,
) -> Result<CharacterRecord, GameError> {
    update_raw(pool, config, id, |character| character.archetype = archetype).await
}

/// Sets current hit points, capped at the maximum. Negative values are kept.
pub async fn set_hit_points(
    pool: &Pool,
    config: &RulesetConfig,
    id: i64,
    hit_points: HitPoints,
) -> Result<CharacterRecord, GameError> {
    update_raw(pool, config, id, |character| {
        character.current_hit_points = hit_points
    })
    .await
}

pub async fn set_weapon_skills(
    pool: &Pool,
    config: &RulesetConfig,
    id: i64,
    skills: Vec<CustomSkill>,
) -> Result<CharacterRecord, GameError> {
    update_raw(pool, config, id, |character| {
        character.weapon_skills = compact_skills(skills)
    })
    .await
}

pub async fn set_backgrounds(
    pool: &Pool,
    config: &RulesetConfig,
    id: i64,
    backgrounds: Vec<CustomSkill>,
) -> Result<CharacterRecord, GameError> {
    update_raw(pool, config, id, |character| {
        character.backgrounds = compact_skills(backgrounds)
    })
    .await
}

pub async fn add_item(
    pool: &Pool,
    config: &RulesetConfig,
    character_id: i64,
    item: &ItemRecord,
) -> Result<i64, GameError> {
    let item_id = godfall_database::add_item(pool, character_id, item).await?;

    on_character_mutated(pool, config, character_id).await?;

    tracing::info!(character = character_id, item = item_id, name = %item.name, "added item");

    Ok(item_id)
}

pub async fn remove_item(
    pool: &Pool,
    config: &RulesetConfig,
    character_id: i64,
    item_id: i64,
) -> Result<CharacterRecord, GameError> {
    owned_item(pool, character_id, item_id).await?;
    godfall_database::delete_item(pool, item_id).await?;

    on_character_mutated(pool, config, character_id).await
}

async fn owned_item(pool: &Pool, character_id: i64, item_id: i64) -> Result<ItemRecord, GameError> {
    match godfall_database::get_item_owner(pool, item_id).await? == character_id {
        true => Ok(godfall_database::get_item(pool, item_id).await?),
        false => Err(GameError::ItemNotInInventory(item_id)),
    }
}

/// Equips a weapon, armor or shield. Equipping armor takes off any other
/// worn armor.
pub async fn equip_item(
    pool: &Pool,
    config: &RulesetConfig,
    character_id: i64,
    item_id: i64,
) -> Result<CharacterRecord, GameError> {
    let character = godfall_database::get_character(pool, character_id).await?;
    let item = character
        .item(item_id)
        .ok_or(GameError::ItemNotInInventory(item_id))?;

    if !item.kind.is_equippable() {
        return Err(ItemValidationError::NotEquippable.into());
    }

    let mut changes = vec![];
    if let ItemKind::Armor(_) = item.kind {
        for other in character.inventory.iter().filter(|other| {
            other.id != item_id && other.equipped && matches!(other.kind, ItemKind::Armor(_))
        }) {
            tracing::debug!(item = other.id, "unequipping armor");
            changes.push(ItemRecord {
                equipped: false,
                ..other.clone()
            });
        }
    }
    changes.push(ItemRecord {
        equipped: true,
        ..item.clone()
    });

    godfall_database::update_items(pool, &changes).await?;

    on_character_mutated(pool, config, character_id).await
}

pub async fn unequip_item(
    pool: &Pool,
    config: &RulesetConfig,
    character_id: i64,
    item_id: i64,
) -> Result<CharacterRecord, GameError> {
    let mut item = owned_item(pool, character_id, item_id).await?;
    item.equipped = false;
    godfall_database::update_item(pool, &item).await?;

    on_character_mutated(pool, config, character_id).await
}

/// Subtracts durability; a broken item stays in the inventory.
pub async fn damage_item(
    pool: &Pool,
    config: &RulesetConfig,
    character_id: i64,
    item_id: i64,
    amount: HitPoints,
) -> Result<DurabilityChange, GameError> {
    let mut item = owned_item(pool, character_id, item_id).await?;
    let change = item.damage_durability(amount)?;

    if let DurabilityChange::Broken(_) = change {
        tracing::warn!(item = item_id, name = %item.name, "item broke");
    }

    godfall_database::update_item(pool, &item).await?;
    on_item_mutated(pool, config, item_id).await?;

    Ok(change)
}

pub async fn repair_item(
    pool: &Pool,
    config: &RulesetConfig,
    character_id: i64,
    item_id: i64,
    amount: HitPoints,
) -> Result<DurabilityChange, GameError> {
    let mut item = owned_item(pool, character_id, item_id).await?;
    let change = item.repair_durability(amount)?;

    godfall_database::update_item(pool, &item).await?;
    on_item_mutated(pool, config, item_id).await?;

    Ok(change)
}
