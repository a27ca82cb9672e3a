use godfall_database::{ChatMessage, MessageContent, Pool};
use godfall_rules::{
    abilities::AbilityType,
    character::CharacterRecord,
    combat::{
        self, Advantage, AttackOutcome, AttackRequest, CastOutcome, CheckRequest, SaveOutcome,
        SpellRoll, TargetDefenses, WillpowerSpend,
    },
    config::RulesetConfig,
    dice::{DiceFormula, DieSource, RollOutcome},
    items::ItemKind,
    types::WillpowerPoints,
};

use crate::{GameError, character::get_character};

/// Accepts a number or a difficulty name such as `hard`.
pub fn difficulty(config: &RulesetConfig, text: &str) -> Result<i32, GameError> {
    match text.trim().parse::<i32>() {
        Ok(dc) => Ok(dc),
        Err(_) => config
            .difficulties
            .from_name(text)
            .ok_or_else(|| GameError::UnknownDifficulty(text.to_string())),
    }
}

async fn publish(
    pool: &Pool,
    speaker: &str,
    flavor: String,
    content: MessageContent,
) -> Result<(), GameError> {
    godfall_database::publish_message(
        pool,
        &ChatMessage {
            speaker: speaker.to_owned(),
            flavor,
            content,
        },
    )
    .await?;

    Ok(())
}

async fn get_target(
    pool: &Pool,
    config: &RulesetConfig,
    target_id: Option<i64>,
) -> Result<Option<CharacterRecord>, GameError> {
    match target_id {
        Some(id) => Ok(Some(get_character(pool, config, id).await?)),
        None => Ok(None),
    }
}

fn check_flavor(label: &str, outcome: &RollOutcome) -> String {
    let mut flavor = match outcome.target {
        Some(target) => format!("{label} vs DC {target}"),
        None => label.to_owned(),
    };

    if outcome.is_critical {
        flavor.push_str(" (critical)");
    } else if outcome.is_fumble {
        flavor.push_str(" (fumble)");
    }

    flavor
}

async fn publish_attack(
    pool: &Pool,
    speaker: &str,
    label: &str,
    target: Option<&CharacterRecord>,
    outcome: &AttackOutcome,
) -> Result<(), GameError> {
    let mut attack_flavor = match (target, outcome.hit) {
        (Some(target), Some(true)) => format!("{label} hits {}", target.name),
        (Some(target), Some(false)) => format!("{label} misses {}", target.name),
        _ => format!("{label} (no target selected)"),
    };
    if outcome.attack.is_critical {
        attack_flavor.push_str(" (critical)");
    }

    publish(
        pool,
        speaker,
        attack_flavor,
        MessageContent::Rolls(vec![outcome.attack.clone()]),
    )
    .await?;

    publish(
        pool,
        speaker,
        format!(
            "{label} Damage (after DR {}) = {}",
            outcome.damage_reduction, outcome.final_damage
        ),
        MessageContent::Rolls(vec![outcome.damage.clone()]),
    )
    .await
}

pub async fn roll_check(
    pool: &Pool,
    config: &RulesetConfig,
    dice: &mut impl DieSource,
    character_id: i64,
    ability: &str,
    advantage: Advantage,
    bonus: i32,
    target: Option<i32>,
) -> Result<RollOutcome, GameError> {
    let character = get_character(pool, config, character_id).await?;
    let request = CheckRequest::ability_key(&character, ability)
        .with_bonus(bonus)
        .with_advantage(advantage)
        .with_target(target);

    let outcome = combat::check(&request, config, dice)?;

    publish(
        pool,
        &character.name,
        check_flavor(&request.label, &outcome),
        MessageContent::Rolls(vec![outcome.clone()]),
    )
    .await?;

    Ok(outcome)
}

/// Rolls an arbitrary formula with the character's modifiers and level bound.
pub async fn roll_formula(
    pool: &Pool,
    config: &RulesetConfig,
    dice: &mut impl DieSource,
    character_id: i64,
    formula: &str,
    flavor: Option<&str>,
) -> Result<RollOutcome, GameError> {
    let character = get_character(pool, config, character_id).await?;
    let outcome = DiceFormula::parse(formula)?.evaluate(&character.roll_data(), dice)?;

    publish(
        pool,
        &character.name,
        flavor.unwrap_or(formula).to_owned(),
        MessageContent::Rolls(vec![outcome.clone()]),
    )
    .await?;

    Ok(outcome)
}

/// An attack with a free-form damage formula rather than an owned weapon.
pub async fn roll_attack(
    pool: &Pool,
    config: &RulesetConfig,
    dice: &mut impl DieSource,
    attacker_id: i64,
    ability: AbilityType,
    damage: &str,
    advantage: Advantage,
    bonus: i32,
    target_id: Option<i64>,
) -> Result<AttackOutcome, GameError> {
    let (attacker, target) = futures::try_join!(
        get_character(pool, config, attacker_id),
        get_target(pool, config, target_id)
    )?;

    let request = AttackRequest {
        check: CheckRequest::ability(&attacker, ability)
            .with_bonus(bonus)
            .with_advantage(advantage),
        damage: DiceFormula::parse(damage)?,
        target: target.as_ref().map(TargetDefenses::from),
    };
    let label = format!("Attack ({ability})");

    let outcome = combat::attack(&request, &attacker.roll_data(), config, dice)?;
    publish_attack(pool, &attacker.name, &label, target.as_ref(), &outcome).await?;

    Ok(outcome)
}

pub async fn roll_weapon_attack(
    pool: &Pool,
    config: &RulesetConfig,
    dice: &mut impl DieSource,
    attacker_id: i64,
    item_id: i64,
    advantage: Advantage,
    bonus: i32,
    target_id: Option<i64>,
) -> Result<AttackOutcome, GameError> {
    let (attacker, target) = futures::try_join!(
        get_character(pool, config, attacker_id),
        get_target(pool, config, target_id)
    )?;

    let item = attacker
        .item(item_id)
        .ok_or(GameError::ItemNotInInventory(item_id))?;
    let ItemKind::Weapon(weapon) = &item.kind else {
        return Err(GameError::NotAWeapon(item.name.clone()));
    };

    let request = combat::weapon_attack(
        &attacker,
        &item.name,
        weapon,
        advantage,
        bonus,
        target.as_ref().map(TargetDefenses::from),
    )?;

    let outcome = combat::attack(&request, &attacker.roll_data(), config, dice)?;
    publish_attack(
        pool,
        &attacker.name,
        &request.check.label,
        target.as_ref(),
        &outcome,
    )
    .await?;

    Ok(outcome)
}

/// Spends willpower; an unaffordable or negative cost is reported and
/// nothing changes.
pub async fn spend_willpower(
    pool: &Pool,
    config: &RulesetConfig,
    character_id: i64,
    cost: WillpowerPoints,
) -> Result<WillpowerSpend, GameError> {
    let character = get_character(pool, config, character_id).await?;
    let spend = combat::spend_willpower(character.current_willpower, cost);

    match spend {
        WillpowerSpend::Spent { remaining } => {
            let remaining = remaining.min(character.max_willpower());
            godfall_database::set_character_willpower(pool, character_id, remaining).await?;
        }
        WillpowerSpend::Insufficient { current, cost } => {
            publish(
                pool,
                &character.name,
                "Not enough willpower".to_string(),
                MessageContent::Text(format!("{current} willpower, {cost} needed")),
            )
            .await?;
        }
        WillpowerSpend::NegativeCost { cost } => {
            publish(
                pool,
                &character.name,
                "Invalid willpower cost".to_string(),
                MessageContent::Text(format!("{cost} is below zero")),
            )
            .await?;
        }
    }

    Ok(spend)
}

pub async fn cast_spell(
    pool: &Pool,
    config: &RulesetConfig,
    dice: &mut impl DieSource,
    caster_id: i64,
    item_id: i64,
    advantage: Advantage,
    target_id: Option<i64>,
) -> Result<CastOutcome, GameError> {
    let (caster, target) = futures::try_join!(
        get_character(pool, config, caster_id),
        get_target(pool, config, target_id)
    )?;

    let item = caster
        .item(item_id)
        .ok_or(GameError::ItemNotInInventory(item_id))?;
    let spell = item
        .kind
        .spell()
        .ok_or_else(|| GameError::NotASpell(item.name.clone()))?;

    let outcome = combat::cast_spell(
        &caster,
        &item.name,
        spell,
        advantage,
        target.as_ref().map(TargetDefenses::from),
        config,
        dice,
    )?;

    match &outcome {
        CastOutcome::Insufficient { current, cost } => {
            publish(
                pool,
                &caster.name,
                format!("{}: not enough willpower", item.name),
                MessageContent::Text(format!("{current} willpower, {cost} needed")),
            )
            .await?;
        }
        CastOutcome::NegativeCost { cost } => {
            publish(
                pool,
                &caster.name,
                format!("{}: invalid willpower cost", item.name),
                MessageContent::Text(format!("{cost} is below zero")),
            )
            .await?;
        }
        CastOutcome::Cast {
            remaining_willpower,
            roll,
        } => {
            if *remaining_willpower != caster.current_willpower {
                godfall_database::set_character_willpower(pool, caster_id, *remaining_willpower)
                    .await?;
            }

            let label = format!("{} ({})", item.name, spell.attack_attribute);
            match roll {
                SpellRoll::Check(check) => {
                    publish(
                        pool,
                        &caster.name,
                        check_flavor(&label, check),
                        MessageContent::Rolls(vec![check.clone()]),
                    )
                    .await?
                }
                SpellRoll::Attack(attack) => {
                    publish_attack(pool, &caster.name, &label, target.as_ref(), attack).await?
                }
            }
        }
    }

    Ok(outcome)
}

/// Prompts a save against the spell's save formula, rolled by the target
/// when there is one.
pub async fn prompt_save(
    pool: &Pool,
    config: &RulesetConfig,
    dice: &mut impl DieSource,
    caster_id: i64,
    item_id: i64,
    target_id: Option<i64>,
) -> Result<SaveOutcome, GameError> {
    let (caster, target) = futures::try_join!(
        get_character(pool, config, caster_id),
        get_target(pool, config, target_id)
    )?;

    let item = caster
        .item(item_id)
        .ok_or(GameError::ItemNotInInventory(item_id))?;
    let spell = item
        .kind
        .spell()
        .ok_or_else(|| GameError::NotASpell(item.name.clone()))?;

    let outcome = combat::resolve_save(
        &caster,
        target.as_ref(),
        spell.save.as_deref().unwrap_or_default(),
        config,
        dice,
    )?;

    match &outcome {
        SaveOutcome::NotConfigured => {
            publish(
                pool,
                &caster.name,
                format!("Save vs {}", item.name),
                MessageContent::Text("No save configured".to_string()),
            )
            .await?;
        }
        SaveOutcome::Rolled {
            expression,
            dc,
            roll,
        } => {
            let speaker = target.as_ref().unwrap_or(&caster);
            let verdict = match roll.pass {
                Some(true) => format!(", {} succeeds", speaker.name),
                Some(false) => format!(", {} fails", speaker.name),
                None => " (no target selected)".to_string(),
            };

            publish(
                pool,
                &speaker.name,
                format!(
                    "Save vs {}: {} vs DC {dc}{verdict}",
                    item.name, expression.ability
                ),
                MessageContent::Rolls(vec![roll.clone()]),
            )
            .await?;
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use godfall_database::{MessageContent, Pool};
    use godfall_rules::{
        abilities::{AbilityScores, AbilityType},
        archetypes::Archetype,
        character::{ActorKind, CharacterRecord},
        combat::{Advantage, CastOutcome, SaveOutcome, WillpowerSpend},
        config::RulesetConfig,
        dice::ScriptedDice,
        items::{ArmorData, ItemKind, ItemRecord, SpellData, WeaponData},
        types::{DamageReduction, Level, WillpowerPoints},
    };

    use crate::{
        GameError,
        character::{add_item, create_character, equip_item, get_character},
        roll::{
            cast_spell, difficulty, prompt_save, roll_attack, roll_check, roll_weapon_attack,
            spend_willpower,
        },
    };

    async fn create(pool: &Pool, name: &str, archetype: Archetype) -> CharacterRecord {
        create_character(
            pool,
            &RulesetConfig::default(),
            name,
            ActorKind::Character,
            AbilityScores::new(14, 12, 10, 16, 12, 10),
            archetype,
            Level::new(1),
        )
        .await
        .unwrap()
    }

    fn firebolt(cost: i16) -> ItemRecord {
        ItemRecord::new(
            0,
            "Firebolt",
            ItemKind::Spell(SpellData {
                damage: Some("1d10".to_string()),
                save: Some("DEX vs DC 12".to_string()),
                willpower_cost: cost,
                ..Default::default()
            }),
        )
    }

    #[tokio::test]
    async fn check_publishes_message() {
        let pool = godfall_database::in_memory_pool().await.unwrap();
        let config = RulesetConfig::default();
        let hero = create(&pool, "Testington", Archetype::Warrior).await;
        let dc = difficulty(&config, "hard").unwrap();

        let outcome = roll_check(
            &pool,
            &config,
            &mut ScriptedDice::new([18]),
            hero.id,
            "str",
            Advantage::Normal,
            0,
            Some(dc),
        )
        .await
        .unwrap();

        assert_eq!(outcome.total, 20);
        assert_eq!(outcome.pass, Some(true));

        let messages = godfall_database::get_messages(&pool, 10).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].speaker, "Testington");
        assert_eq!(messages[0].flavor, "STR check vs DC 20");
    }

    #[test]
    fn difficulty_accepts_numbers_and_names() {
        let config = RulesetConfig::default();

        assert_eq!(difficulty(&config, "17").unwrap(), 17);
        assert_eq!(difficulty(&config, "Extreme").unwrap(), 25);
        assert!(matches!(
            difficulty(&config, "impossible"),
            Err(GameError::UnknownDifficulty(_))
        ));
    }

    #[tokio::test]
    async fn weapon_attack_subtracts_target_reduction() {
        let pool = godfall_database::in_memory_pool().await.unwrap();
        let config = RulesetConfig::default();
        let hero = create(&pool, "Testington", Archetype::Warrior).await;
        let foe = create(&pool, "Foe", Archetype::None).await;

        let sword = ItemRecord::new(
            0,
            "Sword",
            ItemKind::Weapon(WeaponData {
                damage: "1d8".to_string(),
                versatile: false,
                versatile_damage: None,
                two_handed: false,
                attribute: AbilityType::Strength,
                weapon_skill: None,
                properties: vec![],
            }),
        );
        let sword = add_item(&pool, &config, hero.id, &sword).await.unwrap();

        let mail = ItemRecord::new(
            0,
            "Mail",
            ItemKind::Armor(ArmorData {
                damage_reduction: DamageReduction::new(3),
                ..Default::default()
            }),
        );
        let mail = add_item(&pool, &config, foe.id, &mail).await.unwrap();
        equip_item(&pool, &config, foe.id, mail).await.unwrap();

        let outcome = roll_weapon_attack(
            &pool,
            &config,
            &mut ScriptedDice::new([20, 5, 6]),
            hero.id,
            sword,
            Advantage::Normal,
            0,
            Some(foe.id),
        )
        .await
        .unwrap();

        assert!(outcome.attack.is_critical);
        assert_eq!(outcome.hit, Some(true));
        assert_eq!(outcome.damage.formula, "2d8 + 2");
        assert_eq!(outcome.damage.total, 13);
        assert_eq!(outcome.final_damage, 10);

        let messages = godfall_database::get_messages(&pool, 10).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].flavor, "Sword (STR) hits Foe (critical)");
        assert_eq!(messages[1].flavor, "Sword (STR) Damage (after DR 3) = 10");
    }

    #[tokio::test]
    async fn attack_without_target_uses_no_reduction() {
        let pool = godfall_database::in_memory_pool().await.unwrap();
        let config = RulesetConfig::default();
        let hero = create(&pool, "Testington", Archetype::Warrior).await;

        let outcome = roll_attack(
            &pool,
            &config,
            &mut ScriptedDice::new([9, 4]),
            hero.id,
            AbilityType::Strength,
            "1d6 + @str",
            Advantage::Normal,
            0,
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome.hit, None);
        assert_eq!(outcome.final_damage, 6);
    }

    #[tokio::test]
    async fn weapon_attack_needs_a_weapon() {
        let pool = godfall_database::in_memory_pool().await.unwrap();
        let config = RulesetConfig::default();
        let hero = create(&pool, "Testington", Archetype::Warrior).await;
        let rope = add_item(
            &pool,
            &config,
            hero.id,
            &ItemRecord::new(0, "Rope", ItemKind::Gear),
        )
        .await
        .unwrap();

        assert!(matches!(
            roll_weapon_attack(
                &pool,
                &config,
                &mut ScriptedDice::new([10]),
                hero.id,
                rope,
                Advantage::Normal,
                0,
                None
            )
            .await,
            Err(GameError::NotAWeapon(_))
        ));
    }

    #[tokio::test]
    async fn willpower_spend_is_persisted_or_rejected() {
        let pool = godfall_database::in_memory_pool().await.unwrap();
        let config = RulesetConfig::default();
        let hero = create(&pool, "Testington", Archetype::None).await;
        assert_eq!(hero.current_willpower, WillpowerPoints::new(6));

        let spend = spend_willpower(&pool, &config, hero.id, WillpowerPoints::new(4))
            .await
            .unwrap();
        assert_eq!(
            spend,
            WillpowerSpend::Spent {
                remaining: WillpowerPoints::new(2)
            }
        );

        let spend = spend_willpower(&pool, &config, hero.id, WillpowerPoints::new(3))
            .await
            .unwrap();
        assert!(matches!(spend, WillpowerSpend::Insufficient { .. }));

        let stored = get_character(&pool, &config, hero.id).await.unwrap();
        assert_eq!(stored.current_willpower, WillpowerPoints::new(2));
    }

    #[tokio::test]
    async fn negative_willpower_cost_changes_nothing() {
        let pool = godfall_database::in_memory_pool().await.unwrap();
        let config = RulesetConfig::default();
        let hero = create(&pool, "Testington", Archetype::None).await;
        spend_willpower(&pool, &config, hero.id, WillpowerPoints::new(4))
            .await
            .unwrap();

        let spend = spend_willpower(&pool, &config, hero.id, WillpowerPoints::new(-3))
            .await
            .unwrap();
        assert_eq!(
            spend,
            WillpowerSpend::NegativeCost {
                cost: WillpowerPoints::new(-3)
            }
        );

        let stored = get_character(&pool, &config, hero.id).await.unwrap();
        assert_eq!(stored.current_willpower, WillpowerPoints::new(2));

        let messages = godfall_database::get_messages(&pool, 1).await.unwrap();
        assert_eq!(messages[0].flavor, "Invalid willpower cost");
    }

    #[tokio::test]
    async fn casting_spends_willpower() {
        let pool = godfall_database::in_memory_pool().await.unwrap();
        let config = RulesetConfig::default();
        let caster = create(&pool, "Testington", Archetype::Spellcaster).await;
        assert_eq!(caster.current_willpower, WillpowerPoints::new(8));
        let spell = add_item(&pool, &config, caster.id, &firebolt(5)).await.unwrap();

        let outcome = cast_spell(
            &pool,
            &config,
            &mut ScriptedDice::new([12, 7]),
            caster.id,
            spell,
            Advantage::Normal,
            None,
        )
        .await
        .unwrap();
        assert!(matches!(outcome, CastOutcome::Cast { .. }));

        let outcome = cast_spell(
            &pool,
            &config,
            &mut ScriptedDice::new([12, 7]),
            caster.id,
            spell,
            Advantage::Normal,
            None,
        )
        .await
        .unwrap();
        assert!(matches!(outcome, CastOutcome::Insufficient { .. }));

        let stored = get_character(&pool, &config, caster.id).await.unwrap();
        assert_eq!(stored.current_willpower, WillpowerPoints::new(3));
    }

    #[tokio::test]
    async fn target_rolls_spell_save() {
        let pool = godfall_database::in_memory_pool().await.unwrap();
        let config = RulesetConfig::default();
        let caster = create(&pool, "Testington", Archetype::Spellcaster).await;
        let foe = create(&pool, "Foe", Archetype::None).await;
        let spell = add_item(&pool, &config, caster.id, &firebolt(0)).await.unwrap();

        let outcome = prompt_save(
            &pool,
            &config,
            &mut ScriptedDice::new([11]),
            caster.id,
            spell,
            Some(foe.id),
        )
        .await
        .unwrap();

        let SaveOutcome::Rolled { dc, roll, .. } = outcome else {
            panic!("expected a save roll");
        };
        assert_eq!(dc, 12);
        assert_eq!(roll.total, 12);
        assert_eq!(roll.pass, Some(true));

        let messages = godfall_database::get_messages(&pool, 1).await.unwrap();
        assert_eq!(messages[0].speaker, "Foe");
        assert_eq!(messages[0].flavor, "Save vs Firebolt: DEX vs DC 12, Foe succeeds");
    }

    #[tokio::test]
    async fn spell_without_save_reports_it() {
        let pool = godfall_database::in_memory_pool().await.unwrap();
        let config = RulesetConfig::default();
        let caster = create(&pool, "Testington", Archetype::Spellcaster).await;
        let light = ItemRecord::new(0, "Light", ItemKind::Spell(SpellData::default()));
        let light = add_item(&pool, &config, caster.id, &light).await.unwrap();

        let outcome = prompt_save(
            &pool,
            &config,
            &mut ScriptedDice::new([11]),
            caster.id,
            light,
            None,
        )
        .await
        .unwrap();
        assert_eq!(outcome, SaveOutcome::NotConfigured);

        let messages = godfall_database::get_messages(&pool, 1).await.unwrap();
        assert_eq!(
            messages[0].content,
            MessageContent::Text("No save configured".to_string())
        );
    }
}
