//! Checks, attacks, willpower and saves built on the dice evaluator.
//!
//! Nothing here touches a store: every function takes the records it needs
//! and returns an outcome describing what happened, leaving the caller to
//! persist pool changes and publish messages.

use crate::{
    abilities::AbilityType,
    character::CharacterRecord,
    config::{RulesetConfig, SaveDcSource},
    dice::{
        Bindings, DiceFormula, DiceTerm, DieSource, FormulaError, FormulaTerm, Keep, RollOutcome,
        Sign, Term,
    },
    items::{SpellData, WeaponData},
    saves::{SaveExpression, compute_dc},
    types::{DamageReduction, DefenseValue, WillpowerPoints},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Advantage {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl Advantage {
    /// Both or neither flag cancel out.
    pub fn from_flags(advantage: bool, disadvantage: bool) -> Self {
        match (advantage, disadvantage) {
            (true, false) => Advantage::Advantage,
            (false, true) => Advantage::Disadvantage,
            _ => Advantage::Normal,
        }
    }

    fn d20(self) -> DiceFormula {
        let (count, keep) = match self {
            Advantage::Normal => (1, None),
            Advantage::Advantage => (2, Some(Keep::Highest(1))),
            Advantage::Disadvantage => (2, Some(Keep::Lowest(1))),
        };

        DiceFormula {
            terms: vec![FormulaTerm {
                sign: Sign::Plus,
                term: Term::Dice(DiceTerm {
                    count,
                    faces: 20,
                    keep,
                }),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    pub label: String,
    pub modifier: i32,
    pub bonus: i32,
    pub advantage: Advantage,
    pub target: Option<i32>,
}

impl CheckRequest {
    pub fn new(label: &str, modifier: i32) -> Self {
        Self {
            label: label.to_owned(),
            modifier,
            bonus: 0,
            advantage: Advantage::Normal,
            target: None,
        }
    }

    pub fn ability(character: &CharacterRecord, ability: AbilityType) -> Self {
        let modifier = character.modifiers().get(ability);
        Self::new(&format!("{ability} check"), i32::from(*modifier))
    }

    /// Check for an ability named by text such as `"dex"`. An unknown key
    /// rolls with a neutral modifier.
    pub fn ability_key(character: &CharacterRecord, key: &str) -> Self {
        let modifier = character.modifiers().get_by_key(key);
        let label = AbilityType::from_ability_str(key)
            .map(|ability| ability.to_string())
            .unwrap_or_else(|| key.trim().to_uppercase());

        Self::new(&format!("{label} check"), i32::from(*modifier))
    }

    pub fn with_bonus(mut self, bonus: i32) -> Self {
        self.bonus = bonus;
        self
    }

    pub fn with_advantage(mut self, advantage: Advantage) -> Self {
        self.advantage = advantage;
        self
    }

    pub fn with_target(mut self, target: Option<i32>) -> Self {
        self.target = target;
        self
    }

    pub fn formula(&self) -> DiceFormula {
        self.advantage
            .d20()
            .with_constant(self.modifier.saturating_add(self.bonus))
    }
}

/// What an attacker needs to know about the defender.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct TargetDefenses {
    pub damage_reduction: DamageReduction,
    pub defense_value: DefenseValue,
}

impl From<&CharacterRecord> for TargetDefenses {
    fn from(character: &CharacterRecord) -> Self {
        Self {
            damage_reduction: character.derived.equipment.damage_reduction,
            defense_value: character.derived.defense_value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackRequest {
    pub check: CheckRequest,
    pub damage: DiceFormula,
    pub target: Option<TargetDefenses>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct AttackOutcome {
    pub attack: RollOutcome,
    /// Attack total against the target's DV, when there is a target.
    pub hit: Option<bool>,
    pub damage: RollOutcome,
    pub damage_reduction: DamageReduction,
    pub final_damage: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum WillpowerSpend {
    Spent {
        remaining: WillpowerPoints,
    },
    Insufficient {
        current: WillpowerPoints,
        cost: WillpowerPoints,
    },
    NegativeCost {
        cost: WillpowerPoints,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum SpellRoll {
    Check(RollOutcome),
    Attack(AttackOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum CastOutcome {
    Insufficient {
        current: WillpowerPoints,
        cost: WillpowerPoints,
    },
    NegativeCost {
        cost: WillpowerPoints,
    },
    Cast {
        remaining_willpower: WillpowerPoints,
        roll: SpellRoll,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum SaveOutcome {
    NotConfigured,
    Rolled {
        expression: SaveExpression,
        dc: i32,
        /// Carries pass/fail only when a target rolled.
        roll: RollOutcome,
    },
}

fn apply_config(mut outcome: RollOutcome, config: &RulesetConfig) -> RollOutcome {
    outcome.is_critical &= config.critical_on_natural_max;
    outcome.is_fumble &= config.fumble_on_natural_one;
    outcome
}

pub fn check(
    request: &CheckRequest,
    config: &RulesetConfig,
    dice: &mut impl DieSource,
) -> Result<RollOutcome, FormulaError> {
    let outcome = request.formula().evaluate(&Bindings::new(), dice)?;
    let outcome = apply_config(outcome, config);

    Ok(match request.target {
        Some(target) => outcome.with_target(target),
        None => outcome,
    })
}

/// Rolls the attack, then damage. A critical doubles the damage dice and
/// the target's DR is subtracted from the doubled total.
pub fn attack(
    request: &AttackRequest,
    bindings: &Bindings,
    config: &RulesetConfig,
    dice: &mut impl DieSource,
) -> Result<AttackOutcome, FormulaError> {
    let check_request = request
        .check
        .clone()
        .with_target(request.target.map(|target| i32::from(*target.defense_value)));
    let attack = check(&check_request, config, dice)?;

    let damage_formula = match attack.is_critical {
        true => request.damage.double_dice(),
        false => request.damage.clone(),
    };
    let damage = damage_formula.evaluate(bindings, dice)?;

    let damage_reduction = match request.target {
        Some(target) => target.damage_reduction,
        None => {
            tracing::warn!(label = %request.check.label, "attack has no target, using DR 0");
            DamageReduction::new(0)
        }
    };
    let final_damage = damage
        .total
        .saturating_sub(i32::from(*damage_reduction))
        .max(0);

    tracing::debug!(
        label = %request.check.label,
        attack = attack.total,
        critical = attack.is_critical,
        damage = damage.total,
        final_damage,
        "resolved attack"
    );

    Ok(AttackOutcome {
        hit: attack.pass,
        attack,
        damage,
        damage_reduction,
        final_damage,
    })
}

/// Negative costs are rejected rather than treated as a gain.
pub fn spend_willpower(current: WillpowerPoints, cost: WillpowerPoints) -> WillpowerSpend {
    if *cost < 0 {
        tracing::warn!(cost = *cost, "negative willpower cost");
        return WillpowerSpend::NegativeCost { cost };
    }

    match current >= cost {
        true => WillpowerSpend::Spent {
            remaining: current - cost,
        },
        false => {
            tracing::warn!(
                current = *current,
                cost = *cost,
                "not enough willpower"
            );
            WillpowerSpend::Insufficient { current, cost }
        }
    }
}

/// Builds an attack with an owned weapon: finesse weapons use DEX when it is
/// better, a matching weapon skill adds its value and the attribute modifier
/// is added to damage.
pub fn weapon_attack(
    attacker: &CharacterRecord,
    name: &str,
    weapon: &WeaponData,
    advantage: Advantage,
    bonus: i32,
    target: Option<TargetDefenses>,
) -> Result<AttackRequest, FormulaError> {
    let modifiers = attacker.abilities.modifiers();

    let attribute = match weapon.is_finesse()
        && modifiers.dexterity > modifiers.get(weapon.attribute)
    {
        true => AbilityType::Dexterity,
        false => weapon.attribute,
    };
    let modifier = i32::from(*modifiers.get(attribute));

    let skill_bonus = weapon
        .weapon_skill
        .as_deref()
        .map(|skill| attacker.weapon_skill_bonus(skill))
        .unwrap_or(0);

    let damage = DiceFormula::parse(weapon.damage_formula())?.with_constant(modifier);

    Ok(AttackRequest {
        check: CheckRequest::new(&format!("{name} ({attribute})"), modifier)
            .with_bonus(bonus.saturating_add(i32::from(skill_bonus)))
            .with_advantage(advantage),
        damage,
        target,
    })
}

/// Spends the spell's willpower cost, then rolls its attack. Nothing is
/// rolled when the caster cannot pay.
pub fn cast_spell(
    caster: &CharacterRecord,
    name: &str,
    spell: &SpellData,
    advantage: Advantage,
    target: Option<TargetDefenses>,
    config: &RulesetConfig,
    dice: &mut impl DieSource,
) -> Result<CastOutcome, FormulaError> {
    let remaining_willpower = match spend_willpower(
        caster.current_willpower,
        WillpowerPoints::new(spell.willpower_cost),
    ) {
        WillpowerSpend::Spent { remaining } => remaining,
        WillpowerSpend::Insufficient { current, cost } => {
            return Ok(CastOutcome::Insufficient { current, cost });
        }
        WillpowerSpend::NegativeCost { cost } => {
            return Ok(CastOutcome::NegativeCost { cost });
        }
    };

    let attribute = spell.attack_attribute;
    let modifier = i32::from(*caster.abilities.modifiers().get(attribute));
    let check_request =
        CheckRequest::new(&format!("{name} ({attribute})"), modifier).with_advantage(advantage);

    let roll = match &spell.damage {
        Some(damage) => SpellRoll::Attack(attack(
            &AttackRequest {
                check: check_request,
                damage: DiceFormula::parse(damage)?,
                target,
            },
            &caster.roll_data(),
            config,
            dice,
        )?),
        None => SpellRoll::Check(check(&check_request, config, dice)?),
    };

    Ok(CastOutcome::Cast {
        remaining_willpower,
        roll,
    })
}

/// Resolves a save prompted by `caster`. With a target the target rolls and
/// passes on meeting the DC; without one the caster's own roll is reported.
pub fn resolve_save(
    caster: &CharacterRecord,
    target: Option<&CharacterRecord>,
    save: &str,
    config: &RulesetConfig,
    dice: &mut impl DieSource,
) -> Result<SaveOutcome, FormulaError> {
    let Some(expression) = SaveExpression::parse_with_default(save, config.default_save_dc)
    else {
        return Ok(SaveOutcome::NotConfigured);
    };

    let roller = target.unwrap_or(caster);
    let dc_table = match config.save_dc_source {
        SaveDcSource::Defender => roller.abilities.modifiers(),
        SaveDcSource::Caster => caster.abilities.modifiers(),
    };
    let dc = compute_dc(Some(&dc_table), &expression);

    let modifier = i32::from(*roller.abilities.modifiers().get(expression.ability));
    let request = CheckRequest::new(&format!("{} save", expression.ability), modifier)
        .with_target(target.map(|_| dc));
    let roll = check(&request, config, dice)?;

    tracing::debug!(save = %expression, dc, total = roll.total, pass = ?roll.pass, "resolved save");

    Ok(SaveOutcome::Rolled {
        expression,
        dc,
        roll,
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        abilities::{AbilityScores, AbilityType},
        archetypes::Archetype,
        character::{CharacterRecord, CustomSkill},
        combat::{
            Advantage, AttackRequest, CastOutcome, CheckRequest, SaveOutcome, SpellRoll,
            TargetDefenses, WillpowerSpend, attack, cast_spell, check, resolve_save,
            spend_willpower, weapon_attack,
        },
        config::{RulesetConfig, SaveDcSource},
        dice::{Bindings, DiceFormula, ScriptedDice},
        items::{SpellData, WeaponData},
        types::{DamageReduction, DefenseValue, Level, WillpowerPoints},
    };

    fn character(abilities: AbilityScores, archetype: Archetype) -> CharacterRecord {
        CharacterRecord::new(
            1,
            "Testington",
            abilities,
            archetype,
            Level::new(1),
            &RulesetConfig::default(),
        )
    }

    fn defenses(damage_reduction: i16, defense_value: i16) -> Option<TargetDefenses> {
        Some(TargetDefenses {
            damage_reduction: DamageReduction::new(damage_reduction),
            defense_value: DefenseValue::new(defense_value),
        })
    }

    fn attack_request(damage: &str, target: Option<TargetDefenses>) -> AttackRequest {
        AttackRequest {
            check: CheckRequest::new("Sword", 0),
            damage: DiceFormula::parse(damage).unwrap(),
            target,
        }
    }

    #[test]
    fn advantage_check_keeps_highest() {
        let request = CheckRequest::new("DEX check", 2).with_advantage(Advantage::Advantage);
        let mut dice = ScriptedDice::new([5, 17]);

        let outcome = check(&request, &RulesetConfig::default(), &mut dice).unwrap();

        assert_eq!(outcome.formula, "2d20kh1 + 2");
        assert_eq!(outcome.natural, Some(17));
        assert_eq!(outcome.total, 19);
        assert_eq!(outcome.pass, None);
    }

    #[test]
    fn check_against_target() {
        let config = RulesetConfig::default();
        let request = CheckRequest::new("STR check", 1)
            .with_bonus(2)
            .with_target(config.difficulties.from_name("moderate"));

        let pass = check(&request, &config, &mut ScriptedDice::new([12])).unwrap();
        assert_eq!(pass.total, 15);
        assert_eq!(pass.pass, Some(true));

        let fail = check(&request, &config, &mut ScriptedDice::new([11])).unwrap();
        assert_eq!(fail.pass, Some(false));
    }

    #[test]
    fn critical_and_fumble_follow_config() {
        let request = CheckRequest::new("check", 0);
        let strict = RulesetConfig {
            critical_on_natural_max: false,
            fumble_on_natural_one: false,
            ..Default::default()
        };

        let critical = check(&request, &RulesetConfig::default(), &mut ScriptedDice::new([20]))
            .unwrap();
        assert!(critical.is_critical);

        let plain = check(&request, &strict, &mut ScriptedDice::new([20])).unwrap();
        assert!(!plain.is_critical);

        let fumble = check(&request, &strict, &mut ScriptedDice::new([1])).unwrap();
        assert!(!fumble.is_fumble);
    }

    #[test]
    fn critical_doubles_damage_dice_before_reduction() {
        let request = attack_request("1d8 + 2", defenses(3, 12));
        let mut dice = ScriptedDice::new([20, 3, 5]);

        let outcome = attack(&request, &Bindings::new(), &RulesetConfig::default(), &mut dice)
            .unwrap();

        assert!(outcome.attack.is_critical);
        assert_eq!(outcome.hit, Some(true));
        assert_eq!(outcome.damage.formula, "2d8 + 2");
        assert_eq!(outcome.damage.total, 10);
        assert_eq!(outcome.final_damage, 7);
    }

    #[test]
    fn normal_hit_keeps_damage_dice() {
        let request = attack_request("1d8 + 2", defenses(5, 14));
        let mut dice = ScriptedDice::new([12, 6]);

        let outcome = attack(&request, &Bindings::new(), &RulesetConfig::default(), &mut dice)
            .unwrap();

        assert_eq!(outcome.hit, Some(false));
        assert_eq!(outcome.damage.formula, "1d8 + 2");
        assert_eq!(outcome.final_damage, 3);
        assert_eq!(dice.rolled(), 2);
    }

    #[test]
    fn reduction_never_makes_damage_negative() {
        let request = attack_request("1d4", defenses(6, 10));
        let mut dice = ScriptedDice::new([10, 2]);

        let outcome = attack(&request, &Bindings::new(), &RulesetConfig::default(), &mut dice)
            .unwrap();

        assert_eq!(outcome.final_damage, 0);
    }

    #[test]
    fn missing_target_means_no_reduction() {
        let request = attack_request("1d6 + 3", None);
        let mut dice = ScriptedDice::new([10, 4]);

        let outcome = attack(&request, &Bindings::new(), &RulesetConfig::default(), &mut dice)
            .unwrap();

        assert_eq!(outcome.hit, None);
        assert_eq!(outcome.damage_reduction, DamageReduction::new(0));
        assert_eq!(outcome.final_damage, 7);
    }

    #[test]
    fn willpower_spend() {
        assert_eq!(
            spend_willpower(WillpowerPoints::new(2), WillpowerPoints::new(3)),
            WillpowerSpend::Insufficient {
                current: WillpowerPoints::new(2),
                cost: WillpowerPoints::new(3)
            }
        );
        assert_eq!(
            spend_willpower(WillpowerPoints::new(5), WillpowerPoints::new(3)),
            WillpowerSpend::Spent {
                remaining: WillpowerPoints::new(2)
            }
        );
    }

    #[test]
    fn negative_willpower_cost_is_rejected() {
        assert_eq!(
            spend_willpower(WillpowerPoints::new(2), WillpowerPoints::new(-3)),
            WillpowerSpend::NegativeCost {
                cost: WillpowerPoints::new(-3)
            }
        );
        assert_eq!(
            spend_willpower(WillpowerPoints::new(2), WillpowerPoints::new(0)),
            WillpowerSpend::Spent {
                remaining: WillpowerPoints::new(2)
            }
        );
    }

    #[test]
    fn unknown_ability_key_rolls_neutral() {
        let hero = character(AbilityScores::new(10, 16, 10, 10, 10, 10), Archetype::Rogue);

        let known = CheckRequest::ability_key(&hero, "Dexterity");
        assert_eq!(known.label, "DEX check");
        assert_eq!(known.modifier, 3);

        let unknown = CheckRequest::ability_key(&hero, "luck");
        assert_eq!(unknown.label, "LUCK check");
        assert_eq!(unknown.modifier, 0);

        let outcome = check(
            &unknown,
            &RulesetConfig::default(),
            &mut ScriptedDice::new([9]),
        )
        .unwrap();
        assert_eq!(outcome.total, 9);
    }

    #[test]
    fn huge_bonus_does_not_overflow_check() {
        let request = CheckRequest::new("Reckless", i32::MAX).with_bonus(5);

        assert_eq!(request.formula().to_string(), "1d20 + 2147483647");
        assert!(check(
            &request,
            &RulesetConfig::default(),
            &mut ScriptedDice::new([3])
        )
        .is_err());
    }

    #[test]
    fn finesse_weapon_uses_better_dexterity_and_skill() {
        let mut rogue = character(AbilityScores::new(10, 16, 10, 10, 10, 10), Archetype::Rogue);
        rogue.weapon_skills = vec![CustomSkill {
            name: "Short Blades".to_string(),
            value: 1,
        }];
        let dagger = WeaponData {
            damage: "1d4".to_string(),
            versatile: false,
            versatile_damage: None,
            two_handed: false,
            attribute: AbilityType::Strength,
            weapon_skill: Some("short_blades".to_string()),
            properties: vec!["Finesse".to_string(), "Thrown".to_string()],
        };

        let request = weapon_attack(&rogue, "Dagger", &dagger, Advantage::Normal, 0, None).unwrap();

        assert_eq!(request.check.label, "Dagger (DEX)");
        assert_eq!(request.check.modifier, 3);
        assert_eq!(request.check.bonus, 1);
        assert_eq!(request.damage.to_string(), "1d4 + 3");
    }

    #[test]
    fn versatile_two_handed_weapon_damage() {
        let fighter = character(AbilityScores::new(8, 10, 10, 10, 10, 10), Archetype::Warrior);
        let longsword = WeaponData {
            damage: "1d8".to_string(),
            versatile: true,
            versatile_damage: Some("1d10".to_string()),
            two_handed: true,
            attribute: AbilityType::Strength,
            weapon_skill: None,
            properties: vec![],
        };

        let request =
            weapon_attack(&fighter, "Longsword", &longsword, Advantage::Normal, 0, None).unwrap();

        assert_eq!(request.check.label, "Longsword (STR)");
        assert_eq!(request.damage.to_string(), "1d10 - 1");
    }

    #[test]
    fn spell_without_willpower_rolls_nothing() {
        let mut caster =
            character(AbilityScores::new(10, 10, 10, 16, 10, 10), Archetype::Spellcaster);
        caster.current_willpower = WillpowerPoints::new(2);
        let spell = SpellData {
            willpower_cost: 3,
            damage: Some("2d6".to_string()),
            ..Default::default()
        };
        let mut dice = ScriptedDice::new([10]);

        let outcome = cast_spell(
            &caster,
            "Firebolt",
            &spell,
            Advantage::Normal,
            None,
            &RulesetConfig::default(),
            &mut dice,
        )
        .unwrap();

        assert_eq!(
            outcome,
            CastOutcome::Insufficient {
                current: WillpowerPoints::new(2),
                cost: WillpowerPoints::new(3)
            }
        );
        assert_eq!(dice.rolled(), 0);
    }

    #[test]
    fn spell_spends_willpower_and_rolls_damage() {
        let caster = character(AbilityScores::new(10, 10, 10, 16, 10, 10), Archetype::Spellcaster);
        assert_eq!(caster.current_willpower, WillpowerPoints::new(8));
        let spell = SpellData {
            willpower_cost: 3,
            damage: Some("1d6 + @int".to_string()),
            ..Default::default()
        };
        let mut dice = ScriptedDice::new([15, 4]);

        let outcome = cast_spell(
            &caster,
            "Firebolt",
            &spell,
            Advantage::Normal,
            defenses(1, 12),
            &RulesetConfig::default(),
            &mut dice,
        )
        .unwrap();

        let CastOutcome::Cast {
            remaining_willpower,
            roll: SpellRoll::Attack(attack),
        } = outcome
        else {
            panic!("expected a damaging cast");
        };
        assert_eq!(remaining_willpower, WillpowerPoints::new(5));
        assert_eq!(attack.attack.total, 18);
        assert_eq!(attack.hit, Some(true));
        assert_eq!(attack.damage.total, 7);
        assert_eq!(attack.final_damage, 6);
    }

    #[test]
    fn spell_without_damage_is_a_check() {
        let caster = character(AbilityScores::default(), Archetype::SpiritTouched);
        let spell = SpellData::default();

        let outcome = cast_spell(
            &caster,
            "Light",
            &spell,
            Advantage::Normal,
            None,
            &RulesetConfig::default(),
            &mut ScriptedDice::new([9]),
        )
        .unwrap();

        assert!(matches!(
            outcome,
            CastOutcome::Cast {
                roll: SpellRoll::Check(_),
                ..
            }
        ));
    }

    #[test]
    fn target_rolls_against_dc() {
        let caster = character(AbilityScores::new(10, 10, 10, 16, 10, 10), Archetype::Spellcaster);
        let target = character(AbilityScores::new(10, 10, 10, 8, 14, 10), Archetype::None);
        let config = RulesetConfig::default();

        let outcome = resolve_save(
            &caster,
            Some(&target),
            "WIS vs DC 10 + INT",
            &config,
            &mut ScriptedDice::new([6]),
        )
        .unwrap();

        let SaveOutcome::Rolled { dc, roll, .. } = outcome else {
            panic!("expected a save roll");
        };
        // defender's INT is -1
        assert_eq!(dc, 9);
        assert_eq!(roll.total, 8);
        assert_eq!(roll.pass, Some(false));

        let caster_side = RulesetConfig {
            save_dc_source: SaveDcSource::Caster,
            ..Default::default()
        };
        let outcome = resolve_save(
            &caster,
            Some(&target),
            "WIS vs DC 10 + INT",
            &caster_side,
            &mut ScriptedDice::new([6]),
        )
        .unwrap();
        assert!(matches!(outcome, SaveOutcome::Rolled { dc: 13, .. }));
    }

    #[test]
    fn untargeted_save_has_no_verdict() {
        let caster = character(AbilityScores::default(), Archetype::None);

        let outcome = resolve_save(
            &caster,
            None,
            "dex vs 12",
            &RulesetConfig::default(),
            &mut ScriptedDice::new([19]),
        )
        .unwrap();

        let SaveOutcome::Rolled { dc, roll, .. } = outcome else {
            panic!("expected a save roll");
        };
        assert_eq!(dc, 12);
        assert_eq!(roll.total, 19);
        assert_eq!(roll.pass, None);
    }

    #[test]
    fn missing_save_formula() {
        let caster = character(AbilityScores::default(), Archetype::None);
        let mut dice = ScriptedDice::new([10]);

        let outcome = resolve_save(&caster, None, "", &RulesetConfig::default(), &mut dice);

        assert_eq!(outcome, Ok(SaveOutcome::NotConfigured));
        assert_eq!(dice.rolled(), 0);
    }
}
