use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use godfall_core::{character, roll};
use godfall_database::MessageContent;
use godfall_rules::{
    abilities::{AbilityScores, AbilityType},
    archetypes::Archetype,
    character::{ActorKind, CharacterRecord, CustomSkill},
    combat::{Advantage, AttackOutcome, CastOutcome, SaveOutcome, SpellRoll, WillpowerSpend},
    dice::{RandomDice, RollOutcome},
    items::{DurabilityChange, ItemKind, ItemRecord},
    types::{AbilityScore, HitPoints, Level, WillpowerPoints},
};
use color_print::{cprint, cprintln};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod settings;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RollOptions {
    #[arg(long, default_value_t = false)]
    advantage: bool,
    #[arg(long, default_value_t = false)]
    disadvantage: bool,
    /// Situational bonus added to the d20
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    bonus: i32,
}

impl RollOptions {
    fn advantage(&self) -> Advantage {
        Advantage::from_flags(self.advantage, self.disadvantage)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create new Character
    CreateCharacter {
        #[arg(short, long)]
        name: String,
        #[arg(long, default_value_t = 10)]
        str: i16,
        #[arg(long, default_value_t = 10)]
        dex: i16,
        #[arg(long, default_value_t = 10)]
        con: i16,
        #[arg(long, default_value_t = 10)]
        int: i16,
        #[arg(long, default_value_t = 10)]
        wis: i16,
        #[arg(long, default_value_t = 10)]
        cha: i16,
        /// warrior, rogue, spellcaster, spirit-touched or none
        #[arg(short, long, default_value = "none", value_parser = parse_archetype)]
        archetype: Archetype,
        #[arg(short, long, default_value_t = 1)]
        level: u16,
        #[arg(long, default_value_t = false)]
        npc: bool,
    },

    /// List characters
    List,

    /// Show a character sheet
    Show { id: i64 },

    /// Set an ability score
    SetAbility {
        id: i64,
        #[arg(value_parser = parse_ability)]
        ability: AbilityType,
        score: i16,
    },

    SetLevel {
        id: i64,
        level: u16,
    },

    SetArchetype {
        id: i64,
        #[arg(value_parser = parse_archetype)]
        archetype: Archetype,
    },

    /// Set current hit points
    SetHp {
        id: i64,
        #[arg(allow_hyphen_values = true)]
        hit_points: i16,
    },

    /// Add or update a weapon skill
    WeaponSkill {
        id: i64,
        name: String,
        #[arg(allow_hyphen_values = true)]
        value: i16,
    },

    /// Add or update a background
    Background {
        id: i64,
        name: String,
        #[arg(allow_hyphen_values = true)]
        value: i16,
    },

    /// Add an item, e.g. --data '{"type":"armor","damage_reduction":3,"evasion_penalty":-1}'
    AddItem {
        id: i64,
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = r#"{"type":"gear"}"#)]
        data: String,
        #[arg(short, long, default_value_t = 0)]
        weight: u32,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
        #[arg(long)]
        durability: Option<i16>,
    },

    RemoveItem {
        id: i64,
        item: i64,
    },

    Equip {
        id: i64,
        item: i64,
    },

    Unequip {
        id: i64,
        item: i64,
    },

    DamageItem {
        id: i64,
        item: i64,
        amount: i16,
    },

    RepairItem {
        id: i64,
        item: i64,
        amount: i16,
    },

    /// Roll an ability check
    Check {
        id: i64,
        /// Ability key such as "dex"; unknown keys roll with modifier 0
        ability: String,
        /// Number or difficulty name (easy, moderate, hard, extreme)
        #[arg(long)]
        dc: Option<String>,
        #[command(flatten)]
        options: RollOptions,
    },

    /// Roll a formula such as "2d6 + @str"
    Roll {
        id: i64,
        formula: String,
        #[arg(short, long)]
        flavor: Option<String>,
    },

    /// Attack with an ability and a damage formula
    Attack {
        id: i64,
        #[arg(value_parser = parse_ability)]
        ability: AbilityType,
        damage: String,
        #[arg(short, long)]
        target: Option<i64>,
        #[command(flatten)]
        options: RollOptions,
    },

    /// Attack with an owned weapon
    WeaponAttack {
        id: i64,
        item: i64,
        #[arg(short, long)]
        target: Option<i64>,
        #[command(flatten)]
        options: RollOptions,
    },

    /// Cast an owned spell or spirit ability
    Cast {
        id: i64,
        item: i64,
        #[arg(short, long)]
        target: Option<i64>,
        #[arg(long, default_value_t = false)]
        advantage: bool,
        #[arg(long, default_value_t = false)]
        disadvantage: bool,
    },

    /// Prompt a save against a spell's save formula
    Save {
        id: i64,
        item: i64,
        #[arg(short, long)]
        target: Option<i64>,
    },

    /// Spend willpower points
    SpendWp { id: i64, cost: i16 },

    /// Show the latest chat messages
    Log {
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
}

fn parse_ability(value: &str) -> Result<AbilityType, String> {
    AbilityType::from_ability_str(value).ok_or_else(|| format!("unknown ability '{value}'"))
}

fn parse_archetype(value: &str) -> Result<Archetype, String> {
    Archetype::from_archetype_str(value).ok_or_else(|| format!("unknown archetype '{value}'"))
}

fn upsert_skill(skills: &mut Vec<CustomSkill>, name: String, value: i16) {
    let key = godfall_rules::character::skill_key(&name);
    match skills.iter_mut().find(|skill| skill.key() == key) {
        Some(skill) => skill.value = value,
        None => skills.push(CustomSkill { name, value }),
    }
}

fn print_sheet(character: &CharacterRecord) {
    let derived = &character.derived;

    cprintln!(
        "<bold>{}</> (#{}) level {} {:?}",
        character.name,
        character.id,
        character.level,
        character.archetype
    );
    cprintln!(
        "<red>HP {}/{}</>  <blue>WP {}/{}</>",
        character.current_hit_points,
        derived.max_hit_points,
        character.current_willpower,
        derived.max_willpower
    );

    for ability in AbilityType::ALL {
        print!(
            "{ability} {} ({:+})  ",
            character.abilities.get(ability),
            *derived.modifiers.get(ability)
        );
    }
    println!();

    println!(
        "DV {}  Evasion {:+}  Initiative {:+}  DR {}",
        derived.defense_value,
        *derived.evasion,
        *derived.initiative,
        derived.equipment.damage_reduction
    );
    if derived.equipment.shield.hardness != Default::default() {
        println!(
            "Shield hardness {}  HP {}",
            derived.equipment.shield.hardness, derived.equipment.shield.hp
        );
    }
    println!(
        "Load {}/{} ({:?})",
        derived.encumbrance.weight, derived.encumbrance.capacity, derived.encumbrance.tier
    );

    for item in &character.inventory {
        let equipped = if item.equipped { "*" } else { " " };
        cprint!(
            "{} #{} <bold>{}</> [{}]",
            equipped,
            item.id,
            item.name,
            item.kind.type_name()
        );
        if let Some(durability) = item.durability {
            print!(" {}/{}", durability.current, durability.max);
        }
        if item.is_broken() {
            cprint!(" <red>broken</>");
        }
        println!(" x{}", item.quantity);
    }

    for skill in &character.weapon_skills {
        println!("Weapon skill {} {:+}", skill.name, skill.value);
    }
    for background in &character.backgrounds {
        println!("Background {} {:+}", background.name, background.value);
    }
}

fn print_roll(outcome: &RollOutcome) {
    let faces: Vec<String> = outcome
        .dice
        .iter()
        .flat_map(|term| term.results.iter())
        .map(|result| match result.kept {
            true => result.value.to_string(),
            false => format!("({})", result.value),
        })
        .collect();

    print!("{} [{}] = {}", outcome.formula, faces.join(", "), outcome.total);
    if outcome.is_critical {
        cprint!(" <green>critical!</>");
    }
    if outcome.is_fumble {
        cprint!(" <red>fumble!</>");
    }
    match outcome.pass {
        Some(true) => cprintln!(" <green>pass</>"),
        Some(false) => cprintln!(" <red>fail</>"),
        None => println!(),
    }
}

fn print_attack(outcome: &AttackOutcome) {
    print!("Attack: ");
    print_roll(&outcome.attack);
    match outcome.hit {
        Some(true) => cprintln!("<green>Hit</>"),
        Some(false) => cprintln!("<yellow>Miss</>"),
        None => {}
    }
    print!("Damage: ");
    print_roll(&outcome.damage);
    println!(
        "{} damage after DR {}",
        outcome.final_damage, outcome.damage_reduction
    );
}

fn print_durability(change: DurabilityChange) {
    match change {
        DurabilityChange::Intact(durability) => {
            println!("Durability {}/{}", durability.current, durability.max)
        }
        DurabilityChange::Broken(durability) => {
            cprintln!("<red>Broken!</> Durability 0/{}", durability.max)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "godfall=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = settings::load_ruleset()?;

    let pool = godfall_database::get_pool().await?;
    godfall_database::init(&pool).await?;

    let mut dice = RandomDice::thread();

    match args.command {
        Commands::CreateCharacter {
            name,
            str,
            dex,
            con,
            int,
            wis,
            cha,
            archetype,
            level,
            npc,
        } => {
            let kind = match npc {
                true => ActorKind::Npc,
                false => ActorKind::Character,
            };

            let character = character::create_character(
                &pool,
                &config,
                &name,
                kind,
                AbilityScores::new(str, dex, con, int, wis, cha),
                archetype,
                Level::new(level),
            )
            .await?;

            println!("{}", character.id);
        }
        Commands::List => {
            for summary in godfall_database::list_characters(&pool).await? {
                println!("#{} {}", summary.id, summary.name);
            }
        }
        Commands::Show { id } => {
            print_sheet(&character::get_character(&pool, &config, id).await?);
        }
        Commands::SetAbility { id, ability, score } => {
            let character = character::set_ability_score(
                &pool,
                &config,
                id,
                ability,
                AbilityScore::new(score),
            )
            .await?;
            print_sheet(&character);
        }
        Commands::SetLevel { id, level } => {
            print_sheet(&character::set_level(&pool, &config, id, Level::new(level)).await?);
        }
        Commands::SetArchetype { id, archetype } => {
            print_sheet(&character::set_archetype(&pool, &config, id, archetype).await?);
        }
        Commands::SetHp { id, hit_points } => {
            let character =
                character::set_hit_points(&pool, &config, id, HitPoints::new(hit_points)).await?;
            print_sheet(&character);
        }
        Commands::WeaponSkill { id, name, value } => {
            let mut skills = character::get_character(&pool, &config, id)
                .await?
                .weapon_skills;
            upsert_skill(&mut skills, name, value);
            character::set_weapon_skills(&pool, &config, id, skills).await?;
        }
        Commands::Background { id, name, value } => {
            let mut backgrounds = character::get_character(&pool, &config, id)
                .await?
                .backgrounds;
            upsert_skill(&mut backgrounds, name, value);
            character::set_backgrounds(&pool, &config, id, backgrounds).await?;
        }
        Commands::AddItem {
            id,
            name,
            data,
            weight,
            quantity,
            durability,
        } => {
            let kind = serde_json::from_str::<ItemKind>(&data)
                .map_err(|error| anyhow!("Invalid item data: {error}"))?;

            let mut item = ItemRecord::new(0, &name, kind).with_weight(weight, quantity);
            if let Some(durability) = durability {
                item = item.with_durability(durability);
            }

            let item_id = character::add_item(&pool, &config, id, &item).await?;
            println!("{item_id}");
        }
        Commands::RemoveItem { id, item } => {
            character::remove_item(&pool, &config, id, item).await?;
        }
        Commands::Equip { id, item } => {
            print_sheet(&character::equip_item(&pool, &config, id, item).await?);
        }
        Commands::Unequip { id, item } => {
            print_sheet(&character::unequip_item(&pool, &config, id, item).await?);
        }
        Commands::DamageItem { id, item, amount } => {
            print_durability(
                character::damage_item(&pool, &config, id, item, HitPoints::new(amount)).await?,
            );
        }
        Commands::RepairItem { id, item, amount } => {
            print_durability(
                character::repair_item(&pool, &config, id, item, HitPoints::new(amount)).await?,
            );
        }
        Commands::Check {
            id,
            ability,
            dc,
            options,
        } => {
            let target = dc
                .map(|dc| roll::difficulty(&config, &dc))
                .transpose()?;

            let outcome = roll::roll_check(
                &pool,
                &config,
                &mut dice,
                id,
                &ability,
                options.advantage(),
                options.bonus,
                target,
            )
            .await?;
            print_roll(&outcome);
        }
        Commands::Roll {
            id,
            formula,
            flavor,
        } => {
            let outcome =
                roll::roll_formula(&pool, &config, &mut dice, id, &formula, flavor.as_deref())
                    .await?;
            print_roll(&outcome);
        }
        Commands::Attack {
            id,
            ability,
            damage,
            target,
            options,
        } => {
            let outcome = roll::roll_attack(
                &pool,
                &config,
                &mut dice,
                id,
                ability,
                &damage,
                options.advantage(),
                options.bonus,
                target,
            )
            .await?;
            print_attack(&outcome);
        }
        Commands::WeaponAttack {
            id,
            item,
            target,
            options,
        } => {
            let outcome = roll::roll_weapon_attack(
                &pool,
                &config,
                &mut dice,
                id,
                item,
                options.advantage(),
                options.bonus,
                target,
            )
            .await?;
            print_attack(&outcome);
        }
        Commands::Cast {
            id,
            item,
            target,
            advantage,
            disadvantage,
        } => {
            let outcome = roll::cast_spell(
                &pool,
                &config,
                &mut dice,
                id,
                item,
                Advantage::from_flags(advantage, disadvantage),
                target,
            )
            .await?;

            match outcome {
                CastOutcome::Insufficient { current, cost } => {
                    cprintln!("<yellow>Not enough willpower:</> {} of {}", current, cost)
                }
                CastOutcome::NegativeCost { cost } => {
                    cprintln!("<red>Invalid willpower cost:</> {}", cost)
                }
                CastOutcome::Cast {
                    remaining_willpower,
                    roll,
                } => {
                    match roll {
                        SpellRoll::Check(outcome) => print_roll(&outcome),
                        SpellRoll::Attack(outcome) => print_attack(&outcome),
                    }
                    cprintln!("<blue>WP {}</>", remaining_willpower);
                }
            }
        }
        Commands::Save { id, item, target } => {
            let outcome =
                roll::prompt_save(&pool, &config, &mut dice, id, item, target).await?;

            match outcome {
                SaveOutcome::NotConfigured => println!("No save configured"),
                SaveOutcome::Rolled {
                    expression,
                    dc,
                    roll,
                } => {
                    print!("{expression} (DC {dc}): ");
                    print_roll(&roll);
                }
            }
        }
        Commands::SpendWp { id, cost } => {
            match roll::spend_willpower(&pool, &config, id, WillpowerPoints::new(cost)).await? {
                WillpowerSpend::Spent { remaining } => cprintln!("<blue>WP {}</>", remaining),
                WillpowerSpend::Insufficient { current, cost } => {
                    cprintln!("<yellow>Not enough willpower:</> {} of {}", current, cost)
                }
                WillpowerSpend::NegativeCost { cost } => {
                    cprintln!("<red>Invalid willpower cost:</> {}", cost)
                }
            }
        }
        Commands::Log { limit } => {
            for message in godfall_database::get_messages(&pool, limit).await? {
                cprintln!("<bold>{}</>: {}", message.speaker, message.flavor);
                match message.content {
                    MessageContent::Rolls(rolls) => rolls.iter().for_each(|roll| {
                        print!("  ");
                        print_roll(roll);
                    }),
                    MessageContent::Text(text) => println!("  {text}"),
                }
            }
        }
    }

    Ok(())
}
