use futures::TryStreamExt;
use godfall_rules::{
    abilities::AbilityScores,
    archetypes::Archetype,
    character::{ActorKind, CharacterRecord, CustomSkill, DerivedStatBlock},
    dice::RollOutcome,
    items::{Durability, ItemKind, ItemRecord, ItemValidationError},
    types::{HitPoints, Level, Quantity, Weight, WillpowerPoints},
};
use serde_json::to_string;
use sqlx::types::Json;
use thiserror::Error;

pub type Pool = sqlx::Pool<sqlx::Sqlite>;

/// Version written to every character row; rows with any other version are
/// refused on read.
pub const SCHEMA_VERSION: i64 = 1;

pub async fn get_pool() -> Result<Pool, DatabaseError> {
    let database_url = if let Ok(url) = std::env::var("DATABASE_URL") {
        std::path::PathBuf::from(url.replace("sqlite://", ""))
    } else {
        let mut url = dirs::data_local_dir().ok_or(DatabaseError::NoDataDirectory)?;
        url.push("godfall");

        if !url.exists() {
            std::fs::create_dir_all(&url)?;
        }

        url.push("data.db");

        url
    };

    tracing::debug!(path = %database_url.display(), "opening database");

    let options = sqlx::sqlite::SqliteConnectOptions::new()
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .filename(database_url)
        .create_if_missing(true);

    Ok(sqlx::SqlitePool::connect_with(options).await?)
}

/// A migrated pool over a private in-memory database.
pub async fn in_memory_pool() -> Result<Pool, DatabaseError> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    init(&pool).await?;

    Ok(pool)
}

pub async fn init(pool: &Pool) -> Result<(), DatabaseError> {
    sqlx::migrate!("./migrations").run(pool).await?;

    Ok(())
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Character not found. Did you create one?")]
    CharacterNotFound,

    #[error("Item not found")]
    ItemNotFound,

    #[error("Unsupported schema version {0}")]
    UnsupportedSchema(i64),

    #[error("Invalid item: {0}")]
    InvalidItem(#[from] ItemValidationError),

    #[error("No local data directory available")]
    NoDataDirectory,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

#[derive(Debug, sqlx::FromRow)]
struct CharacterRow {
    id: i64,
    schema_version: i64,
    name: String,
    kind: Json<ActorKind>,
    archetype: Json<Archetype>,
    level: i64,
    abilities: Json<AbilityScores>,
    current_hit_points: i64,
    current_willpower: i64,
    weapon_skills: Json<Vec<CustomSkill>>,
    backgrounds: Json<Vec<CustomSkill>>,
    derived: Json<DerivedStatBlock>,
}

impl CharacterRow {
    fn into_record(self, inventory: Vec<ItemRecord>) -> Result<CharacterRecord, DatabaseError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(DatabaseError::UnsupportedSchema(self.schema_version));
        }

        Ok(CharacterRecord {
            id: self.id,
            name: self.name,
            kind: self.kind.0,
            archetype: self.archetype.0,
            level: Level::new(self.level as u16),
            abilities: self.abilities.0,
            current_hit_points: HitPoints::new(self.current_hit_points as i16),
            current_willpower: WillpowerPoints::new(self.current_willpower as i16),
            inventory,
            weapon_skills: self.weapon_skills.0,
            backgrounds: self.backgrounds.0,
            derived: self.derived.0,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: i64,
    name: String,
    data: Json<ItemKind>,
    equipped: bool,
    weight: i64,
    quantity: i64,
    durability: Option<Json<Durability>>,
}

impl From<ItemRow> for ItemRecord {
    fn from(row: ItemRow) -> Self {
        ItemRecord {
            id: row.id,
            name: row.name,
            kind: row.data.0,
            equipped: row.equipped,
            weight: Weight::new(row.weight as u32),
            quantity: Quantity::new(row.quantity as u32),
            durability: row.durability.map(|durability| durability.0),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct CharacterSummary {
    pub id: i64,
    pub name: String,
}

pub async fn create_character(
    pool: &Pool,
    character: &CharacterRecord,
) -> Result<i64, DatabaseError> {
    let result = sqlx::query(
        r#"
            insert into characters (
            schema_version,
            name,
            kind,
            archetype,
            level,
            abilities,
            current_hit_points,
            current_willpower,
            weapon_skills,
            backgrounds,
            derived)
            values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(SCHEMA_VERSION)
    .bind(&character.name)
    .bind(to_string(&character.kind)?)
    .bind(to_string(&character.archetype)?)
    .bind(*character.level)
    .bind(to_string(&character.abilities)?)
    .bind(*character.current_hit_points)
    .bind(*character.current_willpower)
    .bind(to_string(&character.weapon_skills)?)
    .bind(to_string(&character.backgrounds)?)
    .bind(to_string(&character.derived)?)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();

    for item in &character.inventory {
        add_item(pool, id, item).await?;
    }

    tracing::debug!(character = id, name = %character.name, "created character");

    Ok(id)
}

pub async fn get_character(pool: &Pool, id: i64) -> Result<CharacterRecord, DatabaseError> {
    let row = sqlx::query_as::<_, CharacterRow>(
        r#"
            select
            id,
            schema_version,
            name,
            kind,
            archetype,
            level,
            abilities,
            current_hit_points,
            current_willpower,
            weapon_skills,
            backgrounds,
            derived
            from characters where id = ?"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DatabaseError::CharacterNotFound)?;

    let inventory = get_inventory(pool, id).await?;

    row.into_record(inventory)
}

pub async fn list_characters(pool: &Pool) -> Result<Vec<CharacterSummary>, DatabaseError> {
    Ok(
        sqlx::query_as::<_, CharacterSummary>("select id, name from characters order by id")
            .fetch_all(pool)
            .await?,
    )
}

/// Writes the raw fields, current pools and cached derived block. The
/// inventory lives in its own table and is written through the item
/// functions.
pub async fn update_character(
    pool: &Pool,
    character: &CharacterRecord,
) -> Result<(), DatabaseError> {
    let result = sqlx::query(
        r#"
            update characters
            set name = ?,
            kind = ?,
            archetype = ?,
            level = ?,
            abilities = ?,
            current_hit_points = ?,
            current_willpower = ?,
            weapon_skills = ?,
            backgrounds = ?,
            derived = ?
            where id = ?"#,
    )
    .bind(&character.name)
    .bind(to_string(&character.kind)?)
    .bind(to_string(&character.archetype)?)
    .bind(*character.level)
    .bind(to_string(&character.abilities)?)
    .bind(*character.current_hit_points)
    .bind(*character.current_willpower)
    .bind(to_string(&character.weapon_skills)?)
    .bind(to_string(&character.backgrounds)?)
    .bind(to_string(&character.derived)?)
    .bind(character.id)
    .execute(pool)
    .await?;

    match result.rows_affected() {
        0 => Err(DatabaseError::CharacterNotFound),
        _ => Ok(()),
    }
}

pub async fn set_character_willpower(
    pool: &Pool,
    id: i64,
    willpower: WillpowerPoints,
) -> Result<(), DatabaseError> {
    sqlx::query("update characters set current_willpower = ? where id = ?")
        .bind(*willpower)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

async fn get_inventory(pool: &Pool, character_id: i64) -> Result<Vec<ItemRecord>, DatabaseError> {
    Ok(sqlx::query_as::<_, ItemRow>(
        r#"
            select id, name, data, equipped, weight, quantity, durability
            from items where character_id = ? order by id"#,
    )
    .bind(character_id)
    .fetch(pool)
    .map_ok(ItemRecord::from)
    .try_collect()
    .await?)
}

/// Validates and stores a copy of `item`; the id on `item` is ignored.
pub async fn add_item(
    pool: &Pool,
    character_id: i64,
    item: &ItemRecord,
) -> Result<i64, DatabaseError> {
    let mut item = item.clone();
    item.validate()?;

    let durability = item.durability.as_ref().map(to_string).transpose()?;

    let result = sqlx::query(
        r#"
            insert into items (character_id, name, data, equipped, weight, quantity, durability)
            values (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(character_id)
    .bind(&item.name)
    .bind(to_string(&item.kind)?)
    .bind(item.equipped)
    .bind(*item.weight)
    .bind(*item.quantity)
    .bind(durability)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn get_item(pool: &Pool, id: i64) -> Result<ItemRecord, DatabaseError> {
    let row = sqlx::query_as::<_, ItemRow>(
        r#"
            select id, name, data, equipped, weight, quantity, durability
            from items where id = ?"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DatabaseError::ItemNotFound)?;

    Ok(row.into())
}

/// Id of the character whose inventory holds `item_id`.
pub async fn get_item_owner(pool: &Pool, item_id: i64) -> Result<i64, DatabaseError> {
    let owner: Option<(i64,)> = sqlx::query_as("select character_id from items where id = ?")
        .bind(item_id)
        .fetch_optional(pool)
        .await?;

    owner
        .map(|(character_id,)| character_id)
        .ok_or(DatabaseError::ItemNotFound)
}

pub async fn update_item(pool: &Pool, item: &ItemRecord) -> Result<(), DatabaseError> {
    update_items(pool, std::slice::from_ref(item)).await
}

/// Writes all items in one transaction. Nothing is written when any item
/// is invalid or missing.
pub async fn update_items(pool: &Pool, items: &[ItemRecord]) -> Result<(), DatabaseError> {
    let items = items
        .iter()
        .cloned()
        .map(|mut item| item.validate().map(|_| item))
        .collect::<Result<Vec<_>, _>>()?;

    let mut tx = pool.begin().await?;

    for item in &items {
        let durability = item.durability.as_ref().map(to_string).transpose()?;

        let result = sqlx::query(
            r#"
                update items
                set name = ?, data = ?, equipped = ?, weight = ?, quantity = ?, durability = ?
                where id = ?"#,
        )
        .bind(&item.name)
        .bind(to_string(&item.kind)?)
        .bind(item.equipped)
        .bind(*item.weight)
        .bind(*item.quantity)
        .bind(durability)
        .bind(item.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::ItemNotFound);
        }
    }

    tx.commit().await?;

    Ok(())
}

pub async fn delete_item(pool: &Pool, id: i64) -> Result<(), DatabaseError> {
    let result = sqlx::query("delete from items where id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    match result.rows_affected() {
        0 => Err(DatabaseError::ItemNotFound),
        _ => Ok(()),
    }
}

/// Rolls or plain text shown under a message's flavor line.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MessageContent {
    Rolls(Vec<RollOutcome>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ChatMessage {
    pub speaker: String,
    pub flavor: String,
    pub content: MessageContent,
}

#[derive(Debug, sqlx::FromRow)]
struct ChatMessageRow {
    speaker: String,
    flavor: String,
    content: Json<MessageContent>,
}

impl From<ChatMessageRow> for ChatMessage {
    fn from(row: ChatMessageRow) -> Self {
        ChatMessage {
            speaker: row.speaker,
            flavor: row.flavor,
            content: row.content.0,
        }
    }
}

pub async fn publish_message(pool: &Pool, message: &ChatMessage) -> Result<i64, DatabaseError> {
    let result = sqlx::query("insert into chat_messages (speaker, flavor, content) values (?, ?, ?)")
        .bind(&message.speaker)
        .bind(&message.flavor)
        .bind(to_string(&message.content)?)
        .execute(pool)
        .await?;

    tracing::info!(speaker = %message.speaker, flavor = %message.flavor, "published message");

    Ok(result.last_insert_rowid())
}

/// The latest `limit` messages, oldest first.
pub async fn get_messages(pool: &Pool, limit: i64) -> Result<Vec<ChatMessage>, DatabaseError> {
    let mut messages: Vec<ChatMessage> = sqlx::query_as::<_, ChatMessageRow>(
        r#"
            select speaker, flavor, content
            from chat_messages order by id desc limit ?"#,
    )
    .bind(limit)
    .fetch(pool)
    .map_ok(ChatMessage::from)
    .try_collect()
    .await?;

    messages.reverse();

    Ok(messages)
}
