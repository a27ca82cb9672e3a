use godfall_database::DatabaseError;
use godfall_rules::{dice::FormulaError, items::ItemValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Item {0} is not in this character's inventory")]
    ItemNotInInventory(i64),

    #[error("'{0}' is not a weapon")]
    NotAWeapon(String),

    #[error("'{0}' is not a spell or spirit ability")]
    NotASpell(String),

    #[error("Unknown difficulty '{0}'. Try easy, moderate, hard or extreme")]
    UnknownDifficulty(String),

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    Item(#[from] ItemValidationError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
