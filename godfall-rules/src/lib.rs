pub mod abilities;
pub mod archetypes;
pub mod character;
pub mod combat;
pub mod config;
pub mod dice;
pub mod encumbrance;
pub mod items;
pub mod saves;
pub mod types;
