pub mod character;
pub mod errors;
pub mod roll;

pub use errors::GameError;
