pub mod error;
pub mod format;
pub mod message;
pub mod player;
pub mod score;
pub mod team;
