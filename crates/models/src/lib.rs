//! Records exchanged with the sportos backend, one module per collection.

pub mod banner;
pub mod entity;
pub mod featured_player;
pub mod fixture;
pub mod league;
pub mod news;
pub mod player;
pub mod sponsor;
pub mod standing;
pub mod star_performer;
pub mod trophy;
pub mod typescript;
pub mod user;

pub use entity::{Entity, EntityKind, PLACEHOLDER_LOGO_URL, PLACEHOLDER_PORTRAIT_URL};
