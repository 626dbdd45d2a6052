//! Data Transfer Objects (DTOs) for API requests and responses

pub mod auth;
pub mod booking;
pub mod common;
pub mod item;
pub mod message;
pub mod moderation;
pub mod profile;
pub mod review;

pub use auth::*;
pub use booking::*;
pub use common::*;
pub use item::*;
pub use message::*;
pub use moderation::*;
pub use profile::*;
pub use review::*;
