//! HTTP request handlers

pub mod activity;
pub mod admin;
pub mod auth;
pub mod booking;
pub mod conversation;
pub mod health;
pub mod item;
pub mod profile;
pub mod review;

pub use activity::configure as configure_activity;
pub use admin::configure as configure_admin;
pub use auth::configure as configure_auth;
pub use booking::configure as configure_bookings;
pub use conversation::configure as configure_conversations;
pub use health::health_check;
pub use item::configure as configure_items;
pub use profile::configure as configure_profiles;
pub use review::configure as configure_reviews;
