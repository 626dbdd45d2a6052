//! API layer for RentShare
//!
//! HTTP handlers for listings, bookings, reviews, messaging, favorites,
//! notifications and moderation. Everything here is mounted under
//! `/api/v1` by [`configure`]; `/health` lives at the root.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod dto;
pub mod handlers;
pub mod state;

// Re-export DTOs (common types)
pub use dto::{ApiResponse, PaginationParams};
pub use handlers::health_check;
pub use state::{AppState, Repositories};

use actix_web::web;

/// Register every `/api/v1` route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(handlers::configure_auth)
        .configure(handlers::configure_profiles)
        .configure(handlers::configure_items)
        .configure(handlers::configure_bookings)
        .configure(handlers::configure_reviews)
        .configure(handlers::configure_conversations)
        .configure(handlers::configure_activity)
        .configure(handlers::configure_admin);
}
