//! RentShare Database Layer
//!
//! This crate provides PostgreSQL access and repository implementations
//! for the RentShare marketplace. It includes:
//!
//! - Connection pool management with sqlx
//! - Embedded schema migrations
//! - Repository implementations for all domain entities
//! - Transactional booking inserts guarded by an item row lock

pub mod pool;
pub mod repositories;

pub use pool::{create_pool, run_migrations};
pub use repositories::*;

// Re-export commonly used types
pub use rentshare_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
