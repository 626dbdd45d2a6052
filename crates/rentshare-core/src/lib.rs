//! RentShare Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the RentShare marketplace. It includes:
//!
//! - Domain models (Item, Booking, Review, Message, etc.)
//! - Booking cost calculation and date-range arithmetic
//! - Typed search filters
//! - Repository traits the persistence layer implements
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod filters;
pub mod location;
pub mod models;
pub mod pricing;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
