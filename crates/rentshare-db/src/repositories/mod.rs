//! Repository implementations
//!
//! Concrete implementations of the repository traits defined in
//! rentshare-core, using sqlx for PostgreSQL access.

pub mod activity_repo;
pub mod booking_repo;
pub mod item_repo;
pub mod message_repo;
pub mod profile_repo;
pub mod report_repo;
pub mod review_repo;

pub use activity_repo::{PgFavoriteRepository, PgNotificationRepository};
pub use booking_repo::PgBookingRepository;
pub use item_repo::{PgCategoryRepository, PgItemImageRepository, PgItemRepository};
pub use message_repo::{PgConversationRepository, PgMessageRepository};
pub use profile_repo::PgProfileRepository;
pub use report_repo::PgReportRepository;
pub use review_repo::PgReviewRepository;

use rentshare_core::AppError;
use tracing::error;

/// Postgres SQLSTATE for a unique constraint violation
pub(crate) const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for an exclusion constraint violation
pub(crate) const EXCLUSION_VIOLATION: &str = "23P01";

/// Check whether `e` is a database error with the given SQLSTATE
pub(crate) fn is_violation(e: &sqlx::Error, code: &str) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|c| c == code)
}

/// Log and wrap a query failure
pub(crate) fn db_error(action: &str, e: sqlx::Error) -> AppError {
    error!("Database error: failed to {}: {}", action, e);
    AppError::Database(format!("Failed to {}: {}", action, e))
}
