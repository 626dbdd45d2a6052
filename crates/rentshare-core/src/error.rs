//! The one error type every RentShare crate returns
//!
//! Each variant knows its HTTP status and a stable snake_case code, so
//! handlers can return `Result<_, AppError>` and let actix render
//! `{"error", "message", "status"}` bodies.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // persistence
    #[error("database failure: {0}")]
    Database(String),

    #[error("connection pool failure: {0}")]
    Pool(String),

    #[error("transaction aborted: {0}")]
    Transaction(String),

    // caching
    #[error("cache failure: {0}")]
    Cache(String),

    #[error("cache backend unreachable: {0}")]
    CacheConnection(String),

    // uploads
    #[error("object storage failure: {0}")]
    Storage(String),

    #[error("upload of {size} bytes is over the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    // identity
    #[error("wrong email or password")]
    InvalidCredentials,

    #[error("session expired, sign in again")]
    TokenExpired,

    #[error("bad access token: {0}")]
    InvalidToken(String),

    #[error("authentication required: {0}")]
    Unauthorized(String),

    #[error("not allowed to do that")]
    Forbidden,

    #[error("could not hash password: {0}")]
    PasswordHash(String),

    #[error("account {0} is suspended")]
    AccountSuspended(String),

    /// Listing missing, or hidden from the caller
    #[error("item {0} not found")]
    ItemNotFound(String),

    #[error("item {0} cannot be booked right now")]
    ItemUnavailable(String),

    #[error("booking {0} not found")]
    BookingNotFound(String),

    #[error("Booking conflict: item {item_id} is already booked in the requested window")]
    BookingConflict { item_id: String },

    #[error("Invalid status transition: cannot {action} a booking that is {from}")]
    InvalidTransition { from: String, action: String },

    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("conversation {0} not found")]
    ConversationNotFound(String),

    // request shape
    #[error("{0}")]
    Validation(String),

    #[error("{0} is required")]
    MissingField(String),

    // generic resources
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("unexpected failure: {0}")]
    Internal(String),

    #[error("bad configuration: {0}")]
    Config(String),

    #[error("could not encode or decode JSON: {0}")]
    Serialization(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        use AppError::*;

        match self {
            Validation(_) | MissingField(_) => StatusCode::BAD_REQUEST,
            InvalidCredentials | InvalidToken(_) | TokenExpired | Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Forbidden | AccountSuspended(_) => StatusCode::FORBIDDEN,
            ItemNotFound(_)
            | BookingNotFound(_)
            | UserNotFound(_)
            | ConversationNotFound(_)
            | NotFound(_) => StatusCode::NOT_FOUND,
            Conflict(_)
            | AlreadyExists(_)
            | BookingConflict { .. }
            | InvalidTransition { .. }
            | ItemUnavailable(_) => StatusCode::CONFLICT,
            PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Database(_) | Pool(_) | Transaction(_) | Cache(_) | CacheConnection(_)
            | Storage(_) | PasswordHash(_) | Internal(_) | Config(_) | Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Machine-readable code sent as the `error` field
    pub fn error_code(&self) -> &'static str {
        use AppError::*;

        match self {
            Database(_) => "database_error",
            Pool(_) => "pool_error",
            Transaction(_) => "transaction_error",
            Cache(_) => "cache_error",
            CacheConnection(_) => "cache_connection_error",
            Storage(_) => "storage_error",
            PayloadTooLarge { .. } => "payload_too_large",
            UnsupportedMediaType(_) => "unsupported_media_type",
            InvalidCredentials => "invalid_credentials",
            TokenExpired => "token_expired",
            InvalidToken(_) => "invalid_token",
            Unauthorized(_) => "unauthorized",
            Forbidden => "forbidden",
            PasswordHash(_) => "password_error",
            AccountSuspended(_) => "account_suspended",
            ItemNotFound(_) => "item_not_found",
            ItemUnavailable(_) => "item_unavailable",
            BookingNotFound(_) => "booking_not_found",
            BookingConflict { .. } => "booking_conflict",
            InvalidTransition { .. } => "invalid_transition",
            UserNotFound(_) => "user_not_found",
            ConversationNotFound(_) => "conversation_not_found",
            Validation(_) => "validation_error",
            MissingField(_) => "missing_field",
            NotFound(_) => "not_found",
            Conflict(_) => "conflict",
            AlreadyExists(_) => "already_exists",
            Internal(_) => "internal_error",
            Config(_) => "config_error",
            Serialization(_) => "serialization_error",
        }
    }

    /// Server-side failures whose details stay out of responses
    pub fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if self.is_internal() {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(json!({
            "error": self.error_code(),
            "message": message,
            "status": status.as_u16(),
        }))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::ItemNotFound("123".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::BookingConflict {
                item_id: "abc".to_string()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::PayloadTooLarge { size: 10, max: 5 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Cache("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(AppError::ItemUnavailable("x".into()).error_code(), "item_unavailable");
        assert_eq!(
            AppError::InvalidTransition {
                from: "completed".to_string(),
                action: "cancel".to_string()
            }
            .error_code(),
            "invalid_transition"
        );
    }

    #[test]
    fn test_transition_message() {
        let err = AppError::InvalidTransition {
            from: "completed".to_string(),
            action: "cancel".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid status transition: cannot cancel a booking that is completed"
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let resp = AppError::Database("password=hunter2".to_string()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(AppError::Database(String::new()).is_internal());
        assert!(!AppError::Forbidden.is_internal());
    }

    #[test]
    fn test_sqlx_row_not_found_maps_to_404() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
