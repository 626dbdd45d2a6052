//! Authentication DTOs

use serde::Deserialize;
use validator::Validate;

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,

    #[validate(length(max = 100))]
    pub full_name: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            email: "jane@example.com".to_string(),
            password: "correct horse".to_string(),
            full_name: None,
        };
        assert!(valid.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..valid.clone()
        };
        assert!(bad_email.validate().is_err());

        let short = RegisterRequest {
            password: "short".to_string(),
            ..valid
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_login_request_validation() {
        let empty = LoginRequest {
            email: String::new(),
            password: String::new(),
        };
        assert!(empty.validate().is_err());
    }
}
