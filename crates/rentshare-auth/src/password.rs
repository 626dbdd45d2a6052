//! Argon2id password hashing

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use rentshare_core::error::AppError;
use tracing::{debug, error};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Password hashing service using Argon2 default parameters
#[derive(Debug, Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Reject passwords outside the accepted length range
    pub fn check_strength(password: &str) -> Result<(), AppError> {
        let len = password.chars().count();
        if len < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if len > MAX_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at most {} characters",
                MAX_PASSWORD_LENGTH
            )));
        }
        Ok(())
    }

    /// Hash `password` into an Argon2id PHC string with a fresh salt
    ///
    /// ```
    /// use rentshare_auth::PasswordService;
    ///
    /// let passwords = PasswordService::new();
    /// let stored = passwords.hash_password("correct horse")?;
    /// assert!(passwords.verify_password("correct horse", &stored)?);
    /// # Ok::<(), rentshare_core::error::AppError>(())
    /// ```
    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|phc| phc.to_string())
            .map_err(|e| hash_failure("hash", e))
    }

    /// `Ok(false)` for a wrong password. Errors are reserved for stored
    /// hashes that cannot be parsed or checked.
    pub fn verify_password(&self, password: &str, stored: &str) -> Result<bool, AppError> {
        let phc = PasswordHash::new(stored).map_err(|e| hash_failure("parse stored", e))?;

        match self.argon2.verify_password(password.as_bytes(), &phc) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                debug!("Password mismatch");
                Ok(false)
            }
            Err(e) => Err(hash_failure("verify", e)),
        }
    }
}

fn hash_failure(step: &str, e: argon2::password_hash::Error) -> AppError {
    error!(error = %e, "Could not {} password hash", step);
    AppError::PasswordHash(format!("{}: {}", step, e))
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2_phc() {
        let hash = PasswordService::new().hash_password("rent-my-drill").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_verify() {
        let service = PasswordService::new();
        let hash = service.hash_password("correct_password").unwrap();

        assert!(service.verify_password("correct_password", &hash).unwrap());
        assert!(!service.verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_salted_hashes_differ() {
        let service = PasswordService::new();
        let a = service.hash_password("same_password").unwrap();
        let b = service.hash_password("same_password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let result = PasswordService::new().verify_password("pw", "not-a-phc-string");
        assert!(matches!(result, Err(AppError::PasswordHash(_))));
    }

    #[test]
    fn test_strength() {
        assert!(PasswordService::check_strength("short").is_err());
        assert!(PasswordService::check_strength("long enough").is_ok());
        assert!(PasswordService::check_strength(&"x".repeat(129)).is_err());
    }
}
