//! JWT claims carried by RentShare access tokens

use chrono::{Duration, Utc};
use rentshare_core::models::UserRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (profile id)
    pub sub: Uuid,

    /// Email at the time the token was issued
    pub email: String,

    pub role: UserRole,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Claims without an expiry; `JwtService::create_token` fills it in.
    ///
    /// # Examples
    ///
    /// ```
    /// use rentshare_auth::Claims;
    /// use rentshare_core::models::UserRole;
    /// use uuid::Uuid;
    ///
    /// let id = Uuid::new_v4();
    /// let claims = Claims::new(id, "jane@example.com", UserRole::Member);
    /// assert_eq!(claims.sub, id);
    /// assert_eq!(claims.exp, 0);
    /// ```
    pub fn new(user_id: Uuid, email: &str, role: UserRole) -> Self {
        Self {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: Utc::now().timestamp(),
            exp: 0,
        }
    }

    pub fn with_expiration(user_id: Uuid, email: &str, role: UserRole, expires_in_secs: i64) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }

    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_with_expiration() {
        let id = Uuid::new_v4();
        let claims = Claims::with_expiration(id, "owner@example.com", UserRole::Member, 3600);
        assert_eq!(claims.user_id(), id);
        assert_eq!(claims.email, "owner@example.com");
        assert!(!claims.is_expired());

        let now = Utc::now().timestamp();
        assert!(claims.exp > now);
        assert!(claims.exp <= now + 3600);
    }

    #[test]
    fn test_expired_claims() {
        let mut claims = Claims::new(Uuid::new_v4(), "a@example.com", UserRole::Member);
        claims.exp = (Utc::now() - Duration::hours(1)).timestamp();
        assert!(claims.is_expired());
    }

    #[test]
    fn test_admin_check() {
        let member = Claims::new(Uuid::new_v4(), "m@example.com", UserRole::Member);
        let admin = Claims::new(Uuid::new_v4(), "a@example.com", UserRole::Admin);
        assert!(!member.is_admin());
        assert!(admin.is_admin());
    }
}
