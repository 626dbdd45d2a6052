//! Profile model
//!
//! Represents marketplace members (renters and owners) and administrators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User role enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular marketplace member
    #[default]
    Member,
    /// Moderator with access to the admin endpoints
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Member => write!(f, "member"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl UserRole {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "member" => Some(UserRole::Member),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Check if role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

/// Profile entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Unique identifier
    pub id: Uuid,

    /// Email address (unique, used for login)
    pub email: String,

    /// Password hash (never expose in API responses)
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Display name
    pub full_name: Option<String>,

    /// Public avatar URL
    pub avatar_url: Option<String>,

    /// Free-form biography
    pub bio: Option<String>,

    /// Free-form location (city, neighbourhood)
    pub location: Option<String>,

    /// Role
    pub role: UserRole,

    /// Identity verified by an administrator
    pub verified: bool,

    /// Suspended by moderation
    pub suspended: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Create a new member profile
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password_hash: password_hash.into(),
            ..Default::default()
        }
    }

    /// Name shown to other members
    pub fn display_name(&self) -> String {
        match &self.full_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Check if the profile may sign in and act
    pub fn can_login(&self) -> bool {
        !self.suspended
    }

    /// Check if user can perform admin actions
    pub fn can_admin(&self) -> bool {
        !self.suspended && self.role.is_admin()
    }
}

impl Default for Profile {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: String::new(),
            password_hash: String::new(),
            full_name: None,
            avatar_url: None,
            bio: None,
            location: None,
            role: UserRole::Member,
            verified: false,
            suspended: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(UserRole::from_str("ADMIN"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_str("member"), Some(UserRole::Member));
        assert_eq!(UserRole::from_str("owner"), None);
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut profile = Profile::new("jane@example.com", "hash");
        assert_eq!(profile.display_name(), "jane");

        profile.full_name = Some("Jane Doe".to_string());
        assert_eq!(profile.display_name(), "Jane Doe");
    }

    #[test]
    fn test_suspended_admin_cannot_admin() {
        let mut profile = Profile::new("a@example.com", "hash");
        profile.role = UserRole::Admin;
        assert!(profile.can_admin());

        profile.suspended = true;
        assert!(!profile.can_admin());
        assert!(!profile.can_login());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let profile = Profile::new("a@example.com", "secret-hash");
        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
