//! Profile DTOs

use chrono::{DateTime, Utc};
use rentshare_core::models::{Profile, RatingSummary};
use rentshare_services::ProfileUpdate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Profile edit; omitted fields stay unchanged, empty strings clear them
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100))]
    pub full_name: Option<String>,

    #[validate(length(max = 1000))]
    pub bio: Option<String>,

    #[validate(length(max = 200))]
    pub location: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfileUpdate {
            full_name: req.full_name,
            bio: req.bio,
            location: req.location,
        }
    }
}

/// What other members see of a profile
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub verified: bool,
    pub member_since: DateTime<Utc>,
    pub rating: RatingSummary,
}

impl PublicProfile {
    pub fn new(profile: &Profile, rating: RatingSummary) -> Self {
        Self {
            id: profile.id,
            display_name: profile.display_name(),
            avatar_url: profile.avatar_url.clone(),
            bio: profile.bio.clone(),
            location: profile.location.clone(),
            verified: profile.verified,
            member_since: profile.created_at,
            rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_profile_hides_email() {
        let profile = Profile::new("jane@example.com", "hash");
        let public = PublicProfile::new(&profile, RatingSummary::default());
        let json = serde_json::to_value(&public).unwrap();

        assert!(json.get("email").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["rating"]["count"], 0);
    }
}
