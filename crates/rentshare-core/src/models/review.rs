//! Review models
//!
//! Reviews are written after a booking completes. The renter reviews the item
//! (or its owner) and the owner reviews the renter.

use crate::error::AppError;
use crate::models::Booking;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

/// What a review is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewType {
    /// Renter reviewing the rented item
    Item,
    /// Owner reviewing the renter
    Renter,
    /// Renter reviewing the owner
    Owner,
}

impl fmt::Display for ReviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewType::Item => write!(f, "item"),
            ReviewType::Renter => write!(f, "renter"),
            ReviewType::Owner => write!(f, "owner"),
        }
    }
}

impl ReviewType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "item" => Some(ReviewType::Item),
            "renter" => Some(ReviewType::Renter),
            "owner" => Some(ReviewType::Owner),
            _ => None,
        }
    }

    /// Review type and reviewee for `reviewer_id` on `booking`.
    ///
    /// Renters review the item unless they ask to review the owner; owners
    /// always review the renter.
    pub fn resolve(
        booking: &Booking,
        reviewer_id: Uuid,
        requested: Option<ReviewType>,
    ) -> Result<(ReviewType, Uuid), AppError> {
        if reviewer_id == booking.renter_id {
            match requested.unwrap_or(ReviewType::Item) {
                ReviewType::Renter => Err(AppError::Validation(
                    "a renter cannot write a renter review".to_string(),
                )),
                kind => Ok((kind, booking.owner_id)),
            }
        } else if reviewer_id == booking.owner_id {
            match requested.unwrap_or(ReviewType::Renter) {
                ReviewType::Renter => Ok((ReviewType::Renter, booking.renter_id)),
                _ => Err(AppError::Validation(
                    "an owner can only review the renter".to_string(),
                )),
            }
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Review entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub item_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    /// 1 to 5 stars
    pub rating: i16,
    pub comment: Option<String>,
    pub review_type: ReviewType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Check that `rating` is within the star range
    pub fn validate_rating(rating: i16) -> Result<(), AppError> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(AppError::Validation(format!(
                "rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        Ok(())
    }
}

/// Aggregate rating for an item or a user
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RatingSummary {
    /// Mean rating, absent when there are no reviews
    pub average: Option<f64>,
    pub count: i64,
}

impl RatingSummary {
    pub fn from_ratings(ratings: &[i16]) -> Self {
        if ratings.is_empty() {
            return Self::default();
        }
        let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
        let count = ratings.len() as i64;
        Self::from_aggregate(Some(sum as f64 / count as f64), count)
    }

    /// Build from a database `AVG`/`COUNT` pair, rounding the mean to two places
    pub fn from_aggregate(average: Option<f64>, count: i64) -> Self {
        if count == 0 {
            return Self::default();
        }
        Self {
            average: average.map(|a| (a * 100.0).round() / 100.0),
            count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateRange;
    use crate::pricing::CostBreakdown;
    use chrono::Duration;

    fn booking() -> Booking {
        let now = Utc::now();
        let range = DateRange::new(now, now + Duration::days(1)).unwrap();
        Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            range,
            CostBreakdown::default(),
        )
    }

    #[test]
    fn test_renter_reviews_item_by_default() {
        let b = booking();
        let (kind, reviewee) = ReviewType::resolve(&b, b.renter_id, None).unwrap();
        assert_eq!(kind, ReviewType::Item);
        assert_eq!(reviewee, b.owner_id);

        let (kind, _) = ReviewType::resolve(&b, b.renter_id, Some(ReviewType::Owner)).unwrap();
        assert_eq!(kind, ReviewType::Owner);
    }

    #[test]
    fn test_owner_reviews_renter() {
        let b = booking();
        let (kind, reviewee) = ReviewType::resolve(&b, b.owner_id, None).unwrap();
        assert_eq!(kind, ReviewType::Renter);
        assert_eq!(reviewee, b.renter_id);

        assert!(ReviewType::resolve(&b, b.owner_id, Some(ReviewType::Item)).is_err());
    }

    #[test]
    fn test_outsider_cannot_review() {
        let b = booking();
        assert!(matches!(
            ReviewType::resolve(&b, Uuid::new_v4(), None),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_rating_range() {
        assert!(Review::validate_rating(1).is_ok());
        assert!(Review::validate_rating(5).is_ok());
        assert!(Review::validate_rating(0).is_err());
        assert!(Review::validate_rating(6).is_err());
    }

    #[test]
    fn test_rating_summary() {
        assert_eq!(RatingSummary::from_ratings(&[]), RatingSummary::default());

        let summary = RatingSummary::from_ratings(&[5, 4, 4]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Some(4.33));
    }
}
