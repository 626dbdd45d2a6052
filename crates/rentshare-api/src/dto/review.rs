//! Review DTOs

use rentshare_core::models::ReviewType;
use rentshare_services::NewReview;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub booking_id: Uuid,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,

    #[validate(length(max = 2000))]
    pub comment: Option<String>,

    pub review_type: Option<ReviewType>,
}

impl From<CreateReviewRequest> for NewReview {
    fn from(req: CreateReviewRequest) -> Self {
        NewReview {
            booking_id: req.booking_id,
            rating: req.rating,
            comment: req.comment,
            review_type: req.review_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_range() {
        let mut req = CreateReviewRequest {
            booking_id: Uuid::new_v4(),
            rating: 5,
            comment: None,
            review_type: None,
        };
        assert!(req.validate().is_ok());

        req.rating = 6;
        assert!(req.validate().is_err());
        req.rating = 0;
        assert!(req.validate().is_err());
    }
}
