//! Reviews left after a completed rental

use chrono::Utc;
use rentshare_cache::{keys, CacheLayer, FetchOptions};
use rentshare_core::{
    models::{BookingStatus, Notification, NotificationKind, RatingSummary, Review, ReviewType},
    traits::{BookingRepository, NotificationRepository, Pagination, ReviewRepository},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Longest accepted review comment, in characters
pub const MAX_COMMENT_LENGTH: usize = 2000;

#[derive(Debug, Clone)]
pub struct NewReview {
    pub booking_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    /// Defaults from the reviewer's side of the booking
    pub review_type: Option<ReviewType>,
}

pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    bookings: Arc<dyn BookingRepository>,
    notifications: Arc<dyn NotificationRepository>,
    cache: Arc<CacheLayer>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        bookings: Arc<dyn BookingRepository>,
        notifications: Arc<dyn NotificationRepository>,
        cache: Arc<CacheLayer>,
    ) -> Self {
        Self {
            reviews,
            bookings,
            notifications,
            cache,
        }
    }

    #[instrument(skip(self, review), fields(booking_id = %review.booking_id))]
    pub async fn create_review(&self, reviewer_id: Uuid, review: NewReview) -> AppResult<Review> {
        Review::validate_rating(review.rating)?;
        let comment = review
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if comment
            .as_ref()
            .is_some_and(|c| c.chars().count() > MAX_COMMENT_LENGTH)
        {
            return Err(AppError::Validation(format!(
                "comment must be at most {} characters",
                MAX_COMMENT_LENGTH
            )));
        }

        let booking = self
            .bookings
            .find_by_id(review.booking_id)
            .await?
            .filter(|b| b.is_party(reviewer_id))
            .ok_or_else(|| AppError::BookingNotFound(review.booking_id.to_string()))?;

        if booking.status != BookingStatus::Completed {
            return Err(AppError::Validation(
                "only completed bookings can be reviewed".to_string(),
            ));
        }

        let (review_type, reviewee_id) =
            ReviewType::resolve(&booking, reviewer_id, review.review_type)?;

        if self.reviews.exists_for(booking.id, reviewer_id).await? {
            return Err(AppError::AlreadyExists(format!(
                "Booking {} is already reviewed",
                booking.id
            )));
        }

        let now = Utc::now();
        let created = self
            .reviews
            .create(&Review {
                id: Uuid::new_v4(),
                booking_id: booking.id,
                item_id: booking.item_id,
                reviewer_id,
                reviewee_id,
                rating: review.rating,
                comment,
                review_type,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!("Review {} ({}) for booking {}", created.id, review_type, booking.id);

        let notification = Notification::new(
            reviewee_id,
            NotificationKind::NewReview,
            "You received a review",
            format!("{} out of 5", created.rating),
            Some(created.id),
        );
        if let Err(e) = self.notifications.create(&notification).await {
            warn!("Failed to notify {} about review {}: {}", reviewee_id, created.id, e);
        }

        self.invalidate(&created).await;
        Ok(created)
    }

    /// Drop cached summaries touched by `review`
    pub(crate) async fn invalidate(&self, review: &Review) {
        self.cache.invalidate(&keys::item_reviews_key(review.item_id)).await;
        self.cache.invalidate_user(review.reviewee_id).await;
    }

    pub async fn list_reviews_for_item(
        &self,
        item_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Review>, i64)> {
        self.reviews.list_for_item(item_id, pagination).await
    }

    pub async fn list_reviews_for_user(
        &self,
        user_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Review>, i64)> {
        self.reviews.list_for_user(user_id, pagination).await
    }

    pub async fn item_rating(&self, item_id: Uuid) -> AppResult<RatingSummary> {
        let reviews = self.reviews.clone();
        self.cache
            .with_cache(
                &keys::item_reviews_key(item_id),
                || async move { reviews.summary_for_item(item_id).await },
                FetchOptions::with_ttl_secs(keys::ITEM_TTL_SECS),
            )
            .await
    }

    pub async fn user_rating(&self, user_id: Uuid) -> AppResult<RatingSummary> {
        let reviews = self.reviews.clone();
        self.cache
            .with_cache(
                &keys::user_reviews_key(user_id),
                || async move { reviews.summary_for_user(user_id).await },
                FetchOptions::with_ttl_secs(keys::USER_TTL_SECS),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        InMemoryBookingRepository, InMemoryNotificationRepository, InMemoryReviewRepository,
    };
    use chrono::Duration;
    use rentshare_core::models::{Booking, DateRange};
    use rentshare_core::pricing::CostBreakdown;

    fn booking(status: BookingStatus) -> Booking {
        let start = Utc::now() - Duration::days(5);
        let range = DateRange::new(start, start + Duration::days(2)).unwrap();
        let mut booking = Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            range,
            CostBreakdown::default(),
        );
        booking.status = status;
        booking
    }

    fn service(bookings: Vec<Booking>) -> (Arc<InMemoryNotificationRepository>, ReviewService) {
        let notifications = Arc::new(InMemoryNotificationRepository::default());
        let service = ReviewService::new(
            Arc::new(InMemoryReviewRepository::default()),
            Arc::new(InMemoryBookingRepository::with(bookings)),
            notifications.clone(),
            Arc::new(CacheLayer::in_memory(100, std::time::Duration::from_secs(60))),
        );
        (notifications, service)
    }

    fn five_stars(booking_id: Uuid) -> NewReview {
        NewReview {
            booking_id,
            rating: 5,
            comment: Some("Spotless, would rent again".to_string()),
            review_type: None,
        }
    }

    #[tokio::test]
    async fn test_renter_reviews_completed_booking() {
        let b = booking(BookingStatus::Completed);
        let (notifications, reviews) = service(vec![b.clone()]);

        let review = reviews.create_review(b.renter_id, five_stars(b.id)).await.unwrap();
        assert_eq!(review.review_type, ReviewType::Item);
        assert_eq!(review.reviewee_id, b.owner_id);
        assert_eq!(review.item_id, b.item_id);
        assert_eq!(notifications.for_user(b.owner_id).len(), 1);
    }

    #[tokio::test]
    async fn test_owner_reviews_renter() {
        let b = booking(BookingStatus::Completed);
        let (_, reviews) = service(vec![b.clone()]);

        let review = reviews.create_review(b.owner_id, five_stars(b.id)).await.unwrap();
        assert_eq!(review.review_type, ReviewType::Renter);
        assert_eq!(review.reviewee_id, b.renter_id);
    }

    #[tokio::test]
    async fn test_unfinished_booking_cannot_be_reviewed() {
        let b = booking(BookingStatus::Active);
        let (_, reviews) = service(vec![b.clone()]);

        assert!(matches!(
            reviews.create_review(b.renter_id, five_stars(b.id)).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_one_review_per_reviewer() {
        let b = booking(BookingStatus::Completed);
        let (_, reviews) = service(vec![b.clone()]);

        reviews.create_review(b.renter_id, five_stars(b.id)).await.unwrap();
        assert!(matches!(
            reviews.create_review(b.renter_id, five_stars(b.id)).await,
            Err(AppError::AlreadyExists(_))
        ));
        // the other side may still review
        assert!(reviews.create_review(b.owner_id, five_stars(b.id)).await.is_ok());
    }

    #[tokio::test]
    async fn test_outsider_and_bad_rating_rejected() {
        let b = booking(BookingStatus::Completed);
        let (_, reviews) = service(vec![b.clone()]);

        assert!(matches!(
            reviews.create_review(Uuid::new_v4(), five_stars(b.id)).await,
            Err(AppError::BookingNotFound(_))
        ));

        let mut zero = five_stars(b.id);
        zero.rating = 0;
        assert!(matches!(
            reviews.create_review(b.renter_id, zero).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_rating_summary_refreshes_after_review() {
        let b = booking(BookingStatus::Completed);
        let (_, reviews) = service(vec![b.clone()]);

        assert_eq!(reviews.user_rating(b.owner_id).await.unwrap().count, 0);

        let mut four = five_stars(b.id);
        four.rating = 4;
        reviews.create_review(b.renter_id, four).await.unwrap();

        let summary = reviews.user_rating(b.owner_id).await.unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.average, Some(4.0));
        assert_eq!(reviews.item_rating(b.item_id).await.unwrap().count, 1);
    }
}
