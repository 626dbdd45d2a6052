//! Review repository implementation

use super::{db_error, is_violation, UNIQUE_VIOLATION};
use rentshare_core::{
    models::{RatingSummary, Review, ReviewType},
    traits::{Pagination, ReviewRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

const REVIEW_COLUMNS: &str = "id, booking_id, item_id, reviewer_id, reviewee_id, rating, \
     comment, review_type, created_at, updated_at";

/// PostgreSQL implementation of ReviewRepository
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_where(
        &self,
        column: &str,
        id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Review>, i64)> {
        let total: (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM reviews WHERE {} = $1", column))
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("count reviews", e))?;

        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            SELECT {} FROM reviews
            WHERE {} = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            REVIEW_COLUMNS, column
        ))
        .bind(id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list reviews", e))?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    async fn summary_where(&self, column: &str, id: Uuid) -> AppResult<RatingSummary> {
        let (average, count): (Option<f64>, i64) = sqlx::query_as(&format!(
            "SELECT AVG(rating)::float8, COUNT(*) FROM reviews WHERE {} = $1",
            column
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("summarize reviews", e))?;

        Ok(RatingSummary::from_aggregate(average, count))
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {} FROM reviews WHERE id = $1",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find review", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, review), fields(booking_id = %review.booking_id))]
    async fn create(&self, review: &Review) -> AppResult<Review> {
        debug!("Creating {} review", review.review_type);

        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r#"
            INSERT INTO reviews (
                id, booking_id, item_id, reviewer_id, reviewee_id, rating, comment, review_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        ))
        .bind(review.id)
        .bind(review.booking_id)
        .bind(review.item_id)
        .bind(review.reviewer_id)
        .bind(review.reviewee_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.review_type.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_violation(&e, UNIQUE_VIOLATION) {
                warn!("Duplicate review for booking {}", review.booking_id);
                AppError::AlreadyExists("You have already reviewed this booking".to_string())
            } else {
                db_error("create review", e)
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete review", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn exists_for(&self, booking_id: Uuid, reviewer_id: Uuid) -> AppResult<bool> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE booking_id = $1 AND reviewer_id = $2)",
        )
        .bind(booking_id)
        .bind(reviewer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("check review", e))?;

        Ok(exists.0)
    }

    #[instrument(skip(self))]
    async fn list_for_item(
        &self,
        item_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Review>, i64)> {
        self.list_where("item_id", item_id, pagination).await
    }

    #[instrument(skip(self))]
    async fn list_for_user(
        &self,
        user_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Review>, i64)> {
        self.list_where("reviewee_id", user_id, pagination).await
    }

    #[instrument(skip(self))]
    async fn summary_for_item(&self, item_id: Uuid) -> AppResult<RatingSummary> {
        self.summary_where("item_id", item_id).await
    }

    #[instrument(skip(self))]
    async fn summary_for_user(&self, user_id: Uuid) -> AppResult<RatingSummary> {
        self.summary_where("reviewee_id", user_id).await
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    booking_id: Uuid,
    item_id: Uuid,
    reviewer_id: Uuid,
    reviewee_id: Uuid,
    rating: i16,
    comment: Option<String>,
    review_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            booking_id: row.booking_id,
            item_id: row.item_id,
            reviewer_id: row.reviewer_id,
            reviewee_id: row.reviewee_id,
            rating: row.rating,
            comment: row.comment,
            review_type: ReviewType::from_str(&row.review_type).unwrap_or(ReviewType::Item),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
