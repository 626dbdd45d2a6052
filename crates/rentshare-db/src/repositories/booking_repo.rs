//! Booking repository implementation
//!
//! Inserting a booking and moving one into a blocking status both run in a
//! transaction that first locks the item row. Status changes also lock the
//! booking row, so the transition is checked against the status it replaces. Two requests for the same item
//! therefore serialize, and the overlap check inside the transaction sees
//! every committed booking. The `bookings_no_overlap` exclusion constraint
//! backs this up at the schema level.

use super::{db_error, is_violation, EXCLUSION_VIOLATION};
use rentshare_core::{
    filters::{BookingFilter, BookingRole},
    models::{Booking, BookingAction, BookingStatus, DateRange},
    pricing::CostBreakdown,
    traits::{BookingRepository, Pagination, Repository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

const BOOKING_COLUMNS: &str = "id, item_id, renter_id, owner_id, start_date, end_date, status, \
     subtotal, service_fee, security_deposit, delivery_fee, total_amount, \
     delivery_requested, delivery_address, notes, cancellation_reason, created_at, updated_at";

/// PostgreSQL implementation of BookingRepository
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn blocking_statuses() -> Vec<String> {
        BookingStatus::BLOCKING.iter().map(|s| s.to_string()).collect()
    }

    /// Lock the item row for the rest of the transaction
    async fn lock_item(conn: &mut PgConnection, item_id: Uuid) -> AppResult<()> {
        let locked: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM items WHERE id = $1 FOR UPDATE")
                .bind(item_id)
                .fetch_optional(conn)
                .await
                .map_err(|e| db_error("lock item", e))?;

        locked
            .map(|_| ())
            .ok_or_else(|| AppError::ItemNotFound(item_id.to_string()))
    }

    /// Count blocking bookings overlapping `range`
    async fn count_overlapping(
        conn: &mut PgConnection,
        item_id: Uuid,
        range: &DateRange,
        exclude: Option<Uuid>,
    ) -> AppResult<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM bookings
            WHERE item_id = $1
              AND status = ANY($2)
              AND start_date < $4
              AND end_date > $3
              AND ($5::uuid IS NULL OR id <> $5)
            "#,
        )
        .bind(item_id)
        .bind(Self::blocking_statuses())
        .bind(range.start)
        .bind(range.end)
        .bind(exclude)
        .fetch_one(conn)
        .await
        .map_err(|e| db_error("check booking overlap", e))?;

        Ok(count.0)
    }

    fn map_write_error(action: &str, item_id: Uuid, e: sqlx::Error) -> AppError {
        if is_violation(&e, EXCLUSION_VIOLATION) {
            warn!("Exclusion constraint rejected booking for item {}", item_id);
            AppError::BookingConflict {
                item_id: item_id.to_string(),
            }
        } else {
            db_error(action, e)
        }
    }
}

#[async_trait]
impl Repository<Booking, Uuid> for PgBookingRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        debug!("Finding booking by id: {}", id);

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find booking", e))?;

        Ok(row.map(Into::into))
    }

    /// Plain insert without the availability check; prefer `create_if_available`
    #[instrument(skip(self, entity), fields(item_id = %entity.item_id))]
    async fn create(&self, entity: &Booking) -> AppResult<Booking> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::Pool(e.to_string()))?;
        insert_booking(&mut conn, entity)
            .await
            .map_err(|e| Self::map_write_error("create booking", entity.item_id, e))
    }

    #[instrument(skip(self, entity), fields(id = %entity.id))]
    async fn update(&self, entity: &Booking) -> AppResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET delivery_requested = $2,
                delivery_address = $3,
                notes = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(entity.id)
        .bind(entity.delivery_requested)
        .bind(&entity.delivery_address)
        .bind(&entity.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update booking", e))?;

        row.map(Into::into)
            .ok_or_else(|| AppError::BookingNotFound(entity.id.to_string()))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete booking", e))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    #[instrument(skip(self))]
    async fn find_overlapping(
        &self,
        item_id: Uuid,
        range: &DateRange,
        exclude: Option<Uuid>,
    ) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            SELECT {} FROM bookings
            WHERE item_id = $1
              AND status = ANY($2)
              AND start_date < $4
              AND end_date > $3
              AND ($5::uuid IS NULL OR id <> $5)
            ORDER BY start_date
            "#,
            BOOKING_COLUMNS
        ))
        .bind(item_id)
        .bind(Self::blocking_statuses())
        .bind(range.start)
        .bind(range.end)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("find overlapping bookings", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, booking), fields(item_id = %booking.item_id, renter_id = %booking.renter_id))]
    async fn create_if_available(&self, booking: &Booking) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            AppError::Transaction(format!("Failed to begin transaction: {}", e))
        })?;

        Self::lock_item(&mut tx, booking.item_id).await?;

        let conflicts =
            Self::count_overlapping(&mut tx, booking.item_id, &booking.range(), None).await?;
        if conflicts > 0 {
            info!(
                "Rejecting booking: {} overlapping booking(s) on item {}",
                conflicts, booking.item_id
            );
            return Err(AppError::BookingConflict {
                item_id: booking.item_id.to_string(),
            });
        }

        let created = insert_booking(&mut tx, booking)
            .await
            .map_err(|e| Self::map_write_error("create booking", booking.item_id, e))?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!("Booking {} created for item {}", created.id, created.item_id);
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn apply_action(
        &self,
        id: Uuid,
        action: BookingAction,
        reason: Option<&str>,
    ) -> AppResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            AppError::Transaction(format!("Failed to begin transaction: {}", e))
        })?;

        let current = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1 FOR UPDATE",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("lock booking", e))?
        .map(Booking::from)
        .ok_or_else(|| AppError::BookingNotFound(id.to_string()))?;

        let status = current.status.transition(action)?;

        if status.blocks_availability() && !current.status.blocks_availability() {
            Self::lock_item(&mut tx, current.item_id).await?;
            let conflicts =
                Self::count_overlapping(&mut tx, current.item_id, &current.range(), Some(id))
                    .await?;
            if conflicts > 0 {
                return Err(AppError::BookingConflict {
                    item_id: current.item_id.to_string(),
                });
            }
        }

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET status = $2,
                cancellation_reason = COALESCE($3, cancellation_reason),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(id)
        .bind(status.to_string())
        .bind(reason)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Self::map_write_error("update booking status", current.item_id, e))?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        debug!("Booking {} moved from {} to {}", id, current.status, status);
        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &BookingFilter,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Booking>, i64)> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM bookings");
        push_user_filter(&mut count_qb, user_id, filter);
        let total: (i64,) = count_qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("count bookings", e))?;

        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM bookings", BOOKING_COLUMNS));
        push_user_filter(&mut qb, user_id, filter);
        qb.push(" ORDER BY start_date DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows: Vec<BookingRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list bookings", e))?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }
}

/// WHERE clause selecting the bookings a user takes part in
fn push_user_filter(qb: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: &BookingFilter) {
    match filter.role {
        BookingRole::Renter => qb.push(" WHERE renter_id = "),
        BookingRole::Owner => qb.push(" WHERE owner_id = "),
    };
    qb.push_bind(user_id);
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.to_string());
    }
    if let Some(item_id) = filter.item_id {
        qb.push(" AND item_id = ").push_bind(item_id);
    }
}

async fn insert_booking(conn: &mut PgConnection, booking: &Booking) -> Result<Booking, sqlx::Error> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        r#"
        INSERT INTO bookings (
            id, item_id, renter_id, owner_id, start_date, end_date, status,
            subtotal, service_fee, security_deposit, delivery_fee, total_amount,
            delivery_requested, delivery_address, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING {}
        "#,
        BOOKING_COLUMNS
    ))
    .bind(booking.id)
    .bind(booking.item_id)
    .bind(booking.renter_id)
    .bind(booking.owner_id)
    .bind(booking.start_date)
    .bind(booking.end_date)
    .bind(booking.status.to_string())
    .bind(booking.pricing.base_cost)
    .bind(booking.pricing.service_fee)
    .bind(booking.pricing.security_deposit)
    .bind(booking.pricing.delivery_fee)
    .bind(booking.pricing.total_amount)
    .bind(booking.delivery_requested)
    .bind(&booking.delivery_address)
    .bind(&booking.notes)
    .fetch_one(conn)
    .await?;

    Ok(row.into())
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    item_id: Uuid,
    renter_id: Uuid,
    owner_id: Uuid,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    status: String,
    subtotal: Decimal,
    service_fee: Decimal,
    security_deposit: Decimal,
    delivery_fee: Option<Decimal>,
    total_amount: Decimal,
    delivery_requested: bool,
    delivery_address: Option<String>,
    notes: Option<String>,
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Self {
            id: row.id,
            item_id: row.item_id,
            renter_id: row.renter_id,
            owner_id: row.owner_id,
            start_date: row.start_date,
            end_date: row.end_date,
            status: BookingStatus::from_str(&row.status).unwrap_or_default(),
            pricing: CostBreakdown {
                base_cost: row.subtotal,
                security_deposit: row.security_deposit,
                service_fee: row.service_fee,
                delivery_fee: row.delivery_fee,
                total_amount: row.total_amount,
            },
            delivery_requested: row.delivery_requested,
            delivery_address: row.delivery_address,
            notes: row.notes,
            cancellation_reason: row.cancellation_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_statuses_bound_as_text() {
        assert_eq!(
            PgBookingRepository::blocking_statuses(),
            vec!["confirmed".to_string(), "active".to_string()]
        );
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_overlap_query_against_database() {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/rentshare_test".to_string());
        let pool = PgPool::connect(&url).await.unwrap();
        let repo = PgBookingRepository::new(pool);

        let now = Utc::now();
        let range = DateRange::new(now, now + chrono::Duration::days(1)).unwrap();
        let found = repo
            .find_overlapping(Uuid::new_v4(), &range, None)
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
