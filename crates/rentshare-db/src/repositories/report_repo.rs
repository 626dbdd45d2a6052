//! Moderation report repository implementation
//!
//! Also serves the admin dashboard counters, which span several tables.

use super::db_error;
use rentshare_core::{
    models::{DashboardStats, Report, ReportStatus, ReportTarget},
    traits::{Pagination, ReportRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

const REPORT_COLUMNS: &str = "id, reporter_id, target_type, target_id, reason, status, \
     resolution_note, resolved_by, created_at, updated_at";

/// PostgreSQL implementation of ReportRepository
pub struct PgReportRepository {
    pool: PgPool,
}

impl PgReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Report>> {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            "SELECT {} FROM reports WHERE id = $1",
            REPORT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find report", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, report), fields(target = %report.target_type, target_id = %report.target_id))]
    async fn create(&self, report: &Report) -> AppResult<Report> {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            INSERT INTO reports (id, reporter_id, target_type, target_id, reason, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            REPORT_COLUMNS
        ))
        .bind(report.id)
        .bind(report.reporter_id)
        .bind(report.target_type.to_string())
        .bind(report.target_id)
        .bind(&report.reason)
        .bind(report.status.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create report", e))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        status: Option<ReportStatus>,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Report>, i64)> {
        let status = status.map(|s| s.to_string());

        let total: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM reports WHERE ($1::text IS NULL OR status = $1)")
                .bind(&status)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("count reports", e))?;

        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            SELECT {} FROM reports
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at
            LIMIT $2 OFFSET $3
            "#,
            REPORT_COLUMNS
        ))
        .bind(&status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list reports", e))?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    #[instrument(skip(self))]
    async fn resolve(
        &self,
        id: Uuid,
        status: ReportStatus,
        note: Option<&str>,
        resolved_by: Uuid,
    ) -> AppResult<Report> {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            r#"
            UPDATE reports
            SET status = $2,
                resolution_note = $3,
                resolved_by = $4,
                updated_at = NOW()
            WHERE id = $1 AND status = 'open'
            RETURNING {}
            "#,
            REPORT_COLUMNS
        ))
        .bind(id)
        .bind(status.to_string())
        .bind(note)
        .bind(resolved_by)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("resolve report", e))?;

        let report: Report = row
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("Open report {}", id)))?;

        info!("Report {} closed as {} by {}", id, status, resolved_by);
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn dashboard_stats(&self) -> AppResult<DashboardStats> {
        let (total_profiles, suspended_profiles): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE suspended) FROM profiles",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("count profiles", e))?;

        let (total_items, active_items): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'active') FROM items",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("count items", e))?;

        let bookings: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM bookings GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("count bookings", e))?;

        let (open_reports,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM reports WHERE status = 'open'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("count reports", e))?;

        Ok(DashboardStats {
            total_profiles,
            suspended_profiles,
            total_items,
            active_items,
            bookings_by_status: bookings.into_iter().collect(),
            open_reports,
        })
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    id: Uuid,
    reporter_id: Uuid,
    target_type: String,
    target_id: Uuid,
    reason: String,
    status: String,
    resolution_note: Option<String>,
    resolved_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReportRow> for Report {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            reporter_id: row.reporter_id,
            target_type: ReportTarget::from_str(&row.target_type).unwrap_or(ReportTarget::Item),
            target_id: row.target_id,
            reason: row.reason,
            status: ReportStatus::from_str(&row.status).unwrap_or_default(),
            resolution_note: row.resolution_note,
            resolved_by: row.resolved_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
