//! Reports and admin moderation actions

use rentshare_cache::{keys, CacheLayer};
use rentshare_core::{
    models::{DashboardStats, Item, ItemStatus, Profile, Report, ReportStatus, ReportTarget},
    traits::{ItemRepository, Pagination, ProfileRepository, ReportRepository, ReviewRepository},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Longest accepted report reason, in characters
pub const MAX_REASON_LENGTH: usize = 1000;

pub struct ModerationService {
    reports: Arc<dyn ReportRepository>,
    items: Arc<dyn ItemRepository>,
    profiles: Arc<dyn ProfileRepository>,
    reviews: Arc<dyn ReviewRepository>,
    cache: Arc<CacheLayer>,
}

impl ModerationService {
    pub fn new(
        reports: Arc<dyn ReportRepository>,
        items: Arc<dyn ItemRepository>,
        profiles: Arc<dyn ProfileRepository>,
        reviews: Arc<dyn ReviewRepository>,
        cache: Arc<CacheLayer>,
    ) -> Self {
        Self {
            reports,
            items,
            profiles,
            reviews,
            cache,
        }
    }

    async fn target_exists(&self, target: ReportTarget, id: Uuid) -> AppResult<bool> {
        Ok(match target {
            ReportTarget::Item => self.items.find_by_id(id).await?.is_some(),
            ReportTarget::Profile => self.profiles.find_by_id(id).await?.is_some(),
            ReportTarget::Review => self.reviews.find_by_id(id).await?.is_some(),
        })
    }

    /// Any member may report an item, a profile or a review
    #[instrument(skip(self, reason))]
    pub async fn file_report(
        &self,
        reporter_id: Uuid,
        target_type: ReportTarget,
        target_id: Uuid,
        reason: &str,
    ) -> AppResult<Report> {
        let reason = reason.trim();
        if reason.is_empty() || reason.chars().count() > MAX_REASON_LENGTH {
            return Err(AppError::Validation(format!(
                "reason must be 1 to {} characters",
                MAX_REASON_LENGTH
            )));
        }
        if !self.target_exists(target_type, target_id).await? {
            return Err(AppError::NotFound(format!("{} {}", target_type, target_id)));
        }

        let report = self
            .reports
            .create(&Report::new(reporter_id, target_type, target_id, reason.to_string()))
            .await?;
        info!("Report {} filed against {} {}", report.id, target_type, target_id);
        Ok(report)
    }

    pub async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Report>, i64)> {
        self.reports.list(status, pagination).await
    }

    /// Close an open report as resolved or dismissed
    #[instrument(skip(self, note))]
    pub async fn resolve_report(
        &self,
        admin_id: Uuid,
        report_id: Uuid,
        status: ReportStatus,
        note: Option<String>,
    ) -> AppResult<Report> {
        if status == ReportStatus::Open {
            return Err(AppError::Validation(
                "a report can only be resolved or dismissed".to_string(),
            ));
        }
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        let report = self
            .reports
            .resolve(report_id, status, note.as_deref(), admin_id)
            .await?;
        info!("Report {} {} by {}", report_id, status, admin_id);
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn suspend_item(&self, admin_id: Uuid, item_id: Uuid) -> AppResult<Item> {
        let item = self.items.set_status(item_id, ItemStatus::Suspended).await?;
        warn!("Item {} suspended by {}", item_id, admin_id);
        self.cache.invalidate_item(item_id).await;
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn reinstate_item(&self, admin_id: Uuid, item_id: Uuid) -> AppResult<Item> {
        let item = self
            .items
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::ItemNotFound(item_id.to_string()))?;
        if item.status != ItemStatus::Suspended {
            return Err(AppError::Conflict(format!("item {} is not suspended", item_id)));
        }

        let item = self.items.set_status(item_id, ItemStatus::Active).await?;
        info!("Item {} reinstated by {}", item_id, admin_id);
        self.cache.invalidate_item(item_id).await;
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn suspend_profile(&self, admin_id: Uuid, user_id: Uuid) -> AppResult<Profile> {
        if admin_id == user_id {
            return Err(AppError::Validation("admins cannot suspend themselves".to_string()));
        }
        let profile = self.profiles.set_suspended(user_id, true).await?;
        warn!("Profile {} suspended by {}", user_id, admin_id);
        self.cache.invalidate_user(user_id).await;
        Ok(profile)
    }

    #[instrument(skip(self))]
    pub async fn reinstate_profile(&self, admin_id: Uuid, user_id: Uuid) -> AppResult<Profile> {
        let profile = self.profiles.set_suspended(user_id, false).await?;
        info!("Profile {} reinstated by {}", user_id, admin_id);
        self.cache.invalidate_user(user_id).await;
        Ok(profile)
    }

    #[instrument(skip(self))]
    pub async fn delete_review(&self, admin_id: Uuid, review_id: Uuid) -> AppResult<()> {
        let review = self
            .reviews
            .find_by_id(review_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Review {}", review_id)))?;

        self.reviews.delete(review_id).await?;
        warn!("Review {} deleted by {}", review_id, admin_id);

        self.cache.invalidate(&keys::item_reviews_key(review.item_id)).await;
        self.cache.invalidate_user(review.reviewee_id).await;
        Ok(())
    }

    pub async fn dashboard_stats(&self) -> AppResult<DashboardStats> {
        self.reports.dashboard_stats().await
    }
}
