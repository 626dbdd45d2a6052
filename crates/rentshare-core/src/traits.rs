//! Repository traits
//!
//! Services depend on these abstractions; the database crate provides the
//! PostgreSQL implementations and tests provide in-memory ones.

use crate::error::AppError;
use crate::filters::{BookingFilter, ItemSearch};
use crate::models::{
    Booking, BookingAction, Category, Conversation, DashboardStats, DateRange, Item, ItemImage,
    ItemStatus, Message, Notification, Profile, RatingSummary, Report, ReportStatus, Review,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Generic repository trait for CRUD operations
#[async_trait]
pub trait Repository<T, ID>: Send + Sync {
    /// Find entity by ID
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, AppError>;

    /// Create a new entity
    async fn create(&self, entity: &T) -> Result<T, AppError>;

    /// Update an existing entity
    async fn update(&self, entity: &T) -> Result<T, AppError>;

    /// Delete entity by ID
    async fn delete(&self, id: ID) -> Result<bool, AppError>;
}

/// Profile repository
#[async_trait]
pub trait ProfileRepository: Repository<Profile, Uuid> {
    /// Find profile by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, AppError>;

    /// Set or clear the suspended flag
    async fn set_suspended(&self, id: Uuid, suspended: bool) -> Result<Profile, AppError>;
}

/// Item repository
#[async_trait]
pub trait ItemRepository: Repository<Item, Uuid> {
    /// Search visible items. Returns one page and the total match count.
    async fn search(&self, search: &ItemSearch) -> Result<(Vec<Item>, i64), AppError>;

    /// Items listed by `owner_id`, any status
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        pagination: &Pagination,
    ) -> Result<(Vec<Item>, i64), AppError>;

    /// Update the listing status
    async fn set_status(&self, id: Uuid, status: ItemStatus) -> Result<Item, AppError>;

    /// Bump the view counter
    async fn increment_views(&self, id: Uuid) -> Result<(), AppError>;
}

/// Category repository
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Category>, AppError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError>;
}

/// Item image repository
#[async_trait]
pub trait ItemImageRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ItemImage>, AppError>;

    /// Images of an item ordered by `sort_order`
    async fn list_for_item(&self, item_id: Uuid) -> Result<Vec<ItemImage>, AppError>;

    async fn create(&self, image: &ItemImage) -> Result<ItemImage, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Make `image_id` the only primary image of `item_id`
    async fn set_primary(&self, item_id: Uuid, image_id: Uuid) -> Result<(), AppError>;
}

/// Booking repository
#[async_trait]
pub trait BookingRepository: Repository<Booking, Uuid> {
    /// Bookings of `item_id` in a blocking status whose window overlaps
    /// `range`, ignoring `exclude`
    async fn find_overlapping(
        &self,
        item_id: Uuid,
        range: &DateRange,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Booking>, AppError>;

    /// Insert `booking` unless a blocking booking overlaps it.
    ///
    /// The check and the insert happen atomically. A conflict is reported as
    /// `AppError::BookingConflict`.
    async fn create_if_available(&self, booking: &Booking) -> Result<Booking, AppError>;

    /// Apply `action` to the booking's current status, recording a
    /// cancellation reason when given.
    ///
    /// The status is read and written under one lock, so two concurrent
    /// actions cannot both succeed from the same starting status. An action
    /// that is illegal from the status found is `AppError::InvalidTransition`.
    async fn apply_action(
        &self,
        id: Uuid,
        action: BookingAction,
        reason: Option<&str>,
    ) -> Result<Booking, AppError>;

    /// Bookings where `user_id` plays the role named in `filter`
    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &BookingFilter,
        pagination: &Pagination,
    ) -> Result<(Vec<Booking>, i64), AppError>;
}

/// Review repository
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>, AppError>;

    /// Insert a review; a second review for the same (booking, reviewer)
    /// is reported as `AppError::AlreadyExists`
    async fn create(&self, review: &Review) -> Result<Review, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    async fn exists_for(&self, booking_id: Uuid, reviewer_id: Uuid) -> Result<bool, AppError>;

    async fn list_for_item(
        &self,
        item_id: Uuid,
        pagination: &Pagination,
    ) -> Result<(Vec<Review>, i64), AppError>;

    /// Reviews written about `user_id`
    async fn list_for_user(
        &self,
        user_id: Uuid,
        pagination: &Pagination,
    ) -> Result<(Vec<Review>, i64), AppError>;

    async fn summary_for_item(&self, item_id: Uuid) -> Result<RatingSummary, AppError>;

    async fn summary_for_user(&self, user_id: Uuid) -> Result<RatingSummary, AppError>;
}

/// Conversation repository
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Conversation>, AppError>;

    /// Conversation between two participants (given in canonical order)
    /// about `item_id`
    async fn find_between(
        &self,
        participant_one: Uuid,
        participant_two: Uuid,
        item_id: Option<Uuid>,
    ) -> Result<Option<Conversation>, AppError>;

    async fn create(&self, conversation: &Conversation) -> Result<Conversation, AppError>;

    /// Conversations `user_id` takes part in, most recently active first
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Conversation>, AppError>;

    /// Record activity on a conversation
    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
}

/// Message repository
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: &Message) -> Result<Message, AppError>;

    /// Messages of a conversation, oldest first
    async fn list(
        &self,
        conversation_id: Uuid,
        pagination: &Pagination,
    ) -> Result<Vec<Message>, AppError>;

    /// Mark every message not sent by `reader_id` as read.
    /// Returns how many messages changed.
    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<u64, AppError>;

    /// Unread messages addressed to `user_id` across all conversations
    async fn unread_count(&self, user_id: Uuid) -> Result<i64, AppError>;
}

/// Favorite repository
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// Save an item. Returns false if it was already saved.
    async fn add(&self, user_id: Uuid, item_id: Uuid) -> Result<bool, AppError>;

    async fn remove(&self, user_id: Uuid, item_id: Uuid) -> Result<bool, AppError>;

    /// Saved item ids, newest first
    async fn list_item_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError>;
}

/// Notification repository
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<Notification, AppError>;

    async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        pagination: &Pagination,
    ) -> Result<Vec<Notification>, AppError>;

    /// Mark one notification read; false when it does not belong to `user_id`
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool, AppError>;

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, AppError>;
}

/// Moderation report repository
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Report>, AppError>;

    async fn create(&self, report: &Report) -> Result<Report, AppError>;

    async fn list(
        &self,
        status: Option<ReportStatus>,
        pagination: &Pagination,
    ) -> Result<(Vec<Report>, i64), AppError>;

    /// Close a report as resolved or dismissed
    async fn resolve(
        &self,
        id: Uuid,
        status: ReportStatus,
        note: Option<&str>,
        resolved_by: Uuid,
    ) -> Result<Report, AppError>;

    /// Counters for the admin dashboard
    async fn dashboard_stats(&self) -> Result<DashboardStats, AppError>;
}

/// Pagination parameters
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, pagination: &Pagination) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(total, pagination.page, pagination.per_page),
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);

        let p = Pagination::new(3, 20);
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination::new(0, 10);
        assert_eq!(p.page, 1);

        let p = Pagination::new(1, 500);
        assert_eq!(p.per_page, 100);
    }

    #[test]
    fn test_paginated_response_meta() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 23, &Pagination::new(2, 10));
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.pagination.page, 2);
        assert_eq!(page.data.len(), 3);
    }
}
