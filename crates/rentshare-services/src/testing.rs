//! In-memory repositories
//!
//! Behave like the PostgreSQL repositories closely enough for service and
//! handler tests: same uniqueness rules, same conflict errors, same ordering.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rentshare_core::{
    filters::{BookingFilter, BookingRole, ItemSearch, SortOrder},
    models::{
        Booking, BookingAction, Category, Conversation, DashboardStats, DateRange, Item,
        ItemImage, ItemStatus, Message, Notification, Profile, RatingSummary, Report,
        ReportStatus, Review,
    },
    traits::{
        BookingRepository, CategoryRepository, ConversationRepository, FavoriteRepository,
        ItemImageRepository, ItemRepository, MessageRepository, NotificationRepository,
        Pagination, ProfileRepository, ReportRepository, Repository, ReviewRepository,
    },
    AppError, AppResult,
};
use std::collections::HashMap;
use uuid::Uuid;

fn page<T>(rows: Vec<T>, pagination: &Pagination) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let data = rows
        .into_iter()
        .skip(pagination.offset() as usize)
        .take(pagination.limit() as usize)
        .collect();
    (data, total)
}

// ==================== Profiles ====================

#[derive(Default)]
pub struct InMemoryProfileRepository {
    rows: Mutex<HashMap<Uuid, Profile>>,
}

impl InMemoryProfileRepository {
    pub fn with(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let repo = Self::default();
        repo.rows
            .lock()
            .extend(profiles.into_iter().map(|p| (p.id, p)));
        repo
    }
}

#[async_trait]
impl Repository<Profile, Uuid> for InMemoryProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.rows.lock().get(&id).cloned())
    }

    async fn create(&self, entity: &Profile) -> AppResult<Profile> {
        let mut rows = self.rows.lock();
        let email = entity.email.to_lowercase();
        if rows.values().any(|p| p.email.to_lowercase() == email) {
            return Err(AppError::AlreadyExists(format!("Email {} is already registered", entity.email)));
        }
        rows.insert(entity.id, entity.clone());
        Ok(entity.clone())
    }

    async fn update(&self, entity: &Profile) -> AppResult<Profile> {
        let mut rows = self.rows.lock();
        let row = rows
            .get_mut(&entity.id)
            .ok_or_else(|| AppError::UserNotFound(entity.id.to_string()))?;
        row.full_name = entity.full_name.clone();
        row.avatar_url = entity.avatar_url.clone();
        row.bio = entity.bio.clone();
        row.location = entity.location.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.rows.lock().remove(&id).is_some())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        let email = email.to_lowercase();
        Ok(self
            .rows
            .lock()
            .values()
            .find(|p| p.email.to_lowercase() == email)
            .cloned())
    }

    async fn set_suspended(&self, id: Uuid, suspended: bool) -> AppResult<Profile> {
        let mut rows = self.rows.lock();
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))?;
        row.suspended = suspended;
        Ok(row.clone())
    }
}

// ==================== Items ====================

#[derive(Default)]
pub struct InMemoryItemRepository {
    rows: Mutex<HashMap<Uuid, Item>>,
}

impl InMemoryItemRepository {
    pub fn with(items: impl IntoIterator<Item = Item>) -> Self {
        let repo = Self::default();
        repo.rows.lock().extend(items.into_iter().map(|i| (i.id, i)));
        repo
    }

    fn matches(item: &Item, search: &ItemSearch) -> bool {
        if item.status != ItemStatus::Active {
            return false;
        }
        if let Some(text) = search.text() {
            let text = text.to_lowercase();
            if !item.title.to_lowercase().contains(&text)
                && !item.description.to_lowercase().contains(&text)
            {
                return false;
            }
        }
        if search.category_id.is_some() && item.category_id != search.category_id {
            return false;
        }
        if search.min_price.is_some_and(|min| item.daily_rate < min)
            || search.max_price.is_some_and(|max| item.daily_rate > max)
        {
            return false;
        }
        if let Some(location) = &search.location {
            let wanted = location.to_lowercase();
            if !item
                .location
                .as_deref()
                .is_some_and(|l| l.to_lowercase().contains(&wanted))
            {
                return false;
            }
        }
        if search.delivery_only && !item.delivery_available {
            return false;
        }
        if let (Some(centre), Some(radius)) = (search.near, search.radius_km) {
            if !item.coordinates().is_some_and(|p| centre.within_km(&p, radius)) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl Repository<Item, Uuid> for InMemoryItemRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Item>> {
        Ok(self.rows.lock().get(&id).cloned())
    }

    async fn create(&self, entity: &Item) -> AppResult<Item> {
        self.rows.lock().insert(entity.id, entity.clone());
        Ok(entity.clone())
    }

    async fn update(&self, entity: &Item) -> AppResult<Item> {
        let mut rows = self.rows.lock();
        if !rows.contains_key(&entity.id) {
            return Err(AppError::ItemNotFound(entity.id.to_string()));
        }
        let mut updated = entity.clone();
        updated.updated_at = Utc::now();
        rows.insert(entity.id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.rows.lock().remove(&id).is_some())
    }
}

#[async_trait]
impl ItemRepository for InMemoryItemRepository {
    async fn search(&self, search: &ItemSearch) -> AppResult<(Vec<Item>, i64)> {
        let mut hits: Vec<Item> = self
            .rows
            .lock()
            .values()
            .filter(|item| Self::matches(item, search))
            .cloned()
            .collect();

        match search.sort {
            SortOrder::Newest => hits.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::PriceAsc => hits.sort_by(|a, b| a.daily_rate.cmp(&b.daily_rate)),
            SortOrder::PriceDesc => hits.sort_by(|a, b| b.daily_rate.cmp(&a.daily_rate)),
            SortOrder::Popular => hits.sort_by(|a, b| b.view_count.cmp(&a.view_count)),
        }

        Ok(page(hits, &search.pagination()))
    }

    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Item>, i64)> {
        let mut rows: Vec<Item> = self
            .rows
            .lock()
            .values()
            .filter(|i| i.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(rows, pagination))
    }

    async fn set_status(&self, id: Uuid, status: ItemStatus) -> AppResult<Item> {
        let mut rows = self.rows.lock();
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::ItemNotFound(id.to_string()))?;
        row.status = status;
        Ok(row.clone())
    }

    async fn increment_views(&self, id: Uuid) -> AppResult<()> {
        if let Some(row) = self.rows.lock().get_mut(&id) {
            row.view_count += 1;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCategoryRepository {
    rows: Mutex<Vec<Category>>,
}

impl InMemoryCategoryRepository {
    pub fn with(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            rows: Mutex::new(categories.into_iter().collect()),
        }
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn list(&self) -> AppResult<Vec<Category>> {
        let mut rows = self.rows.lock().clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Category>> {
        Ok(self.rows.lock().iter().find(|c| c.slug == slug).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryItemImageRepository {
    rows: Mutex<HashMap<Uuid, ItemImage>>,
}

#[async_trait]
impl ItemImageRepository for InMemoryItemImageRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ItemImage>> {
        Ok(self.rows.lock().get(&id).cloned())
    }

    async fn list_for_item(&self, item_id: Uuid) -> AppResult<Vec<ItemImage>> {
        let mut rows: Vec<ItemImage> = self
            .rows
            .lock()
            .values()
            .filter(|i| i.item_id == item_id)
            .cloned()
            .collect();
        rows.sort_by_key(|i| (i.sort_order, i.created_at));
        Ok(rows)
    }

    async fn create(&self, image: &ItemImage) -> AppResult<ItemImage> {
        self.rows.lock().insert(image.id, image.clone());
        Ok(image.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.rows.lock().remove(&id).is_some())
    }

    async fn set_primary(&self, item_id: Uuid, image_id: Uuid) -> AppResult<()> {
        for image in self.rows.lock().values_mut() {
            if image.item_id == item_id {
                image.is_primary = image.id == image_id;
            }
        }
        Ok(())
    }
}

// ==================== Bookings ====================

#[derive(Default)]
pub struct InMemoryBookingRepository {
    rows: Mutex<HashMap<Uuid, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn with(bookings: impl IntoIterator<Item = Booking>) -> Self {
        let repo = Self::default();
        repo.rows
            .lock()
            .extend(bookings.into_iter().map(|b| (b.id, b)));
        repo
    }

    fn overlapping(
        rows: &HashMap<Uuid, Booking>,
        item_id: Uuid,
        range: &DateRange,
        exclude: Option<Uuid>,
    ) -> Vec<Booking> {
        rows.values()
            .filter(|b| {
                b.item_id == item_id
                    && Some(b.id) != exclude
                    && b.status.blocks_availability()
                    && b.range().overlaps(range)
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Repository<Booking, Uuid> for InMemoryBookingRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        Ok(self.rows.lock().get(&id).cloned())
    }

    async fn create(&self, entity: &Booking) -> AppResult<Booking> {
        self.rows.lock().insert(entity.id, entity.clone());
        Ok(entity.clone())
    }

    async fn update(&self, entity: &Booking) -> AppResult<Booking> {
        self.rows.lock().insert(entity.id, entity.clone());
        Ok(entity.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.rows.lock().remove(&id).is_some())
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn find_overlapping(
        &self,
        item_id: Uuid,
        range: &DateRange,
        exclude: Option<Uuid>,
    ) -> AppResult<Vec<Booking>> {
        Ok(Self::overlapping(&self.rows.lock(), item_id, range, exclude))
    }

    async fn create_if_available(&self, booking: &Booking) -> AppResult<Booking> {
        let mut rows = self.rows.lock();
        if !Self::overlapping(&rows, booking.item_id, &booking.range(), None).is_empty() {
            return Err(AppError::BookingConflict {
                item_id: booking.item_id.to_string(),
            });
        }
        rows.insert(booking.id, booking.clone());
        Ok(booking.clone())
    }

    async fn apply_action(
        &self,
        id: Uuid,
        action: BookingAction,
        reason: Option<&str>,
    ) -> AppResult<Booking> {
        let mut rows = self.rows.lock();
        let current = rows
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::BookingNotFound(id.to_string()))?;
        let status = current.status.transition(action)?;

        if status.blocks_availability()
            && !current.status.blocks_availability()
            && !Self::overlapping(&rows, current.item_id, &current.range(), Some(id)).is_empty()
        {
            return Err(AppError::BookingConflict {
                item_id: current.item_id.to_string(),
            });
        }

        let row = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::BookingNotFound(id.to_string()))?;
        row.status = status;
        if let Some(reason) = reason {
            row.cancellation_reason = Some(reason.to_string());
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: &BookingFilter,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Booking>, i64)> {
        let mut rows: Vec<Booking> = self
            .rows
            .lock()
            .values()
            .filter(|b| match filter.role {
                BookingRole::Renter => b.renter_id == user_id,
                BookingRole::Owner => b.owner_id == user_id,
            })
            .filter(|b| filter.status.map_or(true, |s| b.status == s))
            .filter(|b| filter.item_id.map_or(true, |i| b.item_id == i))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(page(rows, pagination))
    }
}

// ==================== Reviews ====================

#[derive(Default)]
pub struct InMemoryReviewRepository {
    rows: Mutex<HashMap<Uuid, Review>>,
}

impl InMemoryReviewRepository {
    fn list_by(&self, pred: impl Fn(&Review) -> bool, pagination: &Pagination) -> (Vec<Review>, i64) {
        let mut rows: Vec<Review> = self.rows.lock().values().filter(|r| pred(r)).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        page(rows, pagination)
    }

    fn summary_by(&self, pred: impl Fn(&Review) -> bool) -> RatingSummary {
        let ratings: Vec<i16> = self
            .rows
            .lock()
            .values()
            .filter(|r| pred(r))
            .map(|r| r.rating)
            .collect();
        RatingSummary::from_ratings(&ratings)
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Review>> {
        Ok(self.rows.lock().get(&id).cloned())
    }

    async fn create(&self, review: &Review) -> AppResult<Review> {
        let mut rows = self.rows.lock();
        if rows
            .values()
            .any(|r| r.booking_id == review.booking_id && r.reviewer_id == review.reviewer_id)
        {
            return Err(AppError::AlreadyExists(format!(
                "Booking {} is already reviewed",
                review.booking_id
            )));
        }
        rows.insert(review.id, review.clone());
        Ok(review.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.rows.lock().remove(&id).is_some())
    }

    async fn exists_for(&self, booking_id: Uuid, reviewer_id: Uuid) -> AppResult<bool> {
        Ok(self
            .rows
            .lock()
            .values()
            .any(|r| r.booking_id == booking_id && r.reviewer_id == reviewer_id))
    }

    async fn list_for_item(
        &self,
        item_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Review>, i64)> {
        Ok(self.list_by(|r| r.item_id == item_id, pagination))
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Review>, i64)> {
        Ok(self.list_by(|r| r.reviewee_id == user_id, pagination))
    }

    async fn summary_for_item(&self, item_id: Uuid) -> AppResult<RatingSummary> {
        Ok(self.summary_by(|r| r.item_id == item_id))
    }

    async fn summary_for_user(&self, user_id: Uuid) -> AppResult<RatingSummary> {
        Ok(self.summary_by(|r| r.reviewee_id == user_id))
    }
}

// ==================== Messaging ====================

#[derive(Default)]
pub struct InMemoryConversationRepository {
    rows: Mutex<HashMap<Uuid, Conversation>>,
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        Ok(self.rows.lock().get(&id).cloned())
    }

    async fn find_between(
        &self,
        participant_one: Uuid,
        participant_two: Uuid,
        item_id: Option<Uuid>,
    ) -> AppResult<Option<Conversation>> {
        Ok(self
            .rows
            .lock()
            .values()
            .find(|c| {
                c.participant_one == participant_one
                    && c.participant_two == participant_two
                    && c.item_id == item_id
            })
            .cloned())
    }

    async fn create(&self, conversation: &Conversation) -> AppResult<Conversation> {
        self.rows.lock().insert(conversation.id, conversation.clone());
        Ok(conversation.clone())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Conversation>> {
        let mut rows: Vec<Conversation> = self
            .rows
            .lock()
            .values()
            .filter(|c| c.has_participant(user_id))
            .cloned()
            .collect();
        rows.sort_by_key(|c| std::cmp::Reverse(c.last_message_at.unwrap_or(c.created_at)));
        Ok(rows)
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(row) = self.rows.lock().get_mut(&id) {
            row.last_message_at = Some(at);
        }
        Ok(())
    }
}

/// Messages plus the conversations they belong to, for unread counts
pub struct InMemoryMessageRepository {
    rows: Mutex<Vec<Message>>,
    conversations: std::sync::Arc<InMemoryConversationRepository>,
}

impl InMemoryMessageRepository {
    pub fn new(conversations: std::sync::Arc<InMemoryConversationRepository>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            conversations,
        }
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: &Message) -> AppResult<Message> {
        self.rows.lock().push(message.clone());
        Ok(message.clone())
    }

    async fn list(&self, conversation_id: Uuid, pagination: &Pagination) -> AppResult<Vec<Message>> {
        let rows: Vec<Message> = self
            .rows
            .lock()
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        Ok(page(rows, pagination).0)
    }

    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> AppResult<u64> {
        let mut changed = 0;
        for m in self.rows.lock().iter_mut() {
            if m.conversation_id == conversation_id && m.sender_id != reader_id && !m.read {
                m.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let mine: Vec<Uuid> = self
            .conversations
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|m| mine.contains(&m.conversation_id) && m.sender_id != user_id && !m.read)
            .count() as i64)
    }
}

// ==================== Favorites / notifications ====================

#[derive(Default)]
pub struct InMemoryFavoriteRepository {
    rows: Mutex<Vec<(Uuid, Uuid)>>,
}

#[async_trait]
impl FavoriteRepository for InMemoryFavoriteRepository {
    async fn add(&self, user_id: Uuid, item_id: Uuid) -> AppResult<bool> {
        let mut rows = self.rows.lock();
        if rows.contains(&(user_id, item_id)) {
            return Ok(false);
        }
        rows.push((user_id, item_id));
        Ok(true)
    }

    async fn remove(&self, user_id: Uuid, item_id: Uuid) -> AppResult<bool> {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|row| *row != (user_id, item_id));
        Ok(rows.len() < before)
    }

    async fn list_item_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .rows
            .lock()
            .iter()
            .rev()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, i)| *i)
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    rows: Mutex<Vec<Notification>>,
}

impl InMemoryNotificationRepository {
    /// Every notification addressed to `user_id`, oldest first
    pub fn for_user(&self, user_id: Uuid) -> Vec<Notification> {
        self.rows
            .lock()
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: &Notification) -> AppResult<Notification> {
        self.rows.lock().push(notification.clone());
        Ok(notification.clone())
    }

    async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        pagination: &Pagination,
    ) -> AppResult<Vec<Notification>> {
        let rows: Vec<Notification> = self
            .rows
            .lock()
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.read))
            .cloned()
            .collect();
        Ok(page(rows, pagination).0)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut rows = self.rows.lock();
        match rows.iter_mut().find(|n| n.id == id && n.user_id == user_id) {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let mut changed = 0;
        for n in self.rows.lock().iter_mut() {
            if n.user_id == user_id && !n.read {
                n.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

// ==================== Moderation ====================

#[derive(Default)]
pub struct InMemoryReportRepository {
    rows: Mutex<Vec<Report>>,
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Report>> {
        Ok(self.rows.lock().iter().find(|r| r.id == id).cloned())
    }

    async fn create(&self, report: &Report) -> AppResult<Report> {
        self.rows.lock().push(report.clone());
        Ok(report.clone())
    }

    async fn list(
        &self,
        status: Option<ReportStatus>,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Report>, i64)> {
        let rows: Vec<Report> = self
            .rows
            .lock()
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        Ok(page(rows, pagination))
    }

    async fn resolve(
        &self,
        id: Uuid,
        status: ReportStatus,
        note: Option<&str>,
        resolved_by: Uuid,
    ) -> AppResult<Report> {
        let mut rows = self.rows.lock();
        let report = rows
            .iter_mut()
            .find(|r| r.id == id && r.is_open())
            .ok_or_else(|| AppError::NotFound(format!("Open report {}", id)))?;
        report.status = status;
        report.resolution_note = note.map(str::to_string);
        report.resolved_by = Some(resolved_by);
        report.updated_at = Utc::now();
        Ok(report.clone())
    }

    async fn dashboard_stats(&self) -> AppResult<DashboardStats> {
        Ok(DashboardStats {
            open_reports: self.rows.lock().iter().filter(|r| r.is_open()).count() as i64,
            ..Default::default()
        })
    }
}
