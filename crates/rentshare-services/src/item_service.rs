//! Listings: items, categories and item images
//!
//! Reads go through the cache. Every write drops the item's own keys and
//! every cached search page, since any change can move an item in or out of
//! a result set.

use bytes::Bytes;
use chrono::{Duration, Utc};
use rentshare_cache::{keys, CacheLayer, FetchOptions};
use rentshare_core::{
    filters::ItemSearch,
    location::GeoPoint,
    models::{Category, DateRange, Item, ItemCondition, ItemImage, ItemStatus},
    traits::{
        BookingRepository, CategoryRepository, ItemImageRepository, ItemRepository, Pagination,
    },
    AppError, AppResult,
};
use rentshare_storage::{Bucket, FileStorage};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Most images one item may carry
pub const MAX_IMAGES_PER_ITEM: usize = 10;

/// Fields of a new listing
#[derive(Debug, Clone)]
pub struct NewItem {
    pub category_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub condition: ItemCondition,
    pub daily_rate: Decimal,
    pub hourly_rate: Option<Decimal>,
    pub security_deposit: Decimal,
    pub min_rental_days: i32,
    pub max_rental_days: Option<i32>,
    pub delivery_available: bool,
    pub delivery_fee: Option<Decimal>,
    pub location: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

/// Listing changes; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub category_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub condition: Option<ItemCondition>,
    pub daily_rate: Option<Decimal>,
    pub hourly_rate: Option<Decimal>,
    pub security_deposit: Option<Decimal>,
    pub min_rental_days: Option<i32>,
    pub max_rental_days: Option<i32>,
    pub delivery_available: Option<bool>,
    pub delivery_fee: Option<Decimal>,
    pub location: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    pub items: Vec<Item>,
    pub total: i64,
}

/// Item with its images, as shown on the listing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDetails {
    #[serde(flatten)]
    pub item: Item,
    pub images: Vec<ItemImage>,
}

fn check_listing(item: &Item) -> AppResult<()> {
    if item.title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    if item.daily_rate <= Decimal::ZERO {
        return Err(AppError::Validation("daily_rate must be positive".to_string()));
    }
    if item.hourly_rate.is_some_and(|r| r <= Decimal::ZERO) {
        return Err(AppError::Validation("hourly_rate must be positive".to_string()));
    }
    if item.security_deposit.is_sign_negative() {
        return Err(AppError::Validation(
            "security_deposit must not be negative".to_string(),
        ));
    }
    if item.min_rental_days < 1 {
        return Err(AppError::Validation(
            "min_rental_days must be at least 1".to_string(),
        ));
    }
    if item.max_rental_days.is_some_and(|max| max < item.min_rental_days) {
        return Err(AppError::Validation(
            "max_rental_days must not be below min_rental_days".to_string(),
        ));
    }
    if item.delivery_fee.is_some_and(|f| f.is_sign_negative()) {
        return Err(AppError::Validation("delivery_fee must not be negative".to_string()));
    }
    if item.coordinates().is_some_and(|p| !p.is_valid()) {
        return Err(AppError::Validation("invalid coordinates".to_string()));
    }
    Ok(())
}

pub struct ItemService {
    items: Arc<dyn ItemRepository>,
    categories: Arc<dyn CategoryRepository>,
    images: Arc<dyn ItemImageRepository>,
    bookings: Arc<dyn BookingRepository>,
    cache: Arc<CacheLayer>,
    files: FileStorage,
}

impl ItemService {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        categories: Arc<dyn CategoryRepository>,
        images: Arc<dyn ItemImageRepository>,
        bookings: Arc<dyn BookingRepository>,
        cache: Arc<CacheLayer>,
        files: FileStorage,
    ) -> Self {
        Self {
            items,
            categories,
            images,
            bookings,
            cache,
            files,
        }
    }

    async fn load(&self, item_id: Uuid) -> AppResult<Item> {
        self.items
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::ItemNotFound(item_id.to_string()))
    }

    async fn load_owned(&self, item_id: Uuid, user_id: Uuid) -> AppResult<Item> {
        let item = self.load(item_id).await?;
        if !item.is_owned_by(user_id) {
            warn!("User {} tried to modify item {}", user_id, item_id);
            return Err(AppError::Forbidden);
        }
        Ok(item)
    }

    #[instrument(skip(self, new), fields(title = %new.title))]
    pub async fn create_item(&self, owner_id: Uuid, new: NewItem) -> AppResult<Item> {
        let item = Item {
            owner_id,
            category_id: new.category_id,
            title: new.title.trim().to_string(),
            description: new.description,
            condition: new.condition,
            daily_rate: new.daily_rate,
            hourly_rate: new.hourly_rate,
            security_deposit: new.security_deposit,
            min_rental_days: new.min_rental_days,
            max_rental_days: new.max_rental_days,
            delivery_available: new.delivery_available,
            delivery_fee: new.delivery_fee.filter(|_| new.delivery_available),
            location: new.location,
            latitude: new.coordinates.map(|p| p.latitude),
            longitude: new.coordinates.map(|p| p.longitude),
            ..Default::default()
        };
        check_listing(&item)?;

        let item = self.items.create(&item).await?;
        info!("Item {} listed by {}", item.id, owner_id);

        self.cache.invalidate_searches().await;
        Ok(item)
    }

    #[instrument(skip(self, update))]
    pub async fn update_item(&self, item_id: Uuid, user_id: Uuid, update: ItemUpdate) -> AppResult<Item> {
        let mut item = self.load_owned(item_id, user_id).await?;

        if let Some(category_id) = update.category_id {
            item.category_id = Some(category_id);
        }
        if let Some(title) = update.title {
            item.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            item.description = description;
        }
        if let Some(condition) = update.condition {
            item.condition = condition;
        }
        if let Some(rate) = update.daily_rate {
            item.daily_rate = rate;
        }
        if let Some(rate) = update.hourly_rate {
            item.hourly_rate = Some(rate);
        }
        if let Some(deposit) = update.security_deposit {
            item.security_deposit = deposit;
        }
        if let Some(days) = update.min_rental_days {
            item.min_rental_days = days;
        }
        if let Some(days) = update.max_rental_days {
            item.max_rental_days = Some(days);
        }
        if let Some(available) = update.delivery_available {
            item.delivery_available = available;
        }
        if let Some(fee) = update.delivery_fee {
            item.delivery_fee = Some(fee);
        }
        if !item.delivery_available {
            item.delivery_fee = None;
        }
        if let Some(location) = update.location {
            item.location = Some(location);
        }
        if let Some(point) = update.coordinates {
            item.latitude = Some(point.latitude);
            item.longitude = Some(point.longitude);
        }
        check_listing(&item)?;

        let item = self.items.update(&item).await?;
        self.cache.invalidate_item(item_id).await;
        Ok(item)
    }

    /// Delete a listing unless it has upcoming confirmed or active bookings
    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: Uuid, user_id: Uuid) -> AppResult<()> {
        self.load_owned(item_id, user_id).await?;

        let now = Utc::now();
        let ahead = DateRange::new(now, now + Duration::days(365 * 100))?;
        if !self
            .bookings
            .find_overlapping(item_id, &ahead, None)
            .await?
            .is_empty()
        {
            return Err(AppError::Conflict(
                "item has upcoming bookings; cancel them first".to_string(),
            ));
        }

        let images = self.images.list_for_item(item_id).await?;
        if !self.items.delete(item_id).await? {
            return Err(AppError::ItemNotFound(item_id.to_string()));
        }
        for image in images {
            self.files
                .delete_quietly(Bucket::ItemImages, &image.storage_path)
                .await;
        }

        info!("Item {} deleted", item_id);
        self.cache.invalidate_item(item_id).await;
        Ok(())
    }

    /// Item with its images. Counts a view; suspended and inactive items
    /// are only visible to their owner.
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: Uuid, viewer: Option<Uuid>) -> AppResult<ItemDetails> {
        let items = self.items.clone();
        let images = self.images.clone();

        let details: ItemDetails = self
            .cache
            .with_cache(
                &keys::item_key(item_id),
                || async move {
                    let item = items
                        .find_by_id(item_id)
                        .await?
                        .ok_or_else(|| AppError::ItemNotFound(item_id.to_string()))?;
                    let images = images.list_for_item(item_id).await?;
                    Ok(ItemDetails { item, images })
                },
                FetchOptions::with_ttl_secs(keys::ITEM_TTL_SECS),
            )
            .await?;

        let is_owner = viewer.is_some_and(|v| details.item.is_owned_by(v));
        if !is_owner
            && matches!(details.item.status, ItemStatus::Inactive | ItemStatus::Suspended)
        {
            return Err(AppError::ItemNotFound(item_id.to_string()));
        }

        if !is_owner {
            if let Err(e) = self.items.increment_views(item_id).await {
                warn!("Failed to count view of item {}: {}", item_id, e);
            }
        }

        Ok(details)
    }

    #[instrument(skip(self))]
    pub async fn list_items_by_owner(
        &self,
        owner_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Item>, i64)> {
        self.items.list_by_owner(owner_id, pagination).await
    }

    /// Search active items; pages are cached briefly
    #[instrument(skip(self, search))]
    pub async fn search_items(&self, search: &ItemSearch) -> AppResult<SearchPage> {
        search.validate()?;

        let key = search.cache_key();
        debug!("Item search {}", key);
        let items = self.items.clone();
        let search = search.clone();

        self.cache
            .with_cache(
                &key,
                || async move {
                    let (items, total) = items.search(&search).await?;
                    Ok(SearchPage { items, total })
                },
                FetchOptions::with_ttl_secs(keys::SEARCH_TTL_SECS),
            )
            .await
    }

    /// Owner hides or re-lists an item. Moderation status is out of reach.
    #[instrument(skip(self))]
    pub async fn set_item_status(
        &self,
        item_id: Uuid,
        user_id: Uuid,
        status: ItemStatus,
    ) -> AppResult<Item> {
        let item = self.load_owned(item_id, user_id).await?;

        if item.status == ItemStatus::Suspended {
            return Err(AppError::Forbidden);
        }
        if !matches!(status, ItemStatus::Active | ItemStatus::Inactive) {
            return Err(AppError::Validation(format!(
                "owners can only set an item active or inactive, not {}",
                status
            )));
        }

        let item = self.items.set_status(item_id, status).await?;
        self.cache.invalidate_item(item_id).await;
        Ok(item)
    }

    // ==================== Categories ====================

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories = self.categories.clone();
        self.cache
            .with_cache(
                keys::CATEGORIES_KEY,
                || async move { categories.list().await },
                FetchOptions::with_ttl_secs(keys::CATEGORIES_TTL_SECS),
            )
            .await
    }

    pub async fn category_by_slug(&self, slug: &str) -> AppResult<Category> {
        self.categories
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {}", slug)))
    }

    // ==================== Images ====================

    /// Upload and attach an image. The first image becomes primary.
    #[instrument(skip(self, data))]
    pub async fn add_image(
        &self,
        item_id: Uuid,
        user_id: Uuid,
        content_type: &str,
        data: Bytes,
    ) -> AppResult<ItemImage> {
        self.load_owned(item_id, user_id).await?;

        let existing = self.images.list_for_item(item_id).await?;
        if existing.len() >= MAX_IMAGES_PER_ITEM {
            return Err(AppError::Validation(format!(
                "an item can have at most {} images",
                MAX_IMAGES_PER_ITEM
            )));
        }

        let stored = self
            .files
            .upload(Bucket::ItemImages, user_id, content_type, data)
            .await?;

        let image = ItemImage {
            id: Uuid::new_v4(),
            item_id,
            storage_path: stored.path.clone(),
            url: stored.url,
            is_primary: existing.is_empty(),
            sort_order: existing.iter().map(|i| i.sort_order + 1).max().unwrap_or(0),
            created_at: Utc::now(),
        };

        let image = match self.images.create(&image).await {
            Ok(image) => image,
            Err(e) => {
                self.files.delete_quietly(Bucket::ItemImages, &stored.path).await;
                return Err(e);
            }
        };

        self.cache.invalidate_item(item_id).await;
        Ok(image)
    }

    pub async fn list_images(&self, item_id: Uuid) -> AppResult<Vec<ItemImage>> {
        self.images.list_for_item(item_id).await
    }

    /// Remove an image. If it was primary, the next one takes over.
    #[instrument(skip(self))]
    pub async fn delete_image(&self, item_id: Uuid, image_id: Uuid, user_id: Uuid) -> AppResult<()> {
        self.load_owned(item_id, user_id).await?;

        let image = self
            .images
            .find_by_id(image_id)
            .await?
            .filter(|i| i.item_id == item_id)
            .ok_or_else(|| AppError::NotFound(format!("Image {}", image_id)))?;

        self.images.delete(image_id).await?;
        self.files
            .delete_quietly(Bucket::ItemImages, &image.storage_path)
            .await;

        if image.is_primary {
            if let Some(next) = self.images.list_for_item(item_id).await?.first() {
                self.images.set_primary(item_id, next.id).await?;
            }
        }

        self.cache.invalidate_item(item_id).await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_primary_image(&self, item_id: Uuid, image_id: Uuid, user_id: Uuid) -> AppResult<()> {
        self.load_owned(item_id, user_id).await?;

        self.images
            .find_by_id(image_id)
            .await?
            .filter(|i| i.item_id == item_id)
            .ok_or_else(|| AppError::NotFound(format!("Image {}", image_id)))?;

        self.images.set_primary(item_id, image_id).await?;
        self.cache.invalidate_item(item_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        InMemoryBookingRepository, InMemoryCategoryRepository, InMemoryItemImageRepository,
        InMemoryItemRepository,
    };
    use rentshare_core::models::Booking;
    use rentshare_core::pricing::CostBreakdown;
    use rentshare_core::traits::Repository;
    use rentshare_storage::InMemoryObjectStore;
    use rust_decimal_macros::dec;

    struct Fixture {
        items: Arc<InMemoryItemRepository>,
        bookings: Arc<InMemoryBookingRepository>,
        store: Arc<InMemoryObjectStore>,
        service: ItemService,
    }

    fn fixture() -> Fixture {
        let items = Arc::new(InMemoryItemRepository::default());
        let bookings = Arc::new(InMemoryBookingRepository::default());
        let store = Arc::new(InMemoryObjectStore::new());
        let categories = InMemoryCategoryRepository::with([Category {
            id: Uuid::new_v4(),
            name: "Tools".to_string(),
            slug: "tools".to_string(),
            description: None,
        }]);
        let service = ItemService::new(
            items.clone(),
            Arc::new(categories),
            Arc::new(InMemoryItemImageRepository::default()),
            bookings.clone(),
            Arc::new(CacheLayer::in_memory(100, std::time::Duration::from_secs(60))),
            FileStorage::new(store.clone(), "https://files.test"),
        );
        Fixture {
            items,
            bookings,
            store,
            service,
        }
    }

    fn drill() -> NewItem {
        NewItem {
            category_id: None,
            title: "  Cordless drill ".to_string(),
            description: "18V with two batteries".to_string(),
            condition: ItemCondition::Good,
            daily_rate: dec!(25),
            hourly_rate: Some(dec!(5)),
            security_deposit: dec!(50),
            min_rental_days: 1,
            max_rental_days: Some(14),
            delivery_available: false,
            delivery_fee: Some(dec!(15)),
            location: Some("Brooklyn".to_string()),
            coordinates: Some(GeoPoint::new(40.6782, -73.9442)),
        }
    }

    #[tokio::test]
    async fn test_create_item_normalizes_input() {
        let f = fixture();
        let item = f.service.create_item(Uuid::new_v4(), drill()).await.unwrap();

        assert_eq!(item.title, "Cordless drill");
        assert_eq!(item.status, ItemStatus::Active);
        // no delivery, so no delivery fee
        assert_eq!(item.delivery_fee, None);
    }

    #[tokio::test]
    async fn test_create_item_validation() {
        let f = fixture();
        let mut bad = drill();
        bad.daily_rate = Decimal::ZERO;
        assert!(matches!(
            f.service.create_item(Uuid::new_v4(), bad).await,
            Err(AppError::Validation(_))
        ));

        let mut bad = drill();
        bad.max_rental_days = Some(0);
        assert!(f.service.create_item(Uuid::new_v4(), bad).await.is_err());
    }

    #[tokio::test]
    async fn test_only_owner_can_update() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let item = f.service.create_item(owner, drill()).await.unwrap();

        let update = ItemUpdate {
            daily_rate: Some(dec!(30)),
            ..Default::default()
        };
        assert!(matches!(
            f.service.update_item(item.id, Uuid::new_v4(), update.clone()).await,
            Err(AppError::Forbidden)
        ));

        let updated = f.service.update_item(item.id, owner, update).await.unwrap();
        assert_eq!(updated.daily_rate, dec!(30));
    }

    #[tokio::test]
    async fn test_search_results_refresh_after_listing() {
        let f = fixture();
        let search = ItemSearch::default();

        assert_eq!(f.service.search_items(&search).await.unwrap().total, 0);
        f.service.create_item(Uuid::new_v4(), drill()).await.unwrap();
        // creating an item dropped the cached empty page
        assert_eq!(f.service.search_items(&search).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_search_rejects_invalid_filter() {
        let f = fixture();
        let search = ItemSearch {
            radius_km: Some(5.0),
            ..Default::default()
        };
        assert!(matches!(
            f.service.search_items(&search).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_get_item_hides_inactive_from_others_and_counts_views() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let item = f.service.create_item(owner, drill()).await.unwrap();

        f.service.get_item(item.id, None).await.unwrap();
        f.service.get_item(item.id, Some(owner)).await.unwrap();
        let stored = f.items.find_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(stored.view_count, 1);

        f.service
            .set_item_status(item.id, owner, ItemStatus::Inactive)
            .await
            .unwrap();
        assert!(matches!(
            f.service.get_item(item.id, Some(Uuid::new_v4())).await,
            Err(AppError::ItemNotFound(_))
        ));
        assert!(f.service.get_item(item.id, Some(owner)).await.is_ok());
    }

    #[tokio::test]
    async fn test_owner_cannot_lift_suspension() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let item = f.service.create_item(owner, drill()).await.unwrap();
        f.items.set_status(item.id, ItemStatus::Suspended).await.unwrap();

        assert!(matches!(
            f.service.set_item_status(item.id, owner, ItemStatus::Active).await,
            Err(AppError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_upcoming_booking() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let item = f.service.create_item(owner, drill()).await.unwrap();

        let start = Utc::now() + Duration::days(3);
        let range = DateRange::new(start, start + Duration::days(2)).unwrap();
        let mut booking = Booking::new(item.id, Uuid::new_v4(), owner, range, CostBreakdown::default());
        booking.status = rentshare_core::models::BookingStatus::Confirmed;
        f.bookings.create_if_available(&booking).await.unwrap();

        assert!(matches!(
            f.service.delete_item(item.id, owner).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_images_primary_handover_and_cleanup() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let item = f.service.create_item(owner, drill()).await.unwrap();

        let first = f
            .service
            .add_image(item.id, owner, "image/jpeg", Bytes::from_static(b"a"))
            .await
            .unwrap();
        let second = f
            .service
            .add_image(item.id, owner, "image/png", Bytes::from_static(b"b"))
            .await
            .unwrap();
        assert!(first.is_primary);
        assert!(!second.is_primary);
        assert_eq!(f.store.len(), 2);

        f.service.delete_image(item.id, first.id, owner).await.unwrap();
        let images = f.service.list_images(item.id).await.unwrap();
        assert_eq!(images.len(), 1);
        assert!(images[0].is_primary);
        assert_eq!(f.store.len(), 1);

        f.service.delete_item(item.id, owner).await.unwrap();
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_image_upload_rejects_non_images() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let item = f.service.create_item(owner, drill()).await.unwrap();

        assert!(matches!(
            f.service
                .add_image(item.id, owner, "application/pdf", Bytes::from_static(b"%PDF"))
                .await,
            Err(AppError::UnsupportedMediaType(_))
        ));
    }

    #[tokio::test]
    async fn test_categories() {
        let f = fixture();
        assert_eq!(f.service.list_categories().await.unwrap().len(), 1);
        assert_eq!(f.service.category_by_slug("tools").await.unwrap().name, "Tools");
        assert!(f.service.category_by_slug("boats").await.is_err());
    }
}
