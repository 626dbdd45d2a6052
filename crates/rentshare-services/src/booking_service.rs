//! Bookings: availability, pricing and the rental lifecycle

use chrono::{DateTime, Utc};
use rentshare_cache::CacheLayer;
use rentshare_core::{
    filters::BookingFilter,
    models::{
        Booking, BookingAction, BookingStatus, DateRange, Item, ItemStatus, Notification,
        NotificationKind,
    },
    pricing::{check_rental_duration, CostBreakdown, PricingPolicy},
    traits::{BookingRepository, ItemRepository, NotificationRepository, Pagination},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// A booking request
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub item_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub delivery_requested: bool,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    items: Arc<dyn ItemRepository>,
    notifications: Arc<dyn NotificationRepository>,
    pricing: PricingPolicy,
    cache: Arc<CacheLayer>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        items: Arc<dyn ItemRepository>,
        notifications: Arc<dyn NotificationRepository>,
        pricing: PricingPolicy,
        cache: Arc<CacheLayer>,
    ) -> Self {
        Self {
            bookings,
            items,
            notifications,
            pricing,
            cache,
        }
    }

    async fn load_item(&self, item_id: Uuid) -> AppResult<Item> {
        self.items
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::ItemNotFound(item_id.to_string()))
    }

    /// Whether `range` is free for `item_id`, ignoring booking `exclude`.
    ///
    /// A failed lookup reports the window as taken.
    #[instrument(skip(self))]
    pub async fn check_availability(
        &self,
        item_id: Uuid,
        range: &DateRange,
        exclude: Option<Uuid>,
    ) -> AppResult<bool> {
        self.load_item(item_id).await?;

        match self.bookings.find_overlapping(item_id, range, exclude).await {
            Ok(overlapping) => {
                debug!("{} overlapping booking(s) for item {}", overlapping.len(), item_id);
                Ok(overlapping.is_empty())
            }
            Err(e) => {
                error!("Overlap check failed for item {}: {}", item_id, e);
                Ok(false)
            }
        }
    }

    /// Price of renting `item_id` during `range`, without booking it
    #[instrument(skip(self))]
    pub async fn quote(
        &self,
        item_id: Uuid,
        range: &DateRange,
        with_delivery: bool,
    ) -> AppResult<CostBreakdown> {
        let item = self.load_item(item_id).await?;
        self.price(&item, range, with_delivery)
    }

    fn price(&self, item: &Item, range: &DateRange, with_delivery: bool) -> AppResult<CostBreakdown> {
        let delivery_fee = if with_delivery {
            if !item.delivery_available {
                return Err(AppError::Validation(
                    "this item is not offered with delivery".to_string(),
                ));
            }
            Some(item.delivery_fee.unwrap_or_default())
        } else {
            None
        };
        Ok(self.pricing.calculate(&item.rate_card(), range, delivery_fee))
    }

    /// Request a booking. The price is fixed at request time.
    #[instrument(skip(self, request), fields(item_id = %request.item_id))]
    pub async fn create_booking(&self, renter_id: Uuid, request: NewBooking) -> AppResult<Booking> {
        if request.end <= request.start {
            return Err(AppError::Validation("end must be after start".to_string()));
        }
        if request.start < Utc::now() {
            return Err(AppError::Validation("start must not be in the past".to_string()));
        }
        if request.delivery_requested
            && request
                .delivery_address
                .as_deref()
                .map_or(true, |a| a.trim().is_empty())
        {
            return Err(AppError::MissingField("delivery_address".to_string()));
        }
        let range = DateRange::new(request.start, request.end)?;

        let item = self.load_item(request.item_id).await?;
        if item.is_owned_by(renter_id) {
            return Err(AppError::Validation("you cannot book your own item".to_string()));
        }
        if !item.status.is_bookable() {
            return Err(AppError::ItemUnavailable(item.id.to_string()));
        }
        check_rental_duration(&range, item.min_rental_days, item.max_rental_days)?;

        let pricing = self.price(&item, &range, request.delivery_requested)?;
        let mut booking = Booking::new(item.id, renter_id, item.owner_id, range, pricing);
        booking.delivery_requested = request.delivery_requested;
        booking.delivery_address = request.delivery_address.filter(|_| request.delivery_requested);
        booking.notes = request.notes;

        let booking = self.bookings.create_if_available(&booking).await?;
        info!(
            "Booking {} requested for item {} ({})",
            booking.id, item.id, booking.pricing.total_amount
        );

        self.notify(
            item.owner_id,
            BookingStatus::Pending,
            format!("New booking request for {}", item.title),
            booking.id,
        )
        .await;

        Ok(booking)
    }

    /// Apply a lifecycle action on behalf of `user_id`
    #[instrument(skip(self, reason))]
    pub async fn transition(
        &self,
        user_id: Uuid,
        booking_id: Uuid,
        action: BookingAction,
        reason: Option<String>,
    ) -> AppResult<Booking> {
        let booking = self.get_booking(user_id, booking_id).await?;

        if action.owner_only() && booking.owner_id != user_id {
            warn!("User {} tried to {} booking {}", user_id, action, booking_id);
            return Err(AppError::Forbidden);
        }

        booking.status.transition(action)?;
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty() && action == BookingAction::Cancel);

        // the repository re-checks against the locked row
        let updated = self
            .bookings
            .apply_action(booking_id, action, reason.as_deref())
            .await?;
        let next = updated.status;
        info!("Booking {}: {} -> {}", booking_id, booking.status, next);

        self.sync_item_status(&booking, next).await;

        self.notify(
            booking.counterparty(user_id),
            next,
            format!("Booking {}", next),
            booking_id,
        )
        .await;

        Ok(updated)
    }

    /// Mark the item rented while a booking is active and free it again after
    async fn sync_item_status(&self, booking: &Booking, next: BookingStatus) {
        let status = match (booking.status, next) {
            (_, BookingStatus::Active) => ItemStatus::Rented,
            (BookingStatus::Active, _) => ItemStatus::Active,
            _ => return,
        };

        let result = async {
            let item = self.load_item(booking.item_id).await?;
            let applies = match status {
                ItemStatus::Rented => item.status == ItemStatus::Active,
                _ => item.status == ItemStatus::Rented,
            };
            if applies {
                self.items.set_status(item.id, status).await?;
            }
            Ok::<_, AppError>(())
        }
        .await;

        if let Err(e) = result {
            warn!("Failed to set item {} {}: {}", booking.item_id, status, e);
        }
        self.cache.invalidate_item(booking.item_id).await;
    }

    async fn notify(&self, user_id: Uuid, status: BookingStatus, title: String, booking_id: Uuid) {
        let notification = Notification::new(
            user_id,
            NotificationKind::for_booking_status(status),
            title,
            format!("Booking {} is now {}", booking_id, status),
            Some(booking_id),
        );
        if let Err(e) = self.notifications.create(&notification).await {
            warn!("Failed to notify {} about booking {}: {}", user_id, booking_id, e);
        }
    }

    /// A booking visible to `user_id` (renter or owner)
    #[instrument(skip(self))]
    pub async fn get_booking(&self, user_id: Uuid, booking_id: Uuid) -> AppResult<Booking> {
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::BookingNotFound(booking_id.to_string()))?;

        if !booking.is_party(user_id) {
            return Err(AppError::BookingNotFound(booking_id.to_string()));
        }
        Ok(booking)
    }

    pub async fn list_bookings(
        &self,
        user_id: Uuid,
        filter: &BookingFilter,
        pagination: &Pagination,
    ) -> AppResult<(Vec<Booking>, i64)> {
        self.bookings.list_for_user(user_id, filter, pagination).await
    }
}
