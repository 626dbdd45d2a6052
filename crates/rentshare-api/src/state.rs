//! Shared application state handed to every handler

use rentshare_auth::JwtService;
use rentshare_cache::CacheLayer;
use rentshare_core::{
    pricing::PricingPolicy,
    traits::{
        BookingRepository, CategoryRepository, ConversationRepository, FavoriteRepository,
        ItemImageRepository, ItemRepository, MessageRepository, NotificationRepository,
        ProfileRepository, ReportRepository, ReviewRepository,
    },
};
use rentshare_services::{
    AccountService, ActivityService, BookingService, ItemService, MessagingService,
    ModerationService, ReviewService,
};
use rentshare_storage::FileStorage;
use std::sync::Arc;

/// Every repository the services need
#[derive(Clone)]
pub struct Repositories {
    pub profiles: Arc<dyn ProfileRepository>,
    pub items: Arc<dyn ItemRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub images: Arc<dyn ItemImageRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub favorites: Arc<dyn FavoriteRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub reports: Arc<dyn ReportRepository>,
}

pub struct AppState {
    pub accounts: AccountService,
    pub items: ItemService,
    pub bookings: BookingService,
    pub reviews: ReviewService,
    pub messaging: MessagingService,
    pub activity: ActivityService,
    pub moderation: ModerationService,
    pub cache: Arc<CacheLayer>,
}

impl AppState {
    /// Wire services over `repos`
    pub fn new(
        repos: Repositories,
        cache: Arc<CacheLayer>,
        jwt: Arc<JwtService>,
        files: FileStorage,
        pricing: PricingPolicy,
    ) -> Self {
        Self {
            accounts: AccountService::new(
                repos.profiles.clone(),
                jwt,
                cache.clone(),
                files.clone(),
            ),
            items: ItemService::new(
                repos.items.clone(),
                repos.categories,
                repos.images,
                repos.bookings.clone(),
                cache.clone(),
                files,
            ),
            bookings: BookingService::new(
                repos.bookings.clone(),
                repos.items.clone(),
                repos.notifications.clone(),
                pricing,
                cache.clone(),
            ),
            reviews: ReviewService::new(
                repos.reviews.clone(),
                repos.bookings,
                repos.notifications.clone(),
                cache.clone(),
            ),
            messaging: MessagingService::new(
                repos.conversations,
                repos.messages,
                repos.profiles.clone(),
                repos.items.clone(),
                repos.notifications.clone(),
            ),
            activity: ActivityService::new(
                repos.favorites,
                repos.items.clone(),
                repos.notifications,
            ),
            moderation: ModerationService::new(
                repos.reports,
                repos.items,
                repos.profiles,
                repos.reviews,
                cache.clone(),
            ),
            cache,
        }
    }
}
