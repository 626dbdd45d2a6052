//! RentShare business logic
//!
//! Each service owns one area of the marketplace and depends only on the
//! repository traits from `rentshare-core`, the shared [`CacheLayer`] and,
//! for uploads, [`FileStorage`]. Handlers call services; services never see
//! HTTP types.
//!
//! [`CacheLayer`]: rentshare_cache::CacheLayer
//! [`FileStorage`]: rentshare_storage::FileStorage

pub mod account_service;
pub mod activity_service;
pub mod booking_service;
pub mod item_service;
pub mod messaging_service;
pub mod moderation_service;
pub mod review_service;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use account_service::{AccountService, ProfileUpdate, Session};
pub use activity_service::ActivityService;
pub use booking_service::{BookingService, NewBooking};
pub use item_service::{ItemDetails, ItemService, ItemUpdate, NewItem, SearchPage};
pub use messaging_service::MessagingService;
pub use moderation_service::ModerationService;
pub use review_service::{NewReview, ReviewService};
