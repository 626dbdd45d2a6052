//! Domain models for RentShare
//!
//! This module contains the core domain models used throughout the application.

pub mod booking;
pub mod item;
pub mod message;
pub mod moderation;
pub mod notification;
pub mod profile;
pub mod review;

pub use booking::{Booking, BookingAction, BookingStatus, DateRange};
pub use item::{Category, Item, ItemCondition, ItemImage, ItemStatus, RateCard};
pub use message::{Conversation, Message};
pub use moderation::{DashboardStats, Report, ReportStatus, ReportTarget};
pub use notification::{Favorite, Notification, NotificationKind};
pub use profile::{Profile, UserRole};
pub use review::{RatingSummary, Review, ReviewType};
