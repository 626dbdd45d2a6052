//! Booking DTOs

use super::common::{default_page, default_per_page};
use chrono::{DateTime, Utc};
use rentshare_core::{
    filters::{BookingFilter, BookingRole},
    models::BookingStatus,
    traits::Pagination,
};
use rentshare_services::NewBooking;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Booking request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub item_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,

    #[serde(default)]
    pub delivery_requested: bool,

    #[validate(length(max = 500))]
    pub delivery_address: Option<String>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl From<CreateBookingRequest> for NewBooking {
    fn from(req: CreateBookingRequest) -> Self {
        NewBooking {
            item_id: req.item_id,
            start: req.start_date,
            end: req.end_date,
            delivery_requested: req.delivery_requested,
            delivery_address: req.delivery_address,
            notes: req.notes,
        }
    }
}

/// Optional body of a status change
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TransitionRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// `GET /bookings` query string
#[derive(Debug, Clone, Deserialize)]
pub struct BookingListParams {
    /// Bookings I made (`renter`, default) or bookings of my items (`owner`)
    #[serde(default)]
    pub role: BookingRole,
    pub status: Option<BookingStatus>,
    pub item_id: Option<Uuid>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

impl BookingListParams {
    pub fn filter(&self) -> BookingFilter {
        BookingFilter {
            role: self.role,
            status: self.status,
            item_id: self.item_id,
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}
