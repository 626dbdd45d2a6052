//! Item, search and availability DTOs

use super::common::{default_page, default_per_page};
use chrono::{DateTime, Utc};
use rentshare_core::{
    filters::{ItemSearch, SortOrder},
    location::GeoPoint,
    models::{DateRange, ItemCondition, ItemStatus, RatingSummary, Review},
    traits::PaginatedResponse,
    AppResult,
};
use rentshare_services::{ItemUpdate, NewItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// New listing
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateItemRequest {
    pub category_id: Option<Uuid>,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub condition: ItemCondition,

    pub daily_rate: Decimal,
    pub hourly_rate: Option<Decimal>,

    #[serde(default)]
    pub security_deposit: Decimal,

    #[validate(range(min = 1, max = 365))]
    #[serde(default = "default_min_days")]
    pub min_rental_days: i32,

    #[validate(range(min = 1, max = 365))]
    pub max_rental_days: Option<i32>,

    #[serde(default)]
    pub delivery_available: bool,
    pub delivery_fee: Option<Decimal>,

    #[validate(length(max = 200))]
    pub location: Option<String>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

fn default_min_days() -> i32 {
    1
}

fn point(latitude: Option<f64>, longitude: Option<f64>) -> Option<GeoPoint> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
        _ => None,
    }
}

impl From<CreateItemRequest> for NewItem {
    fn from(req: CreateItemRequest) -> Self {
        NewItem {
            category_id: req.category_id,
            title: req.title,
            description: req.description,
            condition: req.condition,
            daily_rate: req.daily_rate,
            hourly_rate: req.hourly_rate,
            security_deposit: req.security_deposit,
            min_rental_days: req.min_rental_days,
            max_rental_days: req.max_rental_days,
            delivery_available: req.delivery_available,
            delivery_fee: req.delivery_fee,
            location: req.location,
            coordinates: point(req.latitude, req.longitude),
        }
    }
}

/// Listing edit; omitted fields stay unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateItemRequest {
    pub category_id: Option<Uuid>,

    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    pub condition: Option<ItemCondition>,
    pub daily_rate: Option<Decimal>,
    pub hourly_rate: Option<Decimal>,
    pub security_deposit: Option<Decimal>,

    #[validate(range(min = 1, max = 365))]
    pub min_rental_days: Option<i32>,

    #[validate(range(min = 1, max = 365))]
    pub max_rental_days: Option<i32>,

    pub delivery_available: Option<bool>,
    pub delivery_fee: Option<Decimal>,

    #[validate(length(max = 200))]
    pub location: Option<String>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

impl From<UpdateItemRequest> for ItemUpdate {
    fn from(req: UpdateItemRequest) -> Self {
        ItemUpdate {
            category_id: req.category_id,
            title: req.title,
            description: req.description,
            condition: req.condition,
            daily_rate: req.daily_rate,
            hourly_rate: req.hourly_rate,
            security_deposit: req.security_deposit,
            min_rental_days: req.min_rental_days,
            max_rental_days: req.max_rental_days,
            delivery_available: req.delivery_available,
            delivery_fee: req.delivery_fee,
            location: req.location,
            coordinates: point(req.latitude, req.longitude),
        }
    }
}

/// Owner status change
#[derive(Debug, Clone, Deserialize)]
pub struct ItemStatusRequest {
    pub status: ItemStatus,
}

/// `GET /items` query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    /// Category slug
    pub category: Option<String>,
    pub category_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub location: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub delivery: bool,
    pub sort: Option<SortOrder>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl SearchParams {
    /// Typed search filter; `category_id` is the resolved slug when one was given
    pub fn to_search(&self, category_id: Option<Uuid>) -> ItemSearch {
        ItemSearch {
            query: self.q.clone(),
            category_id: category_id.or(self.category_id),
            min_price: self.min_price,
            max_price: self.max_price,
            location: self.location.clone().filter(|l| !l.trim().is_empty()),
            near: point(self.lat, self.lng),
            radius_km: self.radius_km,
            delivery_only: self.delivery,
            sort: self.sort.unwrap_or_default(),
            page: self.page.unwrap_or_else(default_page),
            per_page: self.per_page.unwrap_or_else(default_per_page),
        }
    }
}

/// Rental window in a query string
#[derive(Debug, Clone, Deserialize)]
pub struct WindowParams {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Booking to ignore when checking availability
    pub exclude: Option<Uuid>,
    /// Quote with delivery
    #[serde(default)]
    pub delivery: bool,
}

impl WindowParams {
    pub fn range(&self) -> AppResult<DateRange> {
        DateRange::new(self.start, self.end)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResponse {
    pub item_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub available: bool,
}

/// Reviews page plus the overall rating
#[derive(Debug, Clone, Serialize)]
pub struct ReviewsResponse {
    pub summary: RatingSummary,
    #[serde(flatten)]
    pub reviews: PaginatedResponse<Review>,
}
