//! Typed query filters
//!
//! Search and listing filters are plain structs validated once at the call
//! boundary. Repositories receive them already checked.

use crate::error::AppError;
use crate::location::GeoPoint;
use crate::models::BookingStatus;
use crate::traits::Pagination;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use uuid::Uuid;

/// Largest radius accepted for a geo search
pub const MAX_SEARCH_RADIUS_KM: f64 = 500.0;

/// Result ordering for item search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Popular,
}

impl SortOrder {
    /// Parse from a query-string value
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "newest" => Some(SortOrder::Newest),
            "price_asc" => Some(SortOrder::PriceAsc),
            "price_desc" => Some(SortOrder::PriceDesc),
            "popular" => Some(SortOrder::Popular),
            _ => None,
        }
    }

    /// SQL `ORDER BY` clause for this ordering
    pub fn order_by(&self) -> &'static str {
        match self {
            SortOrder::Newest => "created_at DESC",
            SortOrder::PriceAsc => "daily_rate ASC, created_at DESC",
            SortOrder::PriceDesc => "daily_rate DESC, created_at DESC",
            SortOrder::Popular => "view_count DESC, created_at DESC",
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::PriceAsc => "price_asc",
            SortOrder::PriceDesc => "price_desc",
            SortOrder::Popular => "popular",
        }
    }
}

/// Item search filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSearch {
    /// Free text matched against title and description
    pub query: Option<String>,
    pub category_id: Option<Uuid>,
    /// Lower bound on the daily rate
    pub min_price: Option<Decimal>,
    /// Upper bound on the daily rate
    pub max_price: Option<Decimal>,
    /// Free text matched against the item location
    pub location: Option<String>,
    /// Centre of a radius search
    pub near: Option<GeoPoint>,
    pub radius_km: Option<f64>,
    /// Only items offering delivery
    pub delivery_only: bool,
    pub sort: SortOrder,
    pub page: i64,
    pub per_page: i64,
}

impl Default for ItemSearch {
    fn default() -> Self {
        Self {
            query: None,
            category_id: None,
            min_price: None,
            max_price: None,
            location: None,
            near: None,
            radius_km: None,
            delivery_only: false,
            sort: SortOrder::Newest,
            page: 1,
            per_page: 20,
        }
    }
}

impl ItemSearch {
    /// Check the filter for contradictory or out-of-range values
    pub fn validate(&self) -> Result<(), AppError> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(AppError::Validation(
                    "min_price must not exceed max_price".to_string(),
                ));
            }
        }

        if self.min_price.is_some_and(|p| p.is_sign_negative()) {
            return Err(AppError::Validation(
                "min_price must not be negative".to_string(),
            ));
        }

        if let Some(radius) = self.radius_km {
            let Some(centre) = self.near else {
                return Err(AppError::Validation(
                    "radius_km requires a centre point".to_string(),
                ));
            };

            if !centre.is_valid() {
                return Err(AppError::Validation("invalid centre point".to_string()));
            }

            if !(radius > 0.0 && radius <= MAX_SEARCH_RADIUS_KM) {
                return Err(AppError::Validation(format!(
                    "radius_km must be in (0, {}]",
                    MAX_SEARCH_RADIUS_KM
                )));
            }
        }

        Ok(())
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }

    /// Trimmed, non-empty text query
    pub fn text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Cache key for the results of this search.
    ///
    /// Always starts with `search_` so that every cached search can be
    /// dropped with one prefix invalidation.
    pub fn cache_key(&self) -> String {
        let mut key = String::from("search_");
        let _ = write!(
            key,
            "q={}|cat={}|min={}|max={}|loc={}",
            key_text(self.text().unwrap_or_default()),
            opt(&self.category_id),
            opt(&self.min_price),
            opt(&self.max_price),
            key_text(self.location.as_deref().unwrap_or_default()),
        );
        if let (Some(centre), Some(radius)) = (self.near, self.radius_km) {
            let _ = write!(
                key,
                "|geo={:.5},{:.5},{}",
                centre.latitude, centre.longitude, radius
            );
        }
        let pagination = self.pagination();
        let _ = write!(
            key,
            "|dlv={}|sort={}|p={}|pp={}",
            self.delivery_only,
            self.sort.as_str(),
            pagination.page,
            pagination.per_page
        );
        key
    }
}

/// Lowercased free text with the key delimiters backslash-escaped
fn key_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if matches!(c, '\\' | '|' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

/// Which side of a booking a listing is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingRole {
    #[default]
    Renter,
    Owner,
}

/// Booking listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub role: BookingRole,
    pub status: Option<BookingStatus>,
    pub item_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_bounds_validation() {
        let search = ItemSearch {
            min_price: Some(dec!(50)),
            max_price: Some(dec!(10)),
            ..Default::default()
        };
        assert!(matches!(search.validate(), Err(AppError::Validation(_))));

        let search = ItemSearch {
            min_price: Some(dec!(10)),
            max_price: Some(dec!(10)),
            ..Default::default()
        };
        assert!(search.validate().is_ok());
    }

    #[test]
    fn test_radius_requires_centre() {
        let search = ItemSearch {
            radius_km: Some(10.0),
            ..Default::default()
        };
        assert!(search.validate().is_err());

        let search = ItemSearch {
            radius_km: Some(10.0),
            near: Some(GeoPoint::new(40.0, -3.0)),
            ..Default::default()
        };
        assert!(search.validate().is_ok());
    }

    #[test]
    fn test_radius_upper_bound() {
        let search = ItemSearch {
            radius_km: Some(501.0),
            near: Some(GeoPoint::new(40.0, -3.0)),
            ..Default::default()
        };
        assert!(search.validate().is_err());
    }

    #[test]
    fn test_cache_key_is_prefixed_and_stable() {
        let a = ItemSearch {
            query: Some("  Drill ".to_string()),
            ..Default::default()
        };
        let b = ItemSearch {
            query: Some("drill".to_string()),
            ..Default::default()
        };
        assert!(a.cache_key().starts_with("search_"));
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_differs_by_page() {
        let a = ItemSearch::default();
        let b = ItemSearch {
            page: 2,
            ..Default::default()
        };
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_delimiters_in_text_cannot_collide() {
        let a = ItemSearch {
            query: Some("a|cat=|min=|max=|loc=b".to_string()),
            ..Default::default()
        };
        let b = ItemSearch {
            query: Some("a".to_string()),
            location: Some("b|cat=|min=|max=|loc=".to_string()),
            ..Default::default()
        };
        assert_ne!(a.cache_key(), b.cache_key());

        let c = ItemSearch {
            query: Some("x\\|".to_string()),
            ..Default::default()
        };
        let d = ItemSearch {
            query: Some("x\\".to_string()),
            location: Some("|".to_string()),
            ..Default::default()
        };
        assert_ne!(c.cache_key(), d.cache_key());
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!(SortOrder::from_str("price_asc"), Some(SortOrder::PriceAsc));
        assert_eq!(SortOrder::from_str("cheapest"), None);
    }
}
