//! Item (listing) models
//!
//! Items are the things members rent out. Identity and ownership never change;
//! pricing and status fields do.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Listing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Visible in search and bookable
    #[default]
    Active,
    /// Hidden by its owner
    Inactive,
    /// Currently out with a renter
    Rented,
    /// Hidden by moderation
    Suspended,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::Active => write!(f, "active"),
            ItemStatus::Inactive => write!(f, "inactive"),
            ItemStatus::Rented => write!(f, "rented"),
            ItemStatus::Suspended => write!(f, "suspended"),
        }
    }
}

impl ItemStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(ItemStatus::Active),
            "inactive" => Some(ItemStatus::Inactive),
            "rented" => Some(ItemStatus::Rented),
            "suspended" => Some(ItemStatus::Suspended),
            _ => None,
        }
    }

    /// Whether new bookings may be requested
    pub fn is_bookable(&self) -> bool {
        matches!(self, ItemStatus::Active | ItemStatus::Rented)
    }
}

/// Physical condition reported by the owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    New,
    LikeNew,
    #[default]
    Good,
    Fair,
}

impl fmt::Display for ItemCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemCondition::New => write!(f, "new"),
            ItemCondition::LikeNew => write!(f, "like_new"),
            ItemCondition::Good => write!(f, "good"),
            ItemCondition::Fair => write!(f, "fair"),
        }
    }
}

impl ItemCondition {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "new" => Some(ItemCondition::New),
            "like_new" => Some(ItemCondition::LikeNew),
            "good" => Some(ItemCondition::Good),
            "fair" => Some(ItemCondition::Fair),
            _ => None,
        }
    }
}

/// The pricing fields of an item the cost calculator needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCard {
    /// Price per started day
    pub daily_rate: Decimal,

    /// Price per started hour for rentals shorter than a day
    pub hourly_rate: Option<Decimal>,

    /// Refundable deposit charged once per booking
    pub security_deposit: Decimal,
}

/// Rental listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub condition: ItemCondition,
    pub daily_rate: Decimal,
    pub hourly_rate: Option<Decimal>,
    pub security_deposit: Decimal,
    /// Minimum rental duration in days
    pub min_rental_days: i32,
    /// Maximum rental duration in days (unbounded when absent)
    pub max_rental_days: Option<i32>,
    pub delivery_available: bool,
    pub delivery_fee: Option<Decimal>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: ItemStatus,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Rate card used for pricing bookings of this item
    pub fn rate_card(&self) -> RateCard {
        RateCard {
            daily_rate: self.daily_rate,
            hourly_rate: self.hourly_rate,
            security_deposit: self.security_deposit,
        }
    }

    /// Check whether `user_id` owns this item
    #[inline]
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Geographic position, when both coordinates are known
    pub fn coordinates(&self) -> Option<crate::location::GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(crate::location::GeoPoint::new(lat, lon)),
            _ => None,
        }
    }
}

impl Default for Item {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            category_id: None,
            title: String::new(),
            description: String::new(),
            condition: ItemCondition::Good,
            daily_rate: Decimal::ZERO,
            hourly_rate: None,
            security_deposit: Decimal::ZERO,
            min_rental_days: 1,
            max_rental_days: None,
            delivery_available: false,
            delivery_fee: None,
            location: None,
            latitude: None,
            longitude: None,
            status: ItemStatus::Active,
            view_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Listing category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

/// Image attached to an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemImage {
    pub id: Uuid,
    pub item_id: Uuid,
    /// Object path inside the `item-images` bucket
    pub storage_path: String,
    pub url: String,
    pub is_primary: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_round_trip_through_display() {
        for status in [
            ItemStatus::Active,
            ItemStatus::Inactive,
            ItemStatus::Rented,
            ItemStatus::Suspended,
        ] {
            assert_eq!(ItemStatus::from_str(&status.to_string()), Some(status));
        }
    }

    #[test]
    fn test_bookable_statuses() {
        assert!(ItemStatus::Active.is_bookable());
        assert!(ItemStatus::Rented.is_bookable());
        assert!(!ItemStatus::Inactive.is_bookable());
        assert!(!ItemStatus::Suspended.is_bookable());
    }

    #[test]
    fn test_rate_card_from_item() {
        let item = Item {
            daily_rate: dec!(25),
            hourly_rate: Some(dec!(5)),
            security_deposit: dec!(50),
            ..Default::default()
        };

        let card = item.rate_card();
        assert_eq!(card.daily_rate, dec!(25));
        assert_eq!(card.hourly_rate, Some(dec!(5)));
        assert_eq!(card.security_deposit, dec!(50));
    }

    #[test]
    fn test_coordinates_require_both_axes() {
        let mut item = Item {
            latitude: Some(40.0),
            ..Default::default()
        };
        assert!(item.coordinates().is_none());

        item.longitude = Some(-3.7);
        assert!(item.coordinates().is_some());
    }
}
