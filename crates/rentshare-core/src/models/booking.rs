//! Booking models
//!
//! A booking reserves an item for a half-open `[start, end)` window. Its price
//! is captured once, at creation, and never recomputed.
//!
//! Lifecycle:
//! 1. Requested by a renter (Pending)
//! 2. Accepted (Confirmed) or refused (Rejected) by the owner
//! 3. Handed over (Active)
//! 4. Returned (Completed)
//!
//! Pending, confirmed and active bookings may be cancelled.

use crate::error::AppError;
use crate::pricing::CostBreakdown;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Requested by the renter, awaiting the owner
    #[default]
    Pending,
    /// Accepted by the owner
    Confirmed,
    /// Item handed over to the renter
    Active,
    /// Item returned
    Completed,
    /// Withdrawn by either party
    Cancelled,
    /// Refused by the owner
    Rejected,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Active => write!(f, "active"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
            BookingStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl BookingStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "active" => Some(BookingStatus::Active),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "rejected" => Some(BookingStatus::Rejected),
            _ => None,
        }
    }

    /// Statuses that make an item unavailable to other renters
    pub const BLOCKING: [BookingStatus; 2] = [BookingStatus::Confirmed, BookingStatus::Active];

    /// Check if this booking holds the item's calendar
    pub fn blocks_availability(&self) -> bool {
        Self::BLOCKING.contains(self)
    }

    /// Check if the booking can no longer change
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Rejected
        )
    }

    /// Status reached by applying `action`, or `None` if the transition is illegal
    pub fn apply(&self, action: BookingAction) -> Option<BookingStatus> {
        use BookingAction as A;
        use BookingStatus as S;

        match (self, action) {
            (S::Pending, A::Confirm) => Some(S::Confirmed),
            (S::Pending, A::Reject) => Some(S::Rejected),
            (S::Confirmed, A::Activate) => Some(S::Active),
            (S::Active, A::Complete) => Some(S::Completed),
            (S::Pending | S::Confirmed | S::Active, A::Cancel) => Some(S::Cancelled),
            _ => None,
        }
    }

    /// Like [`apply`](Self::apply) but reports an illegal transition as an error
    pub fn transition(&self, action: BookingAction) -> Result<BookingStatus, AppError> {
        self.apply(action)
            .ok_or_else(|| AppError::InvalidTransition {
                from: self.to_string(),
                action: action.to_string(),
            })
    }
}

/// Status-changing operations on a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    Confirm,
    Reject,
    Activate,
    Complete,
    Cancel,
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingAction::Confirm => write!(f, "confirm"),
            BookingAction::Reject => write!(f, "reject"),
            BookingAction::Activate => write!(f, "activate"),
            BookingAction::Complete => write!(f, "complete"),
            BookingAction::Cancel => write!(f, "cancel"),
        }
    }
}

impl BookingAction {
    /// Parse from a URL segment
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "confirm" => Some(BookingAction::Confirm),
            "reject" => Some(BookingAction::Reject),
            "activate" => Some(BookingAction::Activate),
            "complete" => Some(BookingAction::Complete),
            "cancel" => Some(BookingAction::Cancel),
            _ => None,
        }
    }

    /// Whether only the item owner may perform this action
    pub fn owner_only(&self) -> bool {
        !matches!(self, BookingAction::Cancel)
    }
}

/// Half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Build a range, rejecting an end before the start
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, AppError> {
        if end < start {
            return Err(AppError::Validation(format!(
                "end ({}) must not be before start ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Length of the window
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Two windows overlap when each starts before the other ends.
    /// Windows that only touch at a boundary do not overlap.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check whether `instant` falls inside the window
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Booking entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub item_id: Uuid,
    pub renter_id: Uuid,
    pub owner_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: BookingStatus,

    /// Price captured when the booking was requested
    #[serde(flatten)]
    pub pricing: CostBreakdown,

    pub delivery_requested: bool,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Create a pending booking for `range` with an already computed price
    pub fn new(
        item_id: Uuid,
        renter_id: Uuid,
        owner_id: Uuid,
        range: DateRange,
        pricing: CostBreakdown,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            item_id,
            renter_id,
            owner_id,
            start_date: range.start,
            end_date: range.end,
            status: BookingStatus::Pending,
            pricing,
            delivery_requested: false,
            delivery_address: None,
            notes: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rental window
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    /// Check whether `user_id` is the renter or the owner
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.renter_id == user_id || self.owner_id == user_id
    }

    /// The other side of the booking from `user_id`'s point of view
    pub fn counterparty(&self, user_id: Uuid) -> Uuid {
        if self.renter_id == user_id {
            self.owner_id
        } else {
            self.renter_id
        }
    }
}
