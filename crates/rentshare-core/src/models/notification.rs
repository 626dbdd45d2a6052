//! Notifications and favorites

use crate::models::BookingStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Notification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingRequested,
    BookingConfirmed,
    BookingRejected,
    BookingActivated,
    BookingCompleted,
    BookingCancelled,
    NewMessage,
    NewReview,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationKind::BookingRequested => "booking_requested",
            NotificationKind::BookingConfirmed => "booking_confirmed",
            NotificationKind::BookingRejected => "booking_rejected",
            NotificationKind::BookingActivated => "booking_activated",
            NotificationKind::BookingCompleted => "booking_completed",
            NotificationKind::BookingCancelled => "booking_cancelled",
            NotificationKind::NewMessage => "new_message",
            NotificationKind::NewReview => "new_review",
        };
        f.write_str(s)
    }
}

impl NotificationKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "booking_requested" => Some(NotificationKind::BookingRequested),
            "booking_confirmed" => Some(NotificationKind::BookingConfirmed),
            "booking_rejected" => Some(NotificationKind::BookingRejected),
            "booking_activated" => Some(NotificationKind::BookingActivated),
            "booking_completed" => Some(NotificationKind::BookingCompleted),
            "booking_cancelled" => Some(NotificationKind::BookingCancelled),
            "new_message" => Some(NotificationKind::NewMessage),
            "new_review" => Some(NotificationKind::NewReview),
            _ => None,
        }
    }

    /// Kind announcing that a booking entered `status`
    pub fn for_booking_status(status: BookingStatus) -> Self {
        match status {
            BookingStatus::Pending => NotificationKind::BookingRequested,
            BookingStatus::Confirmed => NotificationKind::BookingConfirmed,
            BookingStatus::Rejected => NotificationKind::BookingRejected,
            BookingStatus::Active => NotificationKind::BookingActivated,
            BookingStatus::Completed => NotificationKind::BookingCompleted,
            BookingStatus::Cancelled => NotificationKind::BookingCancelled,
        }
    }
}

/// In-app notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// Booking, conversation or review the notification points at
    pub related_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        related_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            title: title.into(),
            body: body.into(),
            related_id,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// Saved item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Favorite {
    pub user_id: Uuid,
    pub item_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_for_status() {
        assert_eq!(
            NotificationKind::for_booking_status(BookingStatus::Confirmed),
            NotificationKind::BookingConfirmed
        );
        assert_eq!(
            NotificationKind::for_booking_status(BookingStatus::Pending),
            NotificationKind::BookingRequested
        );
    }

    #[test]
    fn test_kind_round_trip_through_display() {
        let kind = NotificationKind::NewMessage;
        assert_eq!(NotificationKind::from_str(&kind.to_string()), Some(kind));
    }
}
