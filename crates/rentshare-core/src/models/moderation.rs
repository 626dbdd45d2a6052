//! Moderation models: member reports and dashboard statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Kind of entity a report points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportTarget {
    Item,
    Profile,
    Review,
}

impl fmt::Display for ReportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportTarget::Item => write!(f, "item"),
            ReportTarget::Profile => write!(f, "profile"),
            ReportTarget::Review => write!(f, "review"),
        }
    }
}

impl ReportTarget {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "item" => Some(ReportTarget::Item),
            "profile" => Some(ReportTarget::Profile),
            "review" => Some(ReportTarget::Review),
            _ => None,
        }
    }
}

/// Report status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Open,
    Resolved,
    Dismissed,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Open => write!(f, "open"),
            ReportStatus::Resolved => write!(f, "resolved"),
            ReportStatus::Dismissed => write!(f, "dismissed"),
        }
    }
}

impl ReportStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(ReportStatus::Open),
            "resolved" => Some(ReportStatus::Resolved),
            "dismissed" => Some(ReportStatus::Dismissed),
            _ => None,
        }
    }
}

/// Member report about an item, profile or review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub target_type: ReportTarget,
    pub target_id: Uuid,
    pub reason: String,
    pub status: ReportStatus,
    pub resolution_note: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(reporter_id: Uuid, target_type: ReportTarget, target_id: Uuid, reason: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            reporter_id,
            target_type,
            target_id,
            reason,
            status: ReportStatus::Open,
            resolution_note: None,
            resolved_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ReportStatus::Open
    }
}

/// Counters shown on the admin dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_profiles: i64,
    pub suspended_profiles: i64,
    pub total_items: i64,
    pub active_items: i64,
    /// Booking counts keyed by status
    pub bookings_by_status: BTreeMap<String, i64>,
    pub open_reports: i64,
}

impl DashboardStats {
    pub fn total_bookings(&self) -> i64 {
        self.bookings_by_status.values().sum()
    }
}
