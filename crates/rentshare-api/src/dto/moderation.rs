//! Report and admin DTOs

use super::common::{default_page, default_per_page};
use rentshare_core::{
    models::{ReportStatus, ReportTarget},
    traits::Pagination,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReportRequest {
    pub target_type: ReportTarget,
    pub target_id: Uuid,

    #[validate(length(min = 1, max = 1000, message = "Reason must be between 1 and 1000 characters"))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResolveReportRequest {
    /// `resolved` or `dismissed`
    pub status: ReportStatus,

    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

/// `GET /admin/reports` query string; open reports by default
#[derive(Debug, Clone, Deserialize)]
pub struct ReportListParams {
    pub status: Option<ReportStatus>,
    #[serde(default)]
    pub all: bool,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

impl ReportListParams {
    /// Status to filter on; `None` lists every report
    pub fn status_filter(&self) -> Option<ReportStatus> {
        if self.all {
            None
        } else {
            Some(self.status.unwrap_or(ReportStatus::Open))
        }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_list_defaults_to_open() {
        let params = ReportListParams {
            status: None,
            all: false,
            page: 1,
            per_page: 20,
        };
        assert_eq!(params.status_filter(), Some(ReportStatus::Open));

        let params = ReportListParams { all: true, ..params };
        assert_eq!(params.status_filter(), None);
    }
}
