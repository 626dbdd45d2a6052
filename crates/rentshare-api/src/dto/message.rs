//! Messaging and notification DTOs

use super::common::{default_page, default_per_page};
use rentshare_core::traits::Pagination;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize)]
pub struct StartConversationRequest {
    pub participant_id: Uuid,
    pub item_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnreadResponse {
    pub unread: i64,
}

/// `GET /notifications` query string
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationParams {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

impl NotificationParams {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.per_page)
    }
}
