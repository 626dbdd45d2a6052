//! Conversation and message models

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest message body accepted, in characters
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Conversation between two members, optionally about an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub item_id: Option<Uuid>,
    /// Lower of the two participant ids
    pub participant_one: Uuid,
    /// Higher of the two participant ids
    pub participant_two: Uuid,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a conversation with participants stored in canonical order
    pub fn new(a: Uuid, b: Uuid, item_id: Option<Uuid>) -> Self {
        let (participant_one, participant_two) = Self::canonical_pair(a, b);
        Self {
            id: Uuid::new_v4(),
            item_id,
            participant_one,
            participant_two,
            last_message_at: None,
            created_at: Utc::now(),
        }
    }

    /// Order two participant ids so the same pair always maps to the same row
    pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participant_one == user_id || self.participant_two == user_id
    }

    /// The participant that is not `user_id`
    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.participant_one == user_id {
            self.participant_two
        } else {
            self.participant_one
        }
    }
}

/// Message inside a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(conversation_id: Uuid, sender_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content,
            read: false,
            created_at: Utc::now(),
        }
    }

    /// Trim `content` and check it is non-empty and not too long
    pub fn clean_content(content: &str) -> Result<String, AppError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation("message must not be empty".to_string()));
        }
        if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(AppError::Validation(format!(
                "message exceeds {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }
        Ok(trimmed.to_string())
    }
}
