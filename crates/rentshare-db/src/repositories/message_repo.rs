//! Conversation and message repository implementations

use super::{db_error, is_violation, UNIQUE_VIOLATION};
use rentshare_core::{
    models::{Conversation, Message},
    traits::{ConversationRepository, MessageRepository, Pagination},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

const CONVERSATION_COLUMNS: &str =
    "id, item_id, participant_one, participant_two, last_message_at, created_at";

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, read, created_at";

/// PostgreSQL implementation of ConversationRepository
pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for PgConversationRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {} FROM conversations WHERE id = $1",
            CONVERSATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find conversation", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_between(
        &self,
        participant_one: Uuid,
        participant_two: Uuid,
        item_id: Option<Uuid>,
    ) -> AppResult<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            r#"
            SELECT {} FROM conversations
            WHERE participant_one = $1
              AND participant_two = $2
              AND item_id IS NOT DISTINCT FROM $3
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(participant_one)
        .bind(participant_two)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find conversation", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self, conversation), fields(id = %conversation.id))]
    async fn create(&self, conversation: &Conversation) -> AppResult<Conversation> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            r#"
            INSERT INTO conversations (id, item_id, participant_one, participant_two)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(conversation.id)
        .bind(conversation.item_id)
        .bind(conversation.participant_one)
        .bind(conversation.participant_two)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_violation(&e, UNIQUE_VIOLATION) {
                AppError::AlreadyExists("Conversation already exists".to_string())
            } else {
                db_error("create conversation", e)
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Conversation>> {
        let rows = sqlx::query_as::<_, ConversationRow>(&format!(
            r#"
            SELECT {} FROM conversations
            WHERE participant_one = $1 OR participant_two = $1
            ORDER BY COALESCE(last_message_at, created_at) DESC
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list conversations", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE conversations SET last_message_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("touch conversation", e))?;

        Ok(())
    }
}

/// PostgreSQL implementation of MessageRepository
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self, message), fields(conversation_id = %message.conversation_id))]
    async fn create(&self, message: &Message) -> AppResult<Message> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("create message", e))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        conversation_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {} FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at
            LIMIT $2 OFFSET $3
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(conversation_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list messages", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET read = TRUE
            WHERE conversation_id = $1 AND sender_id <> $2 AND NOT read
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("mark messages read", e))?;

        debug!("Marked {} message(s) read", result.rows_affected());
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE (c.participant_one = $1 OR c.participant_two = $1)
              AND m.sender_id <> $1
              AND NOT m.read
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("count unread messages", e))?;

        Ok(count.0)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ConversationRow {
    id: Uuid,
    item_id: Option<Uuid>,
    participant_one: Uuid,
    participant_two: Uuid,
    last_message_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Self {
            id: row.id,
            item_id: row.item_id,
            participant_one: row.participant_one,
            participant_two: row.participant_two,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    content: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            content: row.content,
            read: row.read,
            created_at: row.created_at,
        }
    }
}
