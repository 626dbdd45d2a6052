//! Direct messages between members

use rentshare_core::{
    models::{Conversation, Message, Notification, NotificationKind},
    traits::{
        ConversationRepository, ItemRepository, MessageRepository, NotificationRepository,
        Pagination, ProfileRepository,
    },
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Characters of a message repeated in the notification body
const PREVIEW_CHARS: usize = 80;

pub struct MessagingService {
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
    profiles: Arc<dyn ProfileRepository>,
    items: Arc<dyn ItemRepository>,
    notifications: Arc<dyn NotificationRepository>,
}

impl MessagingService {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        messages: Arc<dyn MessageRepository>,
        profiles: Arc<dyn ProfileRepository>,
        items: Arc<dyn ItemRepository>,
        notifications: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            conversations,
            messages,
            profiles,
            items,
            notifications,
        }
    }

    /// Conversation between `user_id` and `other_id` about `item_id`,
    /// created on first use
    #[instrument(skip(self))]
    pub async fn start_conversation(
        &self,
        user_id: Uuid,
        other_id: Uuid,
        item_id: Option<Uuid>,
    ) -> AppResult<Conversation> {
        if user_id == other_id {
            return Err(AppError::Validation(
                "cannot start a conversation with yourself".to_string(),
            ));
        }
        if self.profiles.find_by_id(other_id).await?.is_none() {
            return Err(AppError::UserNotFound(other_id.to_string()));
        }
        if let Some(item_id) = item_id {
            if self.items.find_by_id(item_id).await?.is_none() {
                return Err(AppError::ItemNotFound(item_id.to_string()));
            }
        }

        let (one, two) = Conversation::canonical_pair(user_id, other_id);
        if let Some(existing) = self.conversations.find_between(one, two, item_id).await? {
            debug!("Reusing conversation {}", existing.id);
            return Ok(existing);
        }

        let conversation = self
            .conversations
            .create(&Conversation::new(user_id, other_id, item_id))
            .await?;
        info!("Conversation {} started by {}", conversation.id, user_id);
        Ok(conversation)
    }

    async fn load_for(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<Conversation> {
        self.conversations
            .find_by_id(conversation_id)
            .await?
            .filter(|c| c.has_participant(user_id))
            .ok_or_else(|| AppError::ConversationNotFound(conversation_id.to_string()))
    }

    #[instrument(skip(self, content))]
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        conversation_id: Uuid,
        content: &str,
    ) -> AppResult<Message> {
        let conversation = self.load_for(conversation_id, sender_id).await?;
        let content = Message::clean_content(content)?;

        let message = self
            .messages
            .create(&Message::new(conversation_id, sender_id, content))
            .await?;
        self.conversations
            .touch(conversation_id, message.created_at)
            .await?;

        let recipient = conversation.other_participant(sender_id);
        let preview: String = message.content.chars().take(PREVIEW_CHARS).collect();
        let notification = Notification::new(
            recipient,
            NotificationKind::NewMessage,
            "New message",
            preview,
            Some(conversation_id),
        );
        if let Err(e) = self.notifications.create(&notification).await {
            warn!("Failed to notify {} about message {}: {}", recipient, message.id, e);
        }

        Ok(message)
    }

    pub async fn list_conversations(&self, user_id: Uuid) -> AppResult<Vec<Conversation>> {
        self.conversations.list_for_user(user_id).await
    }

    pub async fn list_messages(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<Vec<Message>> {
        self.load_for(conversation_id, user_id).await?;
        self.messages.list(conversation_id, pagination).await
    }

    /// Mark everything the other participant sent as read
    pub async fn mark_read(&self, user_id: Uuid, conversation_id: Uuid) -> AppResult<u64> {
        self.load_for(conversation_id, user_id).await?;
        self.messages.mark_read(conversation_id, user_id).await
    }

    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        self.messages.unread_count(user_id).await
    }
}
