//! Saved items and the notification inbox

use rentshare_core::{
    models::{Item, Notification},
    traits::{FavoriteRepository, ItemRepository, NotificationRepository, Pagination},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

pub struct ActivityService {
    favorites: Arc<dyn FavoriteRepository>,
    items: Arc<dyn ItemRepository>,
    notifications: Arc<dyn NotificationRepository>,
}

impl ActivityService {
    pub fn new(
        favorites: Arc<dyn FavoriteRepository>,
        items: Arc<dyn ItemRepository>,
        notifications: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            favorites,
            items,
            notifications,
        }
    }

    /// Save an item. Saving it twice is not an error.
    #[instrument(skip(self))]
    pub async fn add_favorite(&self, user_id: Uuid, item_id: Uuid) -> AppResult<()> {
        if self.items.find_by_id(item_id).await?.is_none() {
            return Err(AppError::ItemNotFound(item_id.to_string()));
        }
        if !self.favorites.add(user_id, item_id).await? {
            debug!("Item {} already saved by {}", item_id, user_id);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_favorite(&self, user_id: Uuid, item_id: Uuid) -> AppResult<()> {
        if !self.favorites.remove(user_id, item_id).await? {
            return Err(AppError::NotFound(format!("Favorite {}", item_id)));
        }
        Ok(())
    }

    /// Saved items, newest first. Items deleted since are skipped.
    pub async fn list_favorites(&self, user_id: Uuid) -> AppResult<Vec<Item>> {
        let mut items = Vec::new();
        for item_id in self.favorites.list_item_ids(user_id).await? {
            if let Some(item) = self.items.find_by_id(item_id).await? {
                items.push(item);
            }
        }
        Ok(items)
    }

    pub async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        pagination: &Pagination,
    ) -> AppResult<Vec<Notification>> {
        self.notifications.list(user_id, unread_only, pagination).await
    }

    pub async fn mark_notification_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        if !self.notifications.mark_read(notification_id, user_id).await? {
            return Err(AppError::NotFound(format!("Notification {}", notification_id)));
        }
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self, user_id: Uuid) -> AppResult<u64> {
        self.notifications.mark_all_read(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        InMemoryFavoriteRepository, InMemoryItemRepository, InMemoryNotificationRepository,
    };
    use rentshare_core::models::NotificationKind;

    fn service(items: Vec<Item>) -> (Arc<InMemoryNotificationRepository>, ActivityService) {
        let notifications = Arc::new(InMemoryNotificationRepository::default());
        let service = ActivityService::new(
            Arc::new(InMemoryFavoriteRepository::default()),
            Arc::new(InMemoryItemRepository::with(items)),
            notifications.clone(),
        );
        (notifications, service)
    }

    #[tokio::test]
    async fn test_favorites_are_idempotent() {
        let item = Item::default();
        let (_, activity) = service(vec![item.clone()]);
        let user = Uuid::new_v4();

        activity.add_favorite(user, item.id).await.unwrap();
        activity.add_favorite(user, item.id).await.unwrap();
        assert_eq!(activity.list_favorites(user).await.unwrap().len(), 1);

        activity.remove_favorite(user, item.id).await.unwrap();
        assert!(activity.list_favorites(user).await.unwrap().is_empty());
        assert!(matches!(
            activity.remove_favorite(user, item.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_item_cannot_be_saved() {
        let (_, activity) = service(vec![]);
        assert!(matches!(
            activity.add_favorite(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(AppError::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_notification_inbox() {
        let (notifications, activity) = service(vec![]);
        let user = Uuid::new_v4();
        let page = Pagination::new(1, 20);

        let first = Notification::new(user, NotificationKind::NewMessage, "Hi", "hello", None);
        notifications.create(&first).await.unwrap();
        notifications
            .create(&Notification::new(user, NotificationKind::NewReview, "Review", "5/5", None))
            .await
            .unwrap();

        assert_eq!(activity.list_notifications(user, true, &page).await.unwrap().len(), 2);

        activity.mark_notification_read(user, first.id).await.unwrap();
        assert_eq!(activity.list_notifications(user, true, &page).await.unwrap().len(), 1);

        // someone else's notification looks missing
        assert!(matches!(
            activity.mark_notification_read(Uuid::new_v4(), first.id).await,
            Err(AppError::NotFound(_))
        ));

        assert_eq!(activity.mark_all_notifications_read(user).await.unwrap(), 1);
        assert!(activity.list_notifications(user, true, &page).await.unwrap().is_empty());
        assert_eq!(activity.list_notifications(user, false, &page).await.unwrap().len(), 2);
    }
}
