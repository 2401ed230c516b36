use actix::Addr;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{
    error,
    pagination::{Page, PageQuery},
};
use crate::modules::notification::{
    model::{NewNotification, NotificationQuery, NotificationResponse},
    repository::NotificationRepository,
};
use crate::modules::user::{model::UserSettings, repository::UserRepository};
use crate::modules::websocket::{
    events::{SendToUser, SendToUsers},
    message::ServerMessage,
    server::WebSocketServer,
};

/// Stores notifications and pushes them to connected sessions.
#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
    realtime: Option<Addr<WebSocketServer>>,
}

impl NotificationService {
    pub fn with_dependencies(
        repo: Arc<dyn NotificationRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
        realtime: Option<Addr<WebSocketServer>>,
    ) -> Self {
        NotificationService { repo, users, realtime }
    }

    /// Returns `None` when the recipient is gone or has this kind turned off.
    pub async fn notify(
        &self,
        notification: NewNotification,
    ) -> Result<Option<NotificationResponse>, error::SystemError> {
        let Some(user) = self.users.find_by_id(&notification.user_id).await? else {
            return Ok(None);
        };

        if !notification.kind.is_enabled_for(&UserSettings::from(&user)) {
            log::debug!(
                "Notification {:?} suppressed by settings of user {}",
                notification.kind,
                user.id
            );
            return Ok(None);
        }

        let created = NotificationResponse::from(self.repo.create(&notification).await?);

        match serde_json::to_value(&created) {
            Ok(value) => self.push_to_user(
                notification.user_id,
                ServerMessage::Notification { notification: value },
            ),
            Err(e) => log::warn!("Could not serialize notification {}: {}", created.id, e),
        }

        Ok(Some(created))
    }

    /// Like [`notify`](Self::notify) but never fails the caller.
    pub async fn notify_quietly(&self, notification: NewNotification) {
        let user_id = notification.user_id;
        if let Err(e) = self.notify(notification).await {
            log::warn!("Failed to notify user {}: {}", user_id, e);
        }
    }

    pub fn push_to_user(&self, user_id: Uuid, message: ServerMessage) {
        if let Some(server) = &self.realtime {
            server.do_send(SendToUser { user_id, message });
        }
    }

    pub fn push_to_users(&self, user_ids: Vec<Uuid>, message: ServerMessage) {
        if let Some(server) = &self.realtime {
            server.do_send(SendToUsers { user_ids, message });
        }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        query: NotificationQuery,
    ) -> Result<Page<NotificationResponse>, error::SystemError> {
        let page = PageQuery::new(query.page, query.limit);
        let (items, total) =
            self.repo.find_by_user(&user_id, query.unread.unwrap_or(false), &page).await?;
        Ok(Page::new(items, &page, total).map(NotificationResponse::from))
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, error::SystemError> {
        self.repo.count_unread(&user_id).await
    }

    pub async fn mark_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> Result<NotificationResponse, error::SystemError> {
        self.repo
            .mark_read(&notification_id, &user_id)
            .await?
            .map(NotificationResponse::from)
            .ok_or_else(|| error::SystemError::not_found("Notification not found"))
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, error::SystemError> {
        self.repo.mark_all_read(&user_id).await
    }

    pub async fn delete(&self, user_id: Uuid, notification_id: Uuid) -> Result<(), error::SystemError> {
        if !self.repo.delete(&notification_id, &user_id).await? {
            return Err(error::SystemError::not_found("Notification not found"));
        }
        Ok(())
    }

    pub async fn delete_all(&self, user_id: Uuid) -> Result<u64, error::SystemError> {
        self.repo.delete_all(&user_id).await
    }
}
