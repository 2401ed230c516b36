use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::notification::schema::{NotificationEntity, NotificationType};
use crate::modules::user::model::UserSettings;

impl NotificationType {
    /// Whether the recipient's settings allow this kind of notification.
    pub fn is_enabled_for(&self, settings: &UserSettings) -> bool {
        match self {
            NotificationType::TradeRequest
            | NotificationType::TradeResponse
            | NotificationType::TradeAccepted
            | NotificationType::TradeRejected
            | NotificationType::TradeCancelled
            | NotificationType::TradeCompleted
            | NotificationType::TradeMessage => settings.notify_trades,
            NotificationType::FriendRequest | NotificationType::FriendAccepted => {
                settings.notify_friends
            }
            NotificationType::ChatMessage => settings.notify_messages,
            NotificationType::System => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: Option<Uuid>,
}

impl NewNotification {
    pub fn new(
        user_id: Uuid,
        kind: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { user_id, kind, title: title.into(), message: message.into(), related_id: None }
    }

    pub fn related_to(mut self, related_id: Uuid) -> Self {
        self.related_id = Some(related_id);
        self
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NotificationQuery {
    pub unread: Option<bool>,
    #[validate(range(min = 1, max = 100000))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: Option<Uuid>,
    pub is_read: bool,
    pub read_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<NotificationEntity> for NotificationResponse {
    fn from(entity: NotificationEntity) -> Self {
        NotificationResponse {
            id: entity.id,
            kind: entity._type,
            title: entity.title,
            message: entity.message,
            related_id: entity.related_id,
            is_read: entity.is_read,
            read_at: entity.read_at,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub unread: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedResponse {
    pub affected: u64,
}
