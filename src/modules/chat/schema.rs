use serde::Serialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Either a trade room message (`room_id`) or a private one (`recipient_id`), never both.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageEntity {
    pub id: Uuid,
    pub room_id: Option<Uuid>,
    pub sender_id: Uuid,
    pub recipient_id: Option<Uuid>,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}
