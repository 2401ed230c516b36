use uuid::Uuid;

use crate::api::error;
use crate::modules::chat::{
    model::{ChatHistoryQuery, NewChatMessage},
    schema::ChatMessageEntity,
};

#[async_trait::async_trait]
pub trait ChatRepository {
    async fn insert_message(
        &self,
        message: &NewChatMessage,
    ) -> Result<ChatMessageEntity, error::SystemError>;

    /// Unexpired room messages, newest first.
    async fn find_room_messages(
        &self,
        room_id: &Uuid,
        query: &ChatHistoryQuery,
    ) -> Result<Vec<ChatMessageEntity>, error::SystemError>;

    /// Unexpired private messages between the two users, in both directions.
    async fn find_private_messages(
        &self,
        user_id: &Uuid,
        other_id: &Uuid,
        query: &ChatHistoryQuery,
    ) -> Result<Vec<ChatMessageEntity>, error::SystemError>;

    async fn delete_expired(&self) -> Result<u64, error::SystemError>;
}
