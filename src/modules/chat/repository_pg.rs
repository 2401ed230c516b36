use uuid::Uuid;

use crate::{
    api::error,
    modules::chat::{
        model::{ChatHistoryQuery, ChatTarget, NewChatMessage},
        repository::ChatRepository,
        schema::ChatMessageEntity,
    },
};

#[derive(Clone)]
pub struct ChatRepositoryPg {
    pool: sqlx::PgPool,
}

impl ChatRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ChatRepository for ChatRepositoryPg {
    async fn insert_message(
        &self,
        message: &NewChatMessage,
    ) -> Result<ChatMessageEntity, error::SystemError> {
        let (room_id, recipient_id) = match message.target {
            ChatTarget::Room(room_id) => (Some(room_id), None),
            ChatTarget::User(recipient_id) => (None, Some(recipient_id)),
        };

        let entity = sqlx::query_as::<_, ChatMessageEntity>(
            r#"
            INSERT INTO chat_messages (id, room_id, sender_id, recipient_id, content, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(room_id)
        .bind(message.sender_id)
        .bind(recipient_id)
        .bind(&message.content)
        .bind(message.sent_at)
        .bind(message.expires_at())
        .fetch_one(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn find_room_messages(
        &self,
        room_id: &Uuid,
        query: &ChatHistoryQuery,
    ) -> Result<Vec<ChatMessageEntity>, error::SystemError> {
        let messages = sqlx::query_as::<_, ChatMessageEntity>(
            r#"
            SELECT * FROM chat_messages
            WHERE room_id = $1
              AND expires_at > NOW()
              AND ($2::timestamptz IS NULL OR created_at < $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(room_id)
        .bind(query.before)
        .bind(query.limit())
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn find_private_messages(
        &self,
        user_id: &Uuid,
        other_id: &Uuid,
        query: &ChatHistoryQuery,
    ) -> Result<Vec<ChatMessageEntity>, error::SystemError> {
        let messages = sqlx::query_as::<_, ChatMessageEntity>(
            r#"
            SELECT * FROM chat_messages
            WHERE ((sender_id = $1 AND recipient_id = $2)
                OR (sender_id = $2 AND recipient_id = $1))
              AND expires_at > NOW()
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(other_id)
        .bind(query.before)
        .bind(query.limit())
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn delete_expired(&self) -> Result<u64, error::SystemError> {
        let rows = sqlx::query("DELETE FROM chat_messages WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows)
    }
}
