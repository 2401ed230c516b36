use uuid::Uuid;

use crate::{
    api::{error, pagination::PageQuery},
    modules::notification::{
        model::NewNotification, repository::NotificationRepository, schema::NotificationEntity,
    },
};

#[derive(Clone)]
pub struct NotificationRepositoryPg {
    pool: sqlx::PgPool,
}

impl NotificationRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl NotificationRepository for NotificationRepositoryPg {
    async fn create(
        &self,
        notification: &NewNotification,
    ) -> Result<NotificationEntity, error::SystemError> {
        let entity = sqlx::query_as::<_, NotificationEntity>(
            r#"
            INSERT INTO notifications (id, user_id, type, title, message, related_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(notification.user_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.related_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(entity)
    }

    async fn find_by_user(
        &self,
        user_id: &Uuid,
        unread_only: bool,
        page: &PageQuery,
    ) -> Result<(Vec<NotificationEntity>, i64), error::SystemError> {
        let items = sqlx::query_as::<_, NotificationEntity>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        Ok((items, total))
    }

    async fn count_unread(&self, user_id: &Uuid) -> Result<i64, error::SystemError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_read(
        &self,
        id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<NotificationEntity>, error::SystemError> {
        let entity = sqlx::query_as::<_, NotificationEntity>(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn mark_all_read(&self, user_id: &Uuid) -> Result<u64, error::SystemError> {
        let rows = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW() WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows)
    }

    async fn delete(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows > 0)
    }

    async fn delete_all(&self, user_id: &Uuid) -> Result<u64, error::SystemError> {
        let rows = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows)
    }
}
