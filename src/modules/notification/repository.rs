use uuid::Uuid;

use crate::api::{error, pagination::PageQuery};
use crate::modules::notification::{model::NewNotification, schema::NotificationEntity};

#[async_trait::async_trait]
pub trait NotificationRepository {
    async fn create(
        &self,
        notification: &NewNotification,
    ) -> Result<NotificationEntity, error::SystemError>;

    /// Returns one page plus the total number of matching rows.
    async fn find_by_user(
        &self,
        user_id: &Uuid,
        unread_only: bool,
        page: &PageQuery,
    ) -> Result<(Vec<NotificationEntity>, i64), error::SystemError>;

    async fn count_unread(&self, user_id: &Uuid) -> Result<i64, error::SystemError>;

    async fn mark_read(
        &self,
        id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<NotificationEntity>, error::SystemError>;

    async fn mark_all_read(&self, user_id: &Uuid) -> Result<u64, error::SystemError>;

    async fn delete(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, error::SystemError>;

    async fn delete_all(&self, user_id: &Uuid) -> Result<u64, error::SystemError>;
}
