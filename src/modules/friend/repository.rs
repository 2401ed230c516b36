use uuid::Uuid;

use crate::api::error;
use crate::modules::friend::model::{FriendRequestResponse, FriendResponse};
use crate::modules::friend::schema::{FriendEntity, FriendRequestEntity};

#[async_trait::async_trait]
pub trait FriendRepository {
    async fn find_friendship(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<FriendEntity>, error::SystemError>;

    async fn find_friends(&self, user_id: &Uuid)
    -> Result<Vec<FriendResponse>, error::SystemError>;

    async fn delete_friendship(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<bool, error::SystemError>;
}

#[async_trait::async_trait]
pub trait FriendRequestRepository {
    /// Finds a pending request between the two users, in either direction.
    async fn find_friend_request(
        &self,
        sender_id: &Uuid,
        receiver_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    async fn find_friend_request_by_id(
        &self,
        request_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    async fn find_friend_request_from_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError>;

    async fn find_friend_request_to_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError>;

    async fn create_friend_request(
        &self,
        sender_id: &Uuid,
        receiver_id: &Uuid,
        message: &Option<String>,
    ) -> Result<FriendRequestEntity, error::SystemError>;

    async fn delete_friend_request(&self, request_id: &Uuid) -> Result<(), error::SystemError>;
}

#[async_trait::async_trait]
pub trait BlockRepository {
    /// True when either user has blocked the other.
    async fn is_blocked_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<bool, error::SystemError>;

    async fn find_blocked(&self, user_id: &Uuid)
    -> Result<Vec<FriendResponse>, error::SystemError>;

    async fn unblock(&self, user_id: &Uuid, blocked_id: &Uuid) -> Result<bool, error::SystemError>;
}

#[async_trait::async_trait]
pub trait FriendRepo:
    FriendRepository + FriendRequestRepository + BlockRepository + Send + Sync
{
    /// Inserts the friendship and removes the request in one transaction.
    /// Returns the id of the user who sent the request.
    async fn accept_friend_request_atomic(
        &self,
        request_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Uuid, error::SystemError>;

    /// Drops any friendship and pending requests between the users, then records the block.
    async fn block_user_atomic(
        &self,
        user_id: &Uuid,
        blocked_id: &Uuid,
    ) -> Result<(), error::SystemError>;
}
