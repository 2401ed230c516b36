use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        friend::{
            model::{FriendRequestList, FriendResponse},
            repository::FriendRepo,
            schema::FriendRequestEntity,
        },
        notification::{
            model::NewNotification, schema::NotificationType, service::NotificationService,
        },
        user::repository::UserRepository,
    },
};

#[derive(Clone)]
pub struct FriendService<R, U>
where
    R: FriendRepo + Send + Sync,
    U: UserRepository + Send + Sync,
{
    friend_repo: Arc<R>,
    user_repo: Arc<U>,
    notifier: NotificationService,
}

impl<R, U> FriendService<R, U>
where
    R: FriendRepo + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(
        friend_repo: Arc<R>,
        user_repo: Arc<U>,
        notifier: NotificationService,
    ) -> Self {
        FriendService { friend_repo, user_repo, notifier }
    }

    pub async fn get_friends(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendResponse>, error::SystemError> {
        self.friend_repo.find_friends(&user_id).await
    }

    pub async fn remove_friend(
        &self,
        user_id: Uuid,
        friend_id: Uuid,
    ) -> Result<(), error::SystemError> {
        if !self.friend_repo.delete_friendship(&user_id, &friend_id).await? {
            return Err(error::SystemError::not_found("Friendship not found"));
        }
        Ok(())
    }

    pub async fn send_friend_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        message: Option<String>,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        if receiver_id == sender_id {
            return Err(error::SystemError::bad_request("Cannot send friend request to yourself"));
        }

        let sender = self
            .user_repo
            .find_by_id(&sender_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        if self.user_repo.find_by_id(&receiver_id).await?.is_none() {
            return Err(error::SystemError::not_found("Receiver user not found"));
        }

        let (blocked, friendship, pending) = tokio::try_join!(
            self.friend_repo.is_blocked_between(&sender_id, &receiver_id),
            self.friend_repo.find_friendship(&sender_id, &receiver_id),
            self.friend_repo.find_friend_request(&sender_id, &receiver_id),
        )?;

        if blocked {
            return Err(error::SystemError::forbidden("You cannot interact with this user"));
        }

        if friendship.is_some() {
            return Err(error::SystemError::bad_request("Users are already friends"));
        }

        if pending.is_some() {
            return Err(error::SystemError::bad_request("Friend request already exists"));
        }

        let request =
            self.friend_repo.create_friend_request(&sender_id, &receiver_id, &message).await?;

        self.notifier
            .notify_quietly(
                NewNotification::new(
                    receiver_id,
                    NotificationType::FriendRequest,
                    "New friend request",
                    format!("{} sent you a friend request", sender.display_name),
                )
                .related_to(request.id),
            )
            .await;

        Ok(request)
    }

    pub async fn accept_friend_request(
        &self,
        user_id: Uuid,
        request_id: Uuid,
    ) -> Result<FriendResponse, error::SystemError> {
        let from_user_id = self.friend_repo.accept_friend_request_atomic(&request_id, &user_id).await?;

        let from_user = self
            .user_repo
            .find_by_id(&from_user_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        if let Some(me) = self.user_repo.find_by_id(&user_id).await? {
            self.notifier
                .notify_quietly(
                    NewNotification::new(
                        from_user_id,
                        NotificationType::FriendAccepted,
                        "Friend request accepted",
                        format!("{} accepted your friend request", me.display_name),
                    )
                    .related_to(user_id),
                )
                .await;
        }

        Ok(FriendResponse::from(from_user))
    }

    /// The recipient declines, or the sender withdraws.
    pub async fn decline_friend_request(
        &self,
        user_id: Uuid,
        request_id: Uuid,
    ) -> Result<(), error::SystemError> {
        let request = self
            .friend_repo
            .find_friend_request_by_id(&request_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Friend request not found"))?;

        if request.to_user_id != user_id && request.from_user_id != user_id {
            return Err(error::SystemError::forbidden(
                "You are not allowed to decline this friend request",
            ));
        }

        self.friend_repo.delete_friend_request(&request_id).await
    }

    pub async fn get_friend_requests(
        &self,
        user_id: Uuid,
    ) -> Result<FriendRequestList, error::SystemError> {
        let (incoming, outgoing) = tokio::try_join!(
            self.friend_repo.find_friend_request_to_user(&user_id),
            self.friend_repo.find_friend_request_from_user(&user_id),
        )?;
        Ok(FriendRequestList { incoming, outgoing })
    }

    pub async fn block_user(&self, user_id: Uuid, blocked_id: Uuid) -> Result<(), error::SystemError> {
        if user_id == blocked_id {
            return Err(error::SystemError::bad_request("Cannot block yourself"));
        }

        if self.user_repo.find_by_id(&blocked_id).await?.is_none() {
            return Err(error::SystemError::not_found("User not found"));
        }

        self.friend_repo.block_user_atomic(&user_id, &blocked_id).await?;
        log::info!("User {} blocked {}", user_id, blocked_id);
        Ok(())
    }

    pub async fn unblock_user(
        &self,
        user_id: Uuid,
        blocked_id: Uuid,
    ) -> Result<(), error::SystemError> {
        if !self.friend_repo.unblock(&user_id, &blocked_id).await? {
            return Err(error::SystemError::not_found("User is not blocked"));
        }
        Ok(())
    }

    pub async fn get_blocked_users(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendResponse>, error::SystemError> {
        self.friend_repo.find_blocked(&user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::friend::repository::FriendRequestRepository;
    use crate::test::{MemoryFriends, MemoryNotifications, MemoryUsers, notifier, user_entity};

    struct Fixture {
        service: FriendService<MemoryFriends, MemoryUsers>,
        friends: Arc<MemoryFriends>,
        notifications: Arc<MemoryNotifications>,
        ash: Uuid,
        misty: Uuid,
    }

    fn fixture() -> Fixture {
        let (ash, misty) = (user_entity("ash"), user_entity("misty"));
        let ids = (ash.id, misty.id);
        let users = Arc::new(MemoryUsers::with(vec![ash, misty]));
        let friends = Arc::new(MemoryFriends::new(users.clone()));
        let (notifier, notifications) = notifier(users.clone());
        let service = FriendService::with_dependencies(friends.clone(), users, notifier);
        Fixture { service, friends, notifications, ash: ids.0, misty: ids.1 }
    }

    #[actix_web::test]
    async fn test_request_then_accept_makes_friends() {
        let f = fixture();
        let request = f.service.send_friend_request(f.ash, f.misty, Some("Battle?".into())).await.unwrap();
        assert_eq!(f.notifications.kinds_for(f.misty), vec![NotificationType::FriendRequest]);

        let err = f.service.send_friend_request(f.misty, f.ash, None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));
        let err = f.service.send_friend_request(f.ash, f.ash, None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));

        let lists = f.service.get_friend_requests(f.misty).await.unwrap();
        assert_eq!(lists.incoming.len(), 1);
        assert!(lists.outgoing.is_empty());

        // only the recipient can accept
        assert!(f.service.accept_friend_request(f.ash, request.id).await.is_err());
        let friend = f.service.accept_friend_request(f.misty, request.id).await.unwrap();
        assert_eq!(friend.id, f.ash);
        assert_eq!(f.notifications.kinds_for(f.ash), vec![NotificationType::FriendAccepted]);
        assert_eq!(f.friends.request_count(), 0);
        assert_eq!(f.service.get_friends(f.ash).await.unwrap().len(), 1);

        let err = f.service.send_friend_request(f.ash, f.misty, None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));

        f.service.remove_friend(f.misty, f.ash).await.unwrap();
        assert!(f.service.get_friends(f.ash).await.unwrap().is_empty());
        let err = f.service.remove_friend(f.misty, f.ash).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[actix_web::test]
    async fn test_block_drops_friendship_and_pending_requests() {
        let f = fixture();
        let request = f.service.send_friend_request(f.ash, f.misty, None).await.unwrap();
        f.service.accept_friend_request(f.misty, request.id).await.unwrap();
        f.friends.create_friend_request(&f.misty, &f.ash, &None).await.unwrap();

        f.service.block_user(f.ash, f.misty).await.unwrap();

        assert!(f.service.get_friends(f.ash).await.unwrap().is_empty());
        assert_eq!(f.friends.request_count(), 0);
        assert_eq!(f.service.get_blocked_users(f.ash).await.unwrap().len(), 1);
        assert!(f.service.get_blocked_users(f.misty).await.unwrap().is_empty());

        // a block in either direction stops new requests
        let err = f.service.send_friend_request(f.misty, f.ash, None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        let err = f.service.block_user(f.ash, f.ash).await.unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));

        f.service.unblock_user(f.ash, f.misty).await.unwrap();
        let err = f.service.unblock_user(f.ash, f.misty).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
        f.service.send_friend_request(f.misty, f.ash, None).await.unwrap();
    }

    #[actix_web::test]
    async fn test_decline_by_either_side_only() {
        let f = fixture();
        let brock = user_entity("brock");
        let request = f.service.send_friend_request(f.ash, f.misty, None).await.unwrap();

        let err = f.service.decline_friend_request(brock.id, request.id).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        f.service.decline_friend_request(f.ash, request.id).await.unwrap();
        assert_eq!(f.friends.request_count(), 0);
        let err = f.service.decline_friend_request(f.misty, request.id).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }
}
