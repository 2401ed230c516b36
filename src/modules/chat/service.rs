use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::api::error;
use crate::modules::chat::{
    model::{ChatHistoryQuery, ChatTarget, NewChatMessage, normalize_content},
    repository::ChatRepository,
    schema::ChatMessageEntity,
};
use crate::modules::friend::repository::BlockRepository;
use crate::modules::notification::{
    model::NewNotification, schema::NotificationType, service::NotificationService,
};
use crate::modules::trade::repository::TradeRepository;
use crate::modules::user::repository::UserRepository;

/// Trade rooms and private conversations. Messages live for a few days only.
pub struct ChatService<R, T>
where
    R: ChatRepository + Send + Sync,
    T: TradeRepository + Send + Sync,
{
    chat_repo: Arc<R>,
    trade_repo: Arc<T>,
    users: Arc<dyn UserRepository + Send + Sync>,
    blocks: Arc<dyn BlockRepository + Send + Sync>,
    notifier: NotificationService,
}

impl<R, T> Clone for ChatService<R, T>
where
    R: ChatRepository + Send + Sync,
    T: TradeRepository + Send + Sync,
{
    fn clone(&self) -> Self {
        ChatService {
            chat_repo: self.chat_repo.clone(),
            trade_repo: self.trade_repo.clone(),
            users: self.users.clone(),
            blocks: self.blocks.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<R, T> ChatService<R, T>
where
    R: ChatRepository + Send + Sync + 'static,
    T: TradeRepository + Send + Sync + 'static,
{
    pub fn with_dependencies(
        chat_repo: Arc<R>,
        trade_repo: Arc<T>,
        users: Arc<dyn UserRepository + Send + Sync>,
        blocks: Arc<dyn BlockRepository + Send + Sync>,
        notifier: NotificationService,
    ) -> Self {
        ChatService { chat_repo, trade_repo, users, blocks, notifier }
    }

    /// Rooms are trades: participants may enter, and anyone may look at an open listing.
    pub async fn can_access_room(&self, user_id: Uuid, room_id: Uuid) -> Result<bool, error::SystemError> {
        Ok(self
            .trade_repo
            .find_trade(&room_id)
            .await?
            .is_some_and(|t| t.is_participant(&user_id) || t.is_open_listing()))
    }

    async fn require_room(&self, user_id: Uuid, room_id: Uuid) -> Result<(), error::SystemError> {
        if !self.can_access_room(user_id, room_id).await? {
            return Err(error::SystemError::forbidden("You cannot access this room"));
        }
        Ok(())
    }

    pub async fn send_room_message(
        &self,
        sender_id: Uuid,
        room_id: Uuid,
        content: &str,
    ) -> Result<ChatMessageEntity, error::SystemError> {
        let content = normalize_content(content)
            .ok_or_else(|| error::SystemError::bad_request("Message must be 1-2000 characters"))?;
        self.require_room(sender_id, room_id).await?;

        self.chat_repo
            .insert_message(&NewChatMessage {
                sender_id,
                target: ChatTarget::Room(room_id),
                content: content.to_string(),
                sent_at: chrono::Utc::now(),
            })
            .await
    }

    pub async fn send_private_message(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
        content: &str,
    ) -> Result<ChatMessageEntity, error::SystemError> {
        let content = normalize_content(content)
            .ok_or_else(|| error::SystemError::bad_request("Message must be 1-2000 characters"))?;
        if sender_id == recipient_id {
            return Err(error::SystemError::bad_request("Cannot message yourself"));
        }

        let sender = self
            .users
            .find_by_id(&sender_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;
        if self.users.find_by_id(&recipient_id).await?.is_none() {
            return Err(error::SystemError::not_found("Recipient not found"));
        }
        if self.blocks.is_blocked_between(&sender_id, &recipient_id).await? {
            return Err(error::SystemError::forbidden("You cannot message this user"));
        }

        let message = self
            .chat_repo
            .insert_message(&NewChatMessage {
                sender_id,
                target: ChatTarget::User(recipient_id),
                content: content.to_string(),
                sent_at: chrono::Utc::now(),
            })
            .await?;

        self.notifier
            .notify_quietly(
                NewNotification::new(
                    recipient_id,
                    NotificationType::ChatMessage,
                    format!("Message from {}", sender.display_name),
                    content.chars().take(120).collect::<String>(),
                )
                .related_to(message.id),
            )
            .await;

        Ok(message)
    }

    pub async fn room_history(
        &self,
        user_id: Uuid,
        room_id: Uuid,
        query: ChatHistoryQuery,
    ) -> Result<Vec<ChatMessageEntity>, error::SystemError> {
        self.require_room(user_id, room_id).await?;
        self.chat_repo.find_room_messages(&room_id, &query).await
    }

    pub async fn private_history(
        &self,
        user_id: Uuid,
        other_id: Uuid,
        query: ChatHistoryQuery,
    ) -> Result<Vec<ChatMessageEntity>, error::SystemError> {
        self.chat_repo.find_private_messages(&user_id, &other_id, &query).await
    }

    pub async fn prune_expired(&self) -> Result<u64, error::SystemError> {
        let removed = self.chat_repo.delete_expired().await?;
        if removed > 0 {
            tracing::info!("Pruned {} expired chat messages", removed);
        }
        Ok(removed)
    }

    pub fn spawn_prune_task(&self, every: Duration) {
        let service = self.clone();
        actix_web::rt::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                if let Err(e) = service.prune_expired().await {
                    tracing::error!("Chat prune failed: {}", e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::notification::schema::NotificationType;
    use crate::modules::trade::{
        model::{CreateTradeModel, OfferedCardModel},
        schema::TradeVisibility,
        service::TradeService,
    };
    use crate::test::{
        MemoryBlocks, MemoryChat, MemoryMarket, MemoryUsers, notifier, user_card, user_entity,
    };

    #[actix_web::test]
    async fn test_room_access_follows_trade_participation() {
        let (ash, misty, brock) = (user_entity("ash"), user_entity("misty"), user_entity("brock"));
        let a = user_card(ash.id, 1, 10.0);
        let m = user_card(misty.id, 1, 10.0);
        let market = Arc::new(MemoryMarket::with_cards(vec![a.clone(), m.clone()]));
        let users = Arc::new(MemoryUsers::with(vec![ash.clone(), misty.clone(), brock.clone()]));
        let blocks = Arc::new(MemoryBlocks::default());
        let (notifier, _) = notifier(users.clone());

        let trades = TradeService::with_dependencies(
            market.clone(),
            market.clone(),
            users.clone(),
            blocks.clone(),
            notifier.clone(),
        );
        let trade = trades
            .create_trade(
                ash.id,
                CreateTradeModel {
                    visibility: TradeVisibility::Private,
                    receiver_id: Some(misty.id),
                    initiator_cards: vec![OfferedCardModel { user_card_id: a.id, quantity: None }],
                    receiver_cards: vec![OfferedCardModel { user_card_id: m.id, quantity: None }],
                    note: None,
                },
            )
            .await
            .unwrap();

        let chat = ChatService::with_dependencies(
            Arc::new(MemoryChat::default()),
            market,
            users,
            blocks,
            notifier,
        );

        assert!(chat.can_access_room(misty.id, trade.id).await.unwrap());
        assert!(!chat.can_access_room(brock.id, trade.id).await.unwrap());
        assert!(!chat.can_access_room(ash.id, Uuid::now_v7()).await.unwrap());

        chat.send_room_message(ash.id, trade.id, "  hi  ").await.unwrap();
        let err = chat.send_room_message(brock.id, trade.id, "let me in").await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        let query = ChatHistoryQuery { before: None, limit: None };
        let history = chat.room_history(misty.id, trade.id, query.clone()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hi");
        assert!(chat.room_history(brock.id, trade.id, query).await.is_err());
    }

    #[actix_web::test]
    async fn test_private_messages_respect_blocks() {
        let (ash, misty) = (user_entity("ash"), user_entity("misty"));
        let users = Arc::new(MemoryUsers::with(vec![ash.clone(), misty.clone()]));
        let blocks = Arc::new(MemoryBlocks::default());
        let (notifier, notifications) = notifier(users.clone());
        let store = Arc::new(MemoryChat::default());
        let chat = ChatService::with_dependencies(
            store.clone(),
            Arc::new(MemoryMarket::default()),
            users,
            blocks.clone(),
            notifier,
        );

        chat.send_private_message(ash.id, misty.id, "trade?").await.unwrap();
        assert_eq!(notifications.kinds_for(misty.id), vec![NotificationType::ChatMessage]);

        let history = chat
            .private_history(misty.id, ash.id, ChatHistoryQuery { before: None, limit: None })
            .await
            .unwrap();
        assert_eq!(history.len(), 1);

        blocks.block(misty.id, ash.id);
        let err = chat.send_private_message(ash.id, misty.id, "hello?").await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        assert!(chat.send_private_message(ash.id, ash.id, "me").await.is_err());
        assert!(chat.send_private_message(ash.id, misty.id, "   ").await.is_err());
    }

    #[actix_web::test]
    async fn test_expired_messages_are_hidden_and_pruned() {
        let (ash, misty) = (user_entity("ash"), user_entity("misty"));
        let users = Arc::new(MemoryUsers::with(vec![ash.clone(), misty.clone()]));
        let (notifier, _) = notifier(users.clone());
        let store = Arc::new(MemoryChat::default());
        let chat = ChatService::with_dependencies(
            store.clone(),
            Arc::new(MemoryMarket::default()),
            users,
            Arc::new(MemoryBlocks::default()),
            notifier,
        );

        store
            .insert_message(&NewChatMessage {
                sender_id: ash.id,
                target: ChatTarget::User(misty.id),
                content: "old news".into(),
                sent_at: chrono::Utc::now() - chrono::Duration::days(4),
            })
            .await
            .unwrap();
        chat.send_private_message(ash.id, misty.id, "fresh").await.unwrap();

        let query = ChatHistoryQuery { before: None, limit: None };
        let history = chat.private_history(ash.id, misty.id, query).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "fresh");

        assert_eq!(chat.prune_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }
}
