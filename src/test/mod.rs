//! In-memory fakes shared by service tests.
#![allow(dead_code)]

use sqlx::types::Json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::api::{error, pagination::PageQuery};
use crate::modules::card::{
    model::CardFilter,
    repository::CardRepository,
    schema::{CardCategory, CardEntity, CardSetEntity},
};
use crate::modules::chat::{
    model::{ChatHistoryQuery, ChatTarget, NewChatMessage},
    repository::ChatRepository,
    schema::ChatMessageEntity,
};
use crate::modules::collection::{
    model::{
        CollectionFilter, CollectionSummary, NewUserCard, UserCardChanges, UserCardRow,
        WishlistMatch, WishlistRow,
    },
    repository::{UserCardRepository, WishlistRepository},
    schema::{CardCondition, UserCardEntity, WishlistItemEntity},
};
use crate::configs::CacheStore;
use crate::modules::friend::{
    model::{FriendRequestResponse, FriendResponse, IdOrInfo},
    repository::{BlockRepository, FriendRepo, FriendRepository, FriendRequestRepository},
    schema::{FriendEntity, FriendRequestEntity},
};
use crate::modules::notification::{
    model::NewNotification, repository::NotificationRepository, schema::NotificationEntity,
    service::NotificationService,
};
use crate::modules::user::{
    model::{InsertUser, UpdateSettingsModel, UpdateUser},
    repository::UserRepository,
    schema::{UserEntity, UserRole},
};
use crate::modules::trade::{
    model::{NewTrade, PricedOffer, TradeFilter, TradeItemRow, TradeRole},
    repository::TradeRepository,
    schema::{TradeEntity, TradeItemEntity, TradeMessageEntity, TradeSide, TradeStatus},
};
use crate::utils::{TokenSettings, round_cents};

pub fn user_entity(username: &str) -> UserEntity {
    let now = chrono::Utc::now();
    UserEntity {
        id: Uuid::now_v7(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        hash_password: String::new(),
        role: UserRole::User,
        display_name: username.to_string(),
        avatar_url: None,
        bio: None,
        language: "en".into(),
        notify_trades: true,
        notify_messages: true,
        notify_friends: true,
        profile_public: true,
        show_collection: true,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
pub struct MemoryUsers {
    pub users: Mutex<Vec<UserEntity>>,
}

impl MemoryUsers {
    pub fn with(users: Vec<UserEntity>) -> Self {
        Self { users: Mutex::new(users) }
    }
}

#[async_trait::async_trait]
impl UserRepository for MemoryUsers {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == *id && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username) && u.deleted_at.is_none())
            .cloned())
    }

    async fn create(&self, user: &InsertUser) -> Result<Uuid, error::SystemError> {
        let taken = self.users.lock().unwrap().iter().find_map(|u| {
            if u.username.eq_ignore_ascii_case(&user.username) {
                Some("users_username_key")
            } else if u.email == user.email {
                Some("users_email_key")
            } else {
                None
            }
        });
        if let Some(constraint) = taken {
            return Err(error::SystemError::Conflict(Some(error::DbErrorMeta {
                code: Some("23505".into()),
                constraint: Some(constraint.into()),
                message: "duplicate key value violates unique constraint".into(),
            })));
        }
        let mut entity = user_entity(&user.username);
        entity.email = user.email.clone();
        entity.hash_password = user.hash_password.clone();
        entity.display_name = user.display_name.clone();
        let id = entity.id;
        self.users.lock().unwrap().push(entity);
        Ok(id)
    }

    async fn update(&self, id: &Uuid, user: &UpdateUser) -> Result<UserEntity, error::SystemError> {
        let mut users = self.users.lock().unwrap();
        let entity = users
            .iter_mut()
            .find(|u| u.id == *id)
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;
        if let Some(display_name) = &user.display_name {
            entity.display_name = display_name.clone();
        }
        if let Some(bio) = &user.bio {
            entity.bio = bio.clone();
        }
        Ok(entity.clone())
    }

    async fn update_settings(
        &self,
        id: &Uuid,
        settings: &UpdateSettingsModel,
    ) -> Result<UserEntity, error::SystemError> {
        let mut users = self.users.lock().unwrap();
        let entity = users
            .iter_mut()
            .find(|u| u.id == *id)
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;
        if let Some(language) = &settings.language {
            entity.language = language.clone();
        }
        if let Some(v) = settings.notify_trades {
            entity.notify_trades = v;
        }
        if let Some(v) = settings.notify_messages {
            entity.notify_messages = v;
        }
        if let Some(v) = settings.notify_friends {
            entity.notify_friends = v;
        }
        if let Some(v) = settings.profile_public {
            entity.profile_public = v;
        }
        if let Some(v) = settings.show_collection {
            entity.show_collection = v;
        }
        Ok(entity.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == *id && u.deleted_at.is_none()) {
            Some(u) => {
                u.deleted_at = Some(chrono::Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn search_users(
        &self,
        query: &str,
        limit: i32,
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        let query = query.to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.username.to_lowercase().contains(&query))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryNotifications {
    pub rows: Mutex<Vec<NotificationEntity>>,
}

impl MemoryNotifications {
    pub fn kinds_for(&self, user_id: Uuid) -> Vec<crate::modules::notification::schema::NotificationType> {
        self.rows.lock().unwrap().iter().filter(|n| n.user_id == user_id).map(|n| n._type).collect()
    }
}

#[async_trait::async_trait]
impl NotificationRepository for MemoryNotifications {
    async fn create(&self, n: &NewNotification) -> Result<NotificationEntity, error::SystemError> {
        let entity = NotificationEntity {
            id: Uuid::now_v7(),
            user_id: n.user_id,
            _type: n.kind,
            title: n.title.clone(),
            message: n.message.clone(),
            related_id: n.related_id,
            is_read: false,
            read_at: None,
            created_at: chrono::Utc::now(),
        };
        self.rows.lock().unwrap().push(entity.clone());
        Ok(entity)
    }

    async fn find_by_user(
        &self,
        user_id: &Uuid,
        unread_only: bool,
        page: &PageQuery,
    ) -> Result<(Vec<NotificationEntity>, i64), error::SystemError> {
        let rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.user_id == *user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        let total = rows.len() as i64;
        let items =
            rows.into_iter().skip(page.offset() as usize).take(page.limit() as usize).collect();
        Ok((items, total))
    }

    async fn count_unread(&self, user_id: &Uuid) -> Result<i64, error::SystemError> {
        Ok(self.rows.lock().unwrap().iter().filter(|n| n.user_id == *user_id && !n.is_read).count()
            as i64)
    }

    async fn mark_read(
        &self,
        id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<NotificationEntity>, error::SystemError> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.iter_mut().find(|n| n.id == *id && n.user_id == *user_id).map(|n| {
            n.is_read = true;
            n.read_at.get_or_insert_with(chrono::Utc::now);
            n.clone()
        }))
    }

    async fn mark_all_read(&self, user_id: &Uuid) -> Result<u64, error::SystemError> {
        let mut rows = self.rows.lock().unwrap();
        let mut affected = 0;
        for n in rows.iter_mut().filter(|n| n.user_id == *user_id && !n.is_read) {
            n.is_read = true;
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, error::SystemError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|n| !(n.id == *id && n.user_id == *user_id));
        Ok(rows.len() < before)
    }

    async fn delete_all(&self, user_id: &Uuid) -> Result<u64, error::SystemError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|n| n.user_id != *user_id);
        Ok((before - rows.len()) as u64)
    }
}

/// Notifier backed by memory, without a websocket server.
pub fn notifier(
    users: Arc<MemoryUsers>,
) -> (NotificationService, Arc<MemoryNotifications>) {
    let store = Arc::new(MemoryNotifications::default());
    (NotificationService::with_dependencies(store.clone(), users, None), store)
}

/// A tradeable collection row.
pub fn user_card(owner_id: Uuid, quantity: i32, value: f64) -> UserCardEntity {
    let now = chrono::Utc::now();
    UserCardEntity {
        id: Uuid::now_v7(),
        user_id: owner_id,
        card_id: Uuid::now_v7(),
        condition: CardCondition::NearMint,
        quantity,
        is_for_trade: true,
        is_favorite: false,
        estimated_value: value,
        value_overridden: false,
        notes: None,
        acquired_at: now,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
struct MarketState {
    cards: Vec<UserCardEntity>,
    trades: Vec<TradeEntity>,
    items: Vec<TradeItemEntity>,
    messages: Vec<TradeMessageEntity>,
    wishlist: Vec<WishlistItemEntity>,
}

/// Collections and trades behind one lock, so completion is all-or-nothing.
#[derive(Default)]
pub struct MemoryMarket {
    state: Mutex<MarketState>,
}

impl MemoryMarket {
    pub fn with_cards(cards: Vec<UserCardEntity>) -> Self {
        Self { state: Mutex::new(MarketState { cards, ..Default::default() }) }
    }

    pub fn cards_of(&self, owner_id: Uuid) -> Vec<UserCardEntity> {
        self.state.lock().unwrap().cards.iter().filter(|c| c.user_id == owner_id).cloned().collect()
    }

    pub fn trade(&self, id: Uuid) -> Option<TradeEntity> {
        self.state.lock().unwrap().trades.iter().find(|t| t.id == id).cloned()
    }

    pub fn trade_count(&self) -> usize {
        self.state.lock().unwrap().trades.len()
    }
}

fn card_row(card: &UserCardEntity) -> UserCardRow {
    UserCardRow {
        user_card: card.clone(),
        pokemon_tcg_id: format!("test-{}", card.card_id),
        card_name: "Test Card".into(),
        set_name: "Test Set".into(),
        number: "1".into(),
        rarity: None,
        image_small: None,
        market_price: None,
    }
}

fn push_items(state: &mut MarketState, trade_id: Uuid, side: TradeSide, offer: &PricedOffer) {
    for (position, item) in offer.items.iter().enumerate() {
        state.items.push(TradeItemEntity {
            trade_id,
            side,
            position: position as i32,
            user_card_id: item.user_card_id,
            card_id: item.card_id,
            owner_id: item.owner_id,
            condition: item.condition,
            quantity: item.quantity,
            unit_value: item.unit_value,
        });
    }
}

#[async_trait::async_trait]
impl UserCardRepository for MemoryMarket {
    async fn find_user_card(&self, id: &Uuid) -> Result<Option<UserCardEntity>, error::SystemError> {
        Ok(self.state.lock().unwrap().cards.iter().find(|c| c.id == *id).cloned())
    }

    async fn find_user_card_row(&self, id: &Uuid) -> Result<Option<UserCardRow>, error::SystemError> {
        Ok(self.state.lock().unwrap().cards.iter().find(|c| c.id == *id).map(card_row))
    }

    async fn find_by_owner(
        &self,
        owner_id: &Uuid,
        filter: &CollectionFilter,
        page: &PageQuery,
    ) -> Result<(Vec<UserCardRow>, i64), error::SystemError> {
        let rows: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .cards
            .iter()
            .filter(|c| c.user_id == *owner_id)
            .filter(|c| filter.for_trade.is_none_or(|v| c.is_for_trade == v))
            .filter(|c| filter.favorite.is_none_or(|v| c.is_favorite == v))
            .map(card_row)
            .collect();
        let total = rows.len() as i64;
        let items =
            rows.into_iter().skip(page.offset() as usize).take(page.limit() as usize).collect();
        Ok((items, total))
    }

    async fn find_many_for_owner(
        &self,
        owner_id: &Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<UserCardEntity>, error::SystemError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .cards
            .iter()
            .filter(|c| c.user_id == *owner_id && ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn insert_user_card(&self, card: &NewUserCard) -> Result<UserCardEntity, error::SystemError> {
        let mut entity = user_card(card.user_id, card.quantity, card.estimated_value);
        entity.card_id = card.card_id;
        entity.condition = card.condition;
        entity.is_for_trade = card.is_for_trade;
        entity.is_favorite = card.is_favorite;
        entity.value_overridden = card.value_overridden;
        entity.notes = card.notes.clone();
        entity.acquired_at = card.acquired_at;
        self.state.lock().unwrap().cards.push(entity.clone());
        Ok(entity)
    }

    async fn update_user_card(
        &self,
        id: &Uuid,
        changes: &UserCardChanges,
    ) -> Result<UserCardEntity, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let card = state
            .cards
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or_else(|| error::SystemError::not_found("Card not found in collection"))?;
        card.quantity = changes.quantity;
        card.condition = changes.condition;
        card.is_for_trade = changes.is_for_trade;
        card.is_favorite = changes.is_favorite;
        card.estimated_value = changes.estimated_value;
        card.value_overridden = changes.value_overridden;
        card.notes = changes.notes.clone();
        Ok(card.clone())
    }

    async fn delete_user_card(&self, id: &Uuid, owner_id: &Uuid) -> Result<bool, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let before = state.cards.len();
        state.cards.retain(|c| !(c.id == *id && c.user_id == *owner_id));
        Ok(state.cards.len() < before)
    }

    async fn summary(&self, owner_id: &Uuid) -> Result<CollectionSummary, error::SystemError> {
        let state = self.state.lock().unwrap();
        let mine: Vec<_> = state.cards.iter().filter(|c| c.user_id == *owner_id).collect();
        let mut distinct: Vec<Uuid> = mine.iter().map(|c| c.card_id).collect();
        distinct.sort();
        distinct.dedup();
        Ok(CollectionSummary {
            distinct_cards: distinct.len() as i64,
            total_copies: mine.iter().map(|c| c.quantity as i64).sum(),
            for_trade_copies: mine.iter().filter(|c| c.is_for_trade).map(|c| c.quantity as i64).sum(),
            total_value: round_cents(mine.iter().map(|c| c.estimated_value * c.quantity as f64).sum()),
        })
    }
}

#[async_trait::async_trait]
impl TradeRepository for MemoryMarket {
    async fn create_trade(&self, trade: &NewTrade) -> Result<TradeEntity, error::SystemError> {
        let now = chrono::Utc::now();
        let entity = TradeEntity {
            id: Uuid::now_v7(),
            initiator_id: trade.initiator_id,
            receiver_id: trade.receiver_id,
            visibility: trade.visibility,
            status: TradeStatus::Pending,
            initiator_total_value: trade.initiator_offer.total,
            receiver_total_value: trade.receiver_offer.as_ref().map(|o| o.total),
            value_difference_percentage: trade.value_difference_percentage,
            note: trade.note.clone(),
            responded_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.lock().unwrap();
        push_items(&mut state, entity.id, TradeSide::Initiator, &trade.initiator_offer);
        if let Some(offer) = &trade.receiver_offer {
            push_items(&mut state, entity.id, TradeSide::Receiver, offer);
        }
        state.trades.push(entity.clone());
        Ok(entity)
    }

    async fn find_trade(&self, id: &Uuid) -> Result<Option<TradeEntity>, error::SystemError> {
        Ok(self.trade(*id))
    }

    async fn find_items(&self, trade_ids: &[Uuid]) -> Result<Vec<TradeItemRow>, error::SystemError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .items
            .iter()
            .filter(|i| trade_ids.contains(&i.trade_id))
            .map(|i| TradeItemRow { item: i.clone(), card_name: "Test Card".into(), image_small: None })
            .collect())
    }

    async fn find_for_user(
        &self,
        user_id: &Uuid,
        filter: &TradeFilter,
        page: &PageQuery,
    ) -> Result<(Vec<TradeEntity>, i64), error::SystemError> {
        let trades: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .trades
            .iter()
            .filter(|t| match filter.role {
                Some(TradeRole::Initiator) => t.initiator_id == *user_id,
                Some(TradeRole::Receiver) => t.receiver_id == Some(*user_id),
                None => t.is_participant(user_id),
            })
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        let total = trades.len() as i64;
        Ok((trades.into_iter().skip(page.offset() as usize).take(page.limit() as usize).collect(), total))
    }

    async fn find_open_listings(
        &self,
        viewer_id: &Uuid,
        page: &PageQuery,
    ) -> Result<(Vec<TradeEntity>, i64), error::SystemError> {
        let trades: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .trades
            .iter()
            .filter(|t| t.is_open_listing() && t.initiator_id != *viewer_id)
            .cloned()
            .collect();
        let total = trades.len() as i64;
        Ok((trades.into_iter().skip(page.offset() as usize).take(page.limit() as usize).collect(), total))
    }

    async fn attach_response(
        &self,
        trade_id: &Uuid,
        receiver_id: &Uuid,
        offer: &PricedOffer,
        value_difference_percentage: f64,
    ) -> Result<Option<TradeEntity>, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let Some(trade) = state.trades.iter_mut().find(|t| t.id == *trade_id && t.is_open_listing())
        else {
            return Ok(None);
        };
        trade.receiver_id = Some(*receiver_id);
        trade.receiver_total_value = Some(offer.total);
        trade.value_difference_percentage = Some(value_difference_percentage);
        let trade = trade.clone();
        push_items(&mut state, *trade_id, TradeSide::Receiver, offer);
        Ok(Some(trade))
    }

    async fn update_status(
        &self,
        trade_id: &Uuid,
        from: TradeStatus,
        to: TradeStatus,
    ) -> Result<Option<TradeEntity>, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.trades.iter_mut().find(|t| t.id == *trade_id && t.status == from).map(|t| {
            t.status = to;
            if matches!(to, TradeStatus::Accepted | TradeStatus::Rejected) {
                t.responded_at = Some(chrono::Utc::now());
            }
            t.clone()
        }))
    }

    async fn complete_trade_atomic(
        &self,
        trade_id: &Uuid,
        completed_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<TradeEntity, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let trade = state
            .trades
            .iter()
            .find(|t| t.id == *trade_id)
            .cloned()
            .ok_or_else(|| error::SystemError::not_found("Trade not found"))?;
        if trade.status != TradeStatus::Accepted {
            return Err(error::SystemError::state_conflict("Trade cannot be completed"));
        }
        let receiver_id =
            trade.receiver_id.ok_or_else(|| error::SystemError::state_conflict("No receiver"))?;

        let items: Vec<_> = state.items.iter().filter(|i| i.trade_id == *trade_id).cloned().collect();
        // validate everything first so a failure leaves nothing half-applied
        for item in &items {
            let ok = state.cards.iter().any(|c| {
                c.id == item.user_card_id && c.user_id == item.owner_id && c.quantity >= item.quantity
            });
            if !ok {
                return Err(error::SystemError::state_conflict("An offered card is no longer available"));
            }
        }

        for item in &items {
            let recipient = match item.side {
                TradeSide::Initiator => receiver_id,
                TradeSide::Receiver => trade.initiator_id,
            };
            if let Some(source) = state.cards.iter_mut().find(|c| c.id == item.user_card_id) {
                source.quantity -= item.quantity;
            }
            state.cards.retain(|c| c.quantity > 0);

            match state.cards.iter_mut().find(|c| {
                c.user_id == recipient && c.card_id == item.card_id && c.condition == item.condition
            }) {
                Some(existing) => existing.quantity += item.quantity,
                None => {
                    let mut card = user_card(recipient, item.quantity, item.unit_value);
                    card.card_id = item.card_id;
                    card.condition = item.condition;
                    card.is_for_trade = false;
                    state.cards.push(card);
                }
            }
        }

        let trade = state
            .trades
            .iter_mut()
            .find(|t| t.id == *trade_id)
            .ok_or_else(|| error::SystemError::not_found("Trade not found"))?;
        trade.status = TradeStatus::Completed;
        trade.completed_at = Some(completed_at.unwrap_or_else(chrono::Utc::now));
        Ok(trade.clone())
    }

    async fn add_message(
        &self,
        trade_id: &Uuid,
        sender_id: &Uuid,
        content: &str,
    ) -> Result<TradeMessageEntity, error::SystemError> {
        let message = TradeMessageEntity {
            id: Uuid::now_v7(),
            trade_id: *trade_id,
            sender_id: *sender_id,
            content: content.to_string(),
            created_at: chrono::Utc::now(),
        };
        self.state.lock().unwrap().messages.push(message.clone());
        Ok(message)
    }

    async fn find_messages(&self, trade_id: &Uuid) -> Result<Vec<TradeMessageEntity>, error::SystemError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.trade_id == *trade_id)
            .cloned()
            .collect())
    }
}

/// Block pairs as (blocker, blocked).
#[derive(Default)]
pub struct MemoryBlocks {
    pub pairs: Mutex<Vec<(Uuid, Uuid)>>,
}

impl MemoryBlocks {
    pub fn block(&self, user_id: Uuid, blocked_id: Uuid) {
        self.pairs.lock().unwrap().push((user_id, blocked_id));
    }
}

#[async_trait::async_trait]
impl BlockRepository for MemoryBlocks {
    async fn is_blocked_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<bool, error::SystemError> {
        Ok(self.pairs.lock().unwrap().iter().any(|(a, b)| {
            (a == user_id_a && b == user_id_b) || (a == user_id_b && b == user_id_a)
        }))
    }

    async fn find_blocked(&self, _user_id: &Uuid) -> Result<Vec<FriendResponse>, error::SystemError> {
        Ok(Vec::new())
    }

    async fn unblock(&self, user_id: &Uuid, blocked_id: &Uuid) -> Result<bool, error::SystemError> {
        let mut pairs = self.pairs.lock().unwrap();
        let before = pairs.len();
        pairs.retain(|(a, b)| !(a == user_id && b == blocked_id));
        Ok(pairs.len() < before)
    }
}

#[derive(Default)]
pub struct MemoryChat {
    rows: Mutex<Vec<ChatMessageEntity>>,
}

impl MemoryChat {
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

fn newest_first(mut rows: Vec<ChatMessageEntity>, query: &ChatHistoryQuery) -> Vec<ChatMessageEntity> {
    rows.retain(|m| m.expires_at > chrono::Utc::now());
    rows.retain(|m| query.before.is_none_or(|before| m.created_at < before));
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows.truncate(query.limit() as usize);
    rows
}

#[async_trait::async_trait]
impl ChatRepository for MemoryChat {
    async fn insert_message(
        &self,
        message: &NewChatMessage,
    ) -> Result<ChatMessageEntity, error::SystemError> {
        let (room_id, recipient_id) = match message.target {
            ChatTarget::Room(room_id) => (Some(room_id), None),
            ChatTarget::User(recipient_id) => (None, Some(recipient_id)),
        };
        let entity = ChatMessageEntity {
            id: Uuid::now_v7(),
            room_id,
            sender_id: message.sender_id,
            recipient_id,
            content: message.content.clone(),
            created_at: message.sent_at,
            expires_at: message.expires_at(),
        };
        self.rows.lock().unwrap().push(entity.clone());
        Ok(entity)
    }

    async fn find_room_messages(
        &self,
        room_id: &Uuid,
        query: &ChatHistoryQuery,
    ) -> Result<Vec<ChatMessageEntity>, error::SystemError> {
        let rows =
            self.rows.lock().unwrap().iter().filter(|m| m.room_id == Some(*room_id)).cloned().collect();
        Ok(newest_first(rows, query))
    }

    async fn find_private_messages(
        &self,
        user_id: &Uuid,
        other_id: &Uuid,
        query: &ChatHistoryQuery,
    ) -> Result<Vec<ChatMessageEntity>, error::SystemError> {
        let rows = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| {
                (m.sender_id == *user_id && m.recipient_id == Some(*other_id))
                    || (m.sender_id == *other_id && m.recipient_id == Some(*user_id))
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, query))
    }

    async fn delete_expired(&self) -> Result<u64, error::SystemError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        let now = chrono::Utc::now();
        rows.retain(|m| m.expires_at > now);
        Ok((before - rows.len()) as u64)
    }
}

pub fn card_entity(name: &str, market_price: Option<f64>) -> CardEntity {
    let now = chrono::Utc::now();
    CardEntity {
        id: Uuid::now_v7(),
        pokemon_tcg_id: format!("base1-{}", name.to_lowercase()),
        name: name.to_string(),
        category: CardCategory::Pokemon,
        subtypes: vec!["Basic".into()],
        set_id: "base1".into(),
        set_name: "Base".into(),
        series: "Base".into(),
        number: "4".into(),
        rarity: Some("Rare Holo".into()),
        artist: None,
        image_small: None,
        image_large: None,
        hp: Some(120),
        types: vec!["Fire".into()],
        evolves_from: None,
        attacks: Json(Vec::new()),
        abilities: Json(Vec::new()),
        weaknesses: Json(Vec::new()),
        retreat_cost: Some(3),
        rules: Vec::new(),
        market_price,
        price_currency: market_price.map(|_| "USD".into()),
        price_source: market_price.map(|_| "tcgplayer".into()),
        price_updated_at: None,
        synced_at: now,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
pub struct MemoryCards {
    pub cards: Mutex<Vec<CardEntity>>,
}

impl MemoryCards {
    pub fn with(cards: Vec<CardEntity>) -> Self {
        Self { cards: Mutex::new(cards) }
    }
}

#[async_trait::async_trait]
impl CardRepository for MemoryCards {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<CardEntity>, error::SystemError> {
        Ok(self.cards.lock().unwrap().iter().find(|c| c.id == *id).cloned())
    }

    async fn find_by_tcg_id(
        &self,
        pokemon_tcg_id: &str,
    ) -> Result<Option<CardEntity>, error::SystemError> {
        Ok(self.cards.lock().unwrap().iter().find(|c| c.pokemon_tcg_id == pokemon_tcg_id).cloned())
    }

    async fn search(
        &self,
        filter: &CardFilter,
        page: &PageQuery,
    ) -> Result<(Vec<CardEntity>, i64), error::SystemError> {
        let cards: Vec<_> = self
            .cards
            .lock()
            .unwrap()
            .iter()
            .filter(|c| {
                filter.name.as_ref().is_none_or(|n| c.name.to_lowercase().contains(&n.to_lowercase()))
            })
            .cloned()
            .collect();
        let total = cards.len() as i64;
        Ok((cards.into_iter().skip(page.offset() as usize).take(page.limit() as usize).collect(), total))
    }

    async fn find_sets(&self) -> Result<Vec<CardSetEntity>, error::SystemError> {
        Ok(Vec::new())
    }
}

#[async_trait::async_trait]
impl WishlistRepository for MemoryMarket {
    async fn add_wishlist_item(
        &self,
        user_id: &Uuid,
        card_id: &Uuid,
        priority: i16,
        max_price: Option<f64>,
        notes: &Option<String>,
    ) -> Result<WishlistItemEntity, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        if state.wishlist.iter().any(|w| w.user_id == *user_id && w.card_id == *card_id) {
            return Err(error::SystemError::Conflict(None));
        }
        let item = WishlistItemEntity {
            id: Uuid::now_v7(),
            user_id: *user_id,
            card_id: *card_id,
            priority,
            max_price,
            notes: notes.clone(),
            created_at: chrono::Utc::now(),
        };
        state.wishlist.push(item.clone());
        Ok(item)
    }

    async fn find_wishlist(&self, user_id: &Uuid) -> Result<Vec<WishlistRow>, error::SystemError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .wishlist
            .iter()
            .filter(|w| w.user_id == *user_id)
            .map(|w| WishlistRow {
                item: w.clone(),
                pokemon_tcg_id: format!("test-{}", w.card_id),
                card_name: "Test Card".into(),
                set_name: "Test Set".into(),
                number: "1".into(),
                rarity: None,
                image_small: None,
                market_price: None,
            })
            .collect())
    }

    async fn delete_wishlist_item(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let before = state.wishlist.len();
        state.wishlist.retain(|w| !(w.id == *id && w.user_id == *user_id));
        Ok(state.wishlist.len() < before)
    }

    async fn find_wishlist_matches(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<WishlistMatch>, error::SystemError> {
        let state = self.state.lock().unwrap();
        let mut matches = Vec::new();
        for wish in state.wishlist.iter().filter(|w| w.user_id == *user_id) {
            for card in state.cards.iter().filter(|c| {
                c.card_id == wish.card_id
                    && c.is_for_trade
                    && c.user_id != *user_id
                    && wish.max_price.is_none_or(|max| c.estimated_value <= max)
            }) {
                matches.push(WishlistMatch {
                    wishlist_item_id: wish.id,
                    card_id: wish.card_id,
                    card_name: "Test Card".into(),
                    user_card_id: card.id,
                    owner_id: card.user_id,
                    owner_username: String::new(),
                    owner_display_name: String::new(),
                    condition: card.condition,
                    quantity: card.quantity,
                    estimated_value: card.estimated_value,
                });
            }
        }
        Ok(matches)
    }
}

pub fn test_tokens() -> TokenSettings {
    TokenSettings { secret: "test-secret".into(), access_ttl: 900, refresh_ttl: 3600 }
}

/// Key/value cache without expiry.
#[derive(Default)]
pub struct MemoryCache {
    pub entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn keys_with_prefix(&self, prefix: &str) -> usize {
        self.entries.lock().unwrap().keys().filter(|k| k.starts_with(prefix)).count()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, error::SystemError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        _expiration: usize,
    ) -> Result<(), error::SystemError> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, error::SystemError> {
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }
}

#[derive(Default)]
struct SocialState {
    friendships: Vec<FriendEntity>,
    requests: Vec<FriendRequestEntity>,
    blocks: Vec<(Uuid, Uuid)>,
}

/// Friendships, requests and blocks; needs the user list to render responses.
pub struct MemoryFriends {
    users: Arc<MemoryUsers>,
    state: Mutex<SocialState>,
}

impl MemoryFriends {
    pub fn new(users: Arc<MemoryUsers>) -> Self {
        Self { users, state: Mutex::new(SocialState::default()) }
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    fn user(&self, id: &Uuid) -> Option<UserEntity> {
        self.users.users.lock().unwrap().iter().find(|u| u.id == *id).cloned()
    }

    fn request_response(&self, request: &FriendRequestEntity) -> FriendRequestResponse {
        let info = |id: &Uuid| match self.user(id) {
            Some(user) => IdOrInfo::Info(FriendResponse::from(user)),
            None => IdOrInfo::Id(*id),
        };
        FriendRequestResponse {
            id: request.id,
            from: info(&request.from_user_id),
            to: info(&request.to_user_id),
            message: request.message.clone(),
            created_at: request.created_at,
        }
    }
}

fn same_pair(a: &Uuid, b: &Uuid, x: &Uuid, y: &Uuid) -> bool {
    (a == x && b == y) || (a == y && b == x)
}

#[async_trait::async_trait]
impl FriendRepository for MemoryFriends {
    async fn find_friendship(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<FriendEntity>, error::SystemError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .friendships
            .iter()
            .find(|f| same_pair(&f.user_a, &f.user_b, user_id_a, user_id_b))
            .cloned())
    }

    async fn find_friends(&self, user_id: &Uuid) -> Result<Vec<FriendResponse>, error::SystemError> {
        let others: Vec<Uuid> = self
            .state
            .lock()
            .unwrap()
            .friendships
            .iter()
            .filter_map(|f| {
                if f.user_a == *user_id {
                    Some(f.user_b)
                } else if f.user_b == *user_id {
                    Some(f.user_a)
                } else {
                    None
                }
            })
            .collect();
        Ok(others.iter().filter_map(|id| self.user(id)).map(FriendResponse::from).collect())
    }

    async fn delete_friendship(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let before = state.friendships.len();
        state.friendships.retain(|f| !same_pair(&f.user_a, &f.user_b, user_id_a, user_id_b));
        Ok(state.friendships.len() < before)
    }
}

#[async_trait::async_trait]
impl FriendRequestRepository for MemoryFriends {
    async fn find_friend_request(
        &self,
        sender_id: &Uuid,
        receiver_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .requests
            .iter()
            .find(|r| same_pair(&r.from_user_id, &r.to_user_id, sender_id, receiver_id))
            .cloned())
    }

    async fn find_friend_request_by_id(
        &self,
        request_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        Ok(self.state.lock().unwrap().requests.iter().find(|r| r.id == *request_id).cloned())
    }

    async fn find_friend_request_from_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        let requests: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.from_user_id == *user_id)
            .cloned()
            .collect();
        Ok(requests.iter().map(|r| self.request_response(r)).collect())
    }

    async fn find_friend_request_to_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        let requests: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.to_user_id == *user_id)
            .cloned()
            .collect();
        Ok(requests.iter().map(|r| self.request_response(r)).collect())
    }

    async fn create_friend_request(
        &self,
        sender_id: &Uuid,
        receiver_id: &Uuid,
        message: &Option<String>,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        let request = FriendRequestEntity {
            id: Uuid::now_v7(),
            from_user_id: *sender_id,
            to_user_id: *receiver_id,
            message: message.clone(),
            created_at: chrono::Utc::now(),
        };
        self.state.lock().unwrap().requests.push(request.clone());
        Ok(request)
    }

    async fn delete_friend_request(&self, request_id: &Uuid) -> Result<(), error::SystemError> {
        self.state.lock().unwrap().requests.retain(|r| r.id != *request_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl BlockRepository for MemoryFriends {
    async fn is_blocked_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<bool, error::SystemError> {
        Ok(self.state.lock().unwrap().blocks.iter().any(|(a, b)| same_pair(a, b, user_id_a, user_id_b)))
    }

    async fn find_blocked(&self, user_id: &Uuid) -> Result<Vec<FriendResponse>, error::SystemError> {
        let blocked: Vec<Uuid> = self
            .state
            .lock()
            .unwrap()
            .blocks
            .iter()
            .filter(|(a, _)| a == user_id)
            .map(|(_, b)| *b)
            .collect();
        Ok(blocked.iter().filter_map(|id| self.user(id)).map(FriendResponse::from).collect())
    }

    async fn unblock(&self, user_id: &Uuid, blocked_id: &Uuid) -> Result<bool, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let before = state.blocks.len();
        state.blocks.retain(|(a, b)| !(a == user_id && b == blocked_id));
        Ok(state.blocks.len() < before)
    }
}

#[async_trait::async_trait]
impl FriendRepo for MemoryFriends {
    async fn accept_friend_request_atomic(
        &self,
        request_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Uuid, error::SystemError> {
        let mut state = self.state.lock().unwrap();
        let request = state
            .requests
            .iter()
            .find(|r| r.id == *request_id && r.to_user_id == *user_id)
            .cloned()
            .ok_or_else(|| error::SystemError::not_found("Friend request not found"))?;
        let (user_a, user_b) = if request.from_user_id < request.to_user_id {
            (request.from_user_id, request.to_user_id)
        } else {
            (request.to_user_id, request.from_user_id)
        };
        state.friendships.push(FriendEntity { user_a, user_b, created_at: chrono::Utc::now() });
        state.requests.retain(|r| r.id != *request_id);
        Ok(request.from_user_id)
    }

    async fn block_user_atomic(
        &self,
        user_id: &Uuid,
        blocked_id: &Uuid,
    ) -> Result<(), error::SystemError> {
        let mut state = self.state.lock().unwrap();
        state.friendships.retain(|f| !same_pair(&f.user_a, &f.user_b, user_id, blocked_id));
        state.requests.retain(|r| !same_pair(&r.from_user_id, &r.to_user_id, user_id, blocked_id));
        if !state.blocks.contains(&(*user_id, *blocked_id)) {
            state.blocks.push((*user_id, *blocked_id));
        }
        Ok(())
    }
}
