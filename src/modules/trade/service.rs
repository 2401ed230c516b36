use std::sync::Arc;
use uuid::Uuid;

use crate::api::{
    error,
    pagination::{Page, PageQuery},
};
use crate::modules::collection::repository::UserCardRepository;
use crate::modules::friend::repository::BlockRepository;
use crate::modules::notification::{
    model::NewNotification, schema::NotificationType, service::NotificationService,
};
use crate::modules::trade::{
    model::{
        CreateTradeModel, NewTrade, OfferedCardModel, PricedOffer, RespondTradeModel,
        TradeFilter, TradeMessageResponse, TradePatchModel, TradeQuery, TradeResponse,
        check_value_parity,
    },
    repository::TradeRepository,
    schema::{TradeEntity, TradeStatus, TradeVisibility},
};
use crate::modules::user::repository::UserRepository;
use crate::modules::websocket::message::ServerMessage;

const MAX_MESSAGE_LENGTH: usize = 1000;

#[derive(Clone)]
pub struct TradeService<R, C>
where
    R: TradeRepository + Send + Sync,
    C: UserCardRepository + Send + Sync,
{
    trade_repo: Arc<R>,
    collection_repo: Arc<C>,
    users: Arc<dyn UserRepository + Send + Sync>,
    blocks: Arc<dyn BlockRepository + Send + Sync>,
    notifier: NotificationService,
}

impl<R, C> TradeService<R, C>
where
    R: TradeRepository + Send + Sync,
    C: UserCardRepository + Send + Sync,
{
    pub fn with_dependencies(
        trade_repo: Arc<R>,
        collection_repo: Arc<C>,
        users: Arc<dyn UserRepository + Send + Sync>,
        blocks: Arc<dyn BlockRepository + Send + Sync>,
        notifier: NotificationService,
    ) -> Self {
        TradeService { trade_repo, collection_repo, users, blocks, notifier }
    }

    async fn price_offer(
        &self,
        owner_id: Uuid,
        offered: &[OfferedCardModel],
    ) -> Result<PricedOffer, error::SystemError> {
        let ids: Vec<Uuid> = offered.iter().map(|o| o.user_card_id).collect();
        let owned = self.collection_repo.find_many_for_owner(&owner_id, &ids).await?;
        PricedOffer::build(owner_id, offered, &owned).map_err(error::SystemError::bad_request)
    }

    async fn load_trade(&self, trade_id: Uuid) -> Result<TradeEntity, error::SystemError> {
        self.trade_repo
            .find_trade(&trade_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Trade not found"))
    }

    async fn load_participant_trade(
        &self,
        user_id: Uuid,
        trade_id: Uuid,
    ) -> Result<TradeEntity, error::SystemError> {
        let trade = self.load_trade(trade_id).await?;
        if !trade.is_participant(&user_id) {
            return Err(error::SystemError::forbidden("You are not a participant of this trade"));
        }
        Ok(trade)
    }

    async fn respond_with(&self, trade: TradeEntity) -> Result<TradeResponse, error::SystemError> {
        let items = self.trade_repo.find_items(&[trade.id]).await?;
        Ok(TradeResponse::assemble(trade, &items))
    }

    async fn page_of(
        &self,
        trades: Vec<TradeEntity>,
        page: &PageQuery,
        total: i64,
    ) -> Result<Page<TradeResponse>, error::SystemError> {
        let ids: Vec<Uuid> = trades.iter().map(|t| t.id).collect();
        let items = self.trade_repo.find_items(&ids).await?;
        Ok(Page::new(trades, page, total).map(|t| TradeResponse::assemble(t, &items)))
    }

    fn push_update(&self, trade: &TradeEntity, updated_by: Uuid) {
        self.notifier.push_to_users(
            trade.participants(),
            ServerMessage::TradeUpdated {
                trade_id: trade.id,
                status: trade.status.as_str().to_string(),
                updated_by,
            },
        );
    }

    pub async fn create_trade(
        &self,
        initiator_id: Uuid,
        model: CreateTradeModel,
    ) -> Result<TradeResponse, error::SystemError> {
        let (receiver_id, receiver_offer, pct, initiator_offer) = match model.visibility {
            TradeVisibility::Private => {
                let receiver_id = model.receiver_id.ok_or_else(|| {
                    error::SystemError::bad_request("A private trade needs a receiver")
                })?;
                if receiver_id == initiator_id {
                    return Err(error::SystemError::bad_request("Cannot trade with yourself"));
                }
                if model.receiver_cards.is_empty() {
                    return Err(error::SystemError::bad_request(
                        "A private trade needs cards from the receiver",
                    ));
                }
                if self.users.find_by_id(&receiver_id).await?.is_none() {
                    return Err(error::SystemError::not_found("Receiver not found"));
                }
                if self.blocks.is_blocked_between(&initiator_id, &receiver_id).await? {
                    return Err(error::SystemError::forbidden("You cannot trade with this user"));
                }

                let initiator_offer = self.price_offer(initiator_id, &model.initiator_cards).await?;
                let receiver_offer = self.price_offer(receiver_id, &model.receiver_cards).await?;
                let pct = check_value_parity(initiator_offer.total, receiver_offer.total)
                    .map_err(error::SystemError::bad_request)?;

                (Some(receiver_id), Some(receiver_offer), Some(pct), initiator_offer)
            }
            TradeVisibility::Public => {
                if model.receiver_id.is_some() || !model.receiver_cards.is_empty() {
                    return Err(error::SystemError::bad_request(
                        "A public listing only carries the initiator's cards",
                    ));
                }
                let initiator_offer = self.price_offer(initiator_id, &model.initiator_cards).await?;
                (None, None, None, initiator_offer)
            }
        };

        let trade = self
            .trade_repo
            .create_trade(&NewTrade {
                initiator_id,
                receiver_id,
                visibility: model.visibility,
                initiator_offer,
                receiver_offer,
                value_difference_percentage: pct,
                note: model.note,
            })
            .await?;

        log::info!("Trade {} created by {} ({:?})", trade.id, initiator_id, trade.visibility);

        if let Some(receiver_id) = trade.receiver_id {
            self.notifier
                .notify_quietly(
                    NewNotification::new(
                        receiver_id,
                        NotificationType::TradeRequest,
                        "New trade offer",
                        "You received a new trade offer",
                    )
                    .related_to(trade.id),
                )
                .await;
            self.push_update(&trade, initiator_id);
        }

        self.respond_with(trade).await
    }

    pub async fn list_trades(
        &self,
        user_id: Uuid,
        query: TradeQuery,
    ) -> Result<Page<TradeResponse>, error::SystemError> {
        let page = PageQuery::new(query.page, query.limit);
        let filter = TradeFilter { status: query.status, role: query.role };
        let (trades, total) = self.trade_repo.find_for_user(&user_id, &filter, &page).await?;
        self.page_of(trades, &page, total).await
    }

    pub async fn list_public(
        &self,
        viewer_id: Uuid,
        page: PageQuery,
    ) -> Result<Page<TradeResponse>, error::SystemError> {
        let (trades, total) = self.trade_repo.find_open_listings(&viewer_id, &page).await?;
        self.page_of(trades, &page, total).await
    }

    pub async fn get_trade(
        &self,
        viewer_id: Uuid,
        trade_id: Uuid,
    ) -> Result<TradeResponse, error::SystemError> {
        let trade = self.load_trade(trade_id).await?;
        if !trade.is_participant(&viewer_id) && !trade.is_open_listing() {
            return Err(error::SystemError::forbidden("You are not a participant of this trade"));
        }
        self.respond_with(trade).await
    }

    /// Answers an open public listing; the responder becomes the receiver.
    pub async fn respond_to_listing(
        &self,
        responder_id: Uuid,
        trade_id: Uuid,
        model: RespondTradeModel,
    ) -> Result<TradeResponse, error::SystemError> {
        let trade = self.load_trade(trade_id).await?;
        if trade.initiator_id == responder_id {
            return Err(error::SystemError::bad_request("Cannot respond to your own listing"));
        }
        if !trade.is_open_listing() {
            return Err(error::SystemError::state_conflict("This listing is no longer open"));
        }
        if self.blocks.is_blocked_between(&trade.initiator_id, &responder_id).await? {
            return Err(error::SystemError::forbidden("You cannot trade with this user"));
        }

        let offer = self.price_offer(responder_id, &model.cards).await?;
        let pct = check_value_parity(trade.initiator_total_value, offer.total)
            .map_err(error::SystemError::bad_request)?;

        let trade = self
            .trade_repo
            .attach_response(&trade_id, &responder_id, &offer, pct)
            .await?
            .ok_or_else(|| error::SystemError::state_conflict("This listing is no longer open"))?;

        self.notifier
            .notify_quietly(
                NewNotification::new(
                    trade.initiator_id,
                    NotificationType::TradeResponse,
                    "New response to your listing",
                    "Someone answered your public trade listing",
                )
                .related_to(trade.id),
            )
            .await;
        self.push_update(&trade, responder_id);

        self.respond_with(trade).await
    }

    /// Runs one lifecycle step for `user_id`.
    pub async fn transition(
        &self,
        user_id: Uuid,
        trade_id: Uuid,
        next: TradeStatus,
        completed_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<TradeResponse, error::SystemError> {
        let trade = self.load_participant_trade(user_id, trade_id).await?;

        if !trade.status.can_transition_to(next) {
            return Err(error::SystemError::bad_request(format!(
                "Cannot move a {} trade to {}",
                trade.status.as_str(),
                next.as_str()
            )));
        }

        if matches!(next, TradeStatus::Accepted | TradeStatus::Rejected) {
            match trade.deciding_party() {
                None => {
                    return Err(error::SystemError::bad_request(
                        "This listing has no response to decide on yet",
                    ));
                }
                Some(decider) if decider != user_id => {
                    return Err(error::SystemError::forbidden(
                        "Only the other party can accept or reject this trade",
                    ));
                }
                Some(_) => {}
            }
        }

        let updated = match next {
            TradeStatus::Completed => {
                self.trade_repo.complete_trade_atomic(&trade_id, completed_at).await?
            }
            _ => self
                .trade_repo
                .update_status(&trade_id, trade.status, next)
                .await?
                .ok_or_else(|| error::SystemError::state_conflict("Trade was changed concurrently"))?,
        };

        log::info!("Trade {} moved to {} by {}", trade_id, next.as_str(), user_id);

        if let Some(other) = updated.counterpart(&user_id) {
            let (kind, title) = match next {
                TradeStatus::Accepted => (NotificationType::TradeAccepted, "Trade accepted"),
                TradeStatus::Rejected => (NotificationType::TradeRejected, "Trade rejected"),
                TradeStatus::Cancelled => (NotificationType::TradeCancelled, "Trade cancelled"),
                TradeStatus::Completed => (NotificationType::TradeCompleted, "Trade completed"),
                TradeStatus::Pending => (NotificationType::TradeResponse, "Trade updated"),
            };
            self.notifier
                .notify_quietly(
                    NewNotification::new(
                        other,
                        kind,
                        title,
                        format!("Your trade is now {}", next.as_str()),
                    )
                    .related_to(trade_id),
                )
                .await;
        }
        self.push_update(&updated, user_id);

        self.respond_with(updated).await
    }

    /// PATCH: `status` runs the normal transition, then `messages` are appended.
    pub async fn patch_trade(
        &self,
        user_id: Uuid,
        trade_id: Uuid,
        patch: TradePatchModel,
    ) -> Result<TradeResponse, error::SystemError> {
        if patch.completed_at.is_some() && patch.status != Some(TradeStatus::Completed) {
            return Err(error::SystemError::bad_request(
                "completedAt can only be set together with status completed",
            ));
        }

        let messages = patch.messages.unwrap_or_default();
        for content in &messages {
            validate_message(content)?;
        }

        let trade = self.load_participant_trade(user_id, trade_id).await?;
        if patch.status.is_none() && messages.is_empty() {
            return self.respond_with(trade).await;
        }

        // messages are only kept once the status change went through
        if let Some(next) = patch.status {
            let moved = self.transition(user_id, trade_id, next, patch.completed_at).await?;
            if messages.is_empty() {
                return Ok(moved);
            }
        }

        for content in &messages {
            self.post_message(&trade, user_id, content).await?;
        }
        self.respond_with(self.load_trade(trade_id).await?).await
    }

    async fn post_message(
        &self,
        trade: &TradeEntity,
        sender_id: Uuid,
        content: &str,
    ) -> Result<TradeMessageResponse, error::SystemError> {
        let message = self.trade_repo.add_message(&trade.id, &sender_id, content.trim()).await?;

        if let Some(other) = trade.counterpart(&sender_id) {
            self.notifier
                .notify_quietly(
                    NewNotification::new(
                        other,
                        NotificationType::TradeMessage,
                        "New trade message",
                        content.trim().chars().take(120).collect::<String>(),
                    )
                    .related_to(trade.id),
                )
                .await;
        }
        Ok(message)
    }

    pub async fn add_message(
        &self,
        sender_id: Uuid,
        trade_id: Uuid,
        content: String,
    ) -> Result<TradeMessageResponse, error::SystemError> {
        validate_message(&content)?;
        let trade = self.load_participant_trade(sender_id, trade_id).await?;
        self.post_message(&trade, sender_id, &content).await
    }

    pub async fn get_messages(
        &self,
        user_id: Uuid,
        trade_id: Uuid,
    ) -> Result<Vec<TradeMessageResponse>, error::SystemError> {
        self.load_participant_trade(user_id, trade_id).await?;
        self.trade_repo.find_messages(&trade_id).await
    }
}

fn validate_message(content: &str) -> Result<(), error::SystemError> {
    let len = content.trim().chars().count();
    if len == 0 || len > MAX_MESSAGE_LENGTH {
        return Err(error::SystemError::bad_request("Message must be 1-1000 characters"));
    }
    Ok(())
}
