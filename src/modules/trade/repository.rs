use uuid::Uuid;

use crate::api::{error, pagination::PageQuery};
use crate::modules::trade::{
    model::{NewTrade, PricedOffer, TradeFilter, TradeItemRow},
    schema::{TradeEntity, TradeMessageEntity, TradeStatus},
};

#[async_trait::async_trait]
pub trait TradeRepository {
    /// Inserts the trade with both sides' items.
    async fn create_trade(&self, trade: &NewTrade) -> Result<TradeEntity, error::SystemError>;

    async fn find_trade(&self, id: &Uuid) -> Result<Option<TradeEntity>, error::SystemError>;

    async fn find_items(&self, trade_ids: &[Uuid]) -> Result<Vec<TradeItemRow>, error::SystemError>;

    async fn find_for_user(
        &self,
        user_id: &Uuid,
        filter: &TradeFilter,
        page: &PageQuery,
    ) -> Result<(Vec<TradeEntity>, i64), error::SystemError>;

    /// Open public listings not created by, and not blocked with, `viewer_id`.
    async fn find_open_listings(
        &self,
        viewer_id: &Uuid,
        page: &PageQuery,
    ) -> Result<(Vec<TradeEntity>, i64), error::SystemError>;

    /// Attaches a responder to an open listing. `None` when the listing was
    /// answered or closed in the meantime.
    async fn attach_response(
        &self,
        trade_id: &Uuid,
        receiver_id: &Uuid,
        offer: &PricedOffer,
        value_difference_percentage: f64,
    ) -> Result<Option<TradeEntity>, error::SystemError>;

    /// Moves the trade from `from` to `to`. `None` when the status changed underneath.
    async fn update_status(
        &self,
        trade_id: &Uuid,
        from: TradeStatus,
        to: TradeStatus,
    ) -> Result<Option<TradeEntity>, error::SystemError>;

    /// Transfers every offered card to the other side and marks the trade
    /// completed, all in one transaction.
    async fn complete_trade_atomic(
        &self,
        trade_id: &Uuid,
        completed_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<TradeEntity, error::SystemError>;

    async fn add_message(
        &self,
        trade_id: &Uuid,
        sender_id: &Uuid,
        content: &str,
    ) -> Result<TradeMessageEntity, error::SystemError>;

    async fn find_messages(&self, trade_id: &Uuid) -> Result<Vec<TradeMessageEntity>, error::SystemError>;
}
