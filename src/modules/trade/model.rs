use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use crate::constants::MAX_VALUE_DIFFERENCE_PERCENT;
use crate::modules::collection::schema::{CardCondition, UserCardEntity};
use crate::modules::trade::schema::{
    TradeEntity, TradeItemEntity, TradeMessageEntity, TradeSide, TradeStatus, TradeVisibility,
};
use crate::utils::round_cents;

/// `|I - R| / max(I, R) * 100`, zero when both sides are worth nothing.
pub fn value_difference_percentage(initiator_total: f64, receiver_total: f64) -> f64 {
    let max = initiator_total.max(receiver_total);
    if max <= 0.0 {
        return 0.0;
    }
    (initiator_total - receiver_total).abs() / max * 100.0
}

/// Percentage for two totals, or an error message when they are too far apart.
/// The limit is checked on the cent-rounded percentage that gets stored.
pub fn check_value_parity(initiator_total: f64, receiver_total: f64) -> Result<f64, String> {
    let pct = round_cents(value_difference_percentage(initiator_total, receiver_total));
    if pct > MAX_VALUE_DIFFERENCE_PERCENT {
        return Err(format!(
            "Trade values differ by {:.2}%, the maximum allowed is {}%",
            pct, MAX_VALUE_DIFFERENCE_PERCENT
        ));
    }
    Ok(pct)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferedCardModel {
    pub user_card_id: Uuid,
    pub quantity: Option<i32>,
}

impl OfferedCardModel {
    pub fn quantity(&self) -> i32 {
        self.quantity.unwrap_or(1)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTradeModel {
    #[serde(default)]
    pub visibility: TradeVisibility,
    pub receiver_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Offer at least one card"))]
    pub initiator_cards: Vec<OfferedCardModel>,
    #[serde(default)]
    pub receiver_cards: Vec<OfferedCardModel>,
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RespondTradeModel {
    #[validate(length(min = 1, message = "Offer at least one card"))]
    pub cards: Vec<OfferedCardModel>,
}

/// The only fields a trade accepts through PATCH.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TradePatchModel {
    pub status: Option<TradeStatus>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[validate(length(max = 20, message = "At most 20 messages per request"))]
    pub messages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TradeMessageModel {
    #[validate(length(min = 1, max = 1000, message = "Message must be 1-1000 characters"))]
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeRole {
    Initiator,
    Receiver,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TradeQuery {
    pub status: Option<TradeStatus>,
    pub role: Option<TradeRole>,
    #[validate(range(min = 1, max = 100000, message = "Page must be between 1 and 100000"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TradeFilter {
    pub status: Option<TradeStatus>,
    pub role: Option<TradeRole>,
}

/// One side of an offer, priced from the owner's collection.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeItemDraft {
    pub user_card_id: Uuid,
    pub card_id: Uuid,
    pub owner_id: Uuid,
    pub condition: CardCondition,
    pub quantity: i32,
    pub unit_value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PricedOffer {
    pub items: Vec<TradeItemDraft>,
    pub total: f64,
}

impl PricedOffer {
    /// Checks every offered card against the owner's rows and prices it.
    pub fn build(
        owner_id: Uuid,
        offered: &[OfferedCardModel],
        owned: &[UserCardEntity],
    ) -> Result<Self, String> {
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(offered.len());

        for offer in offered {
            if !seen.insert(offer.user_card_id) {
                return Err(format!("Card {} is offered more than once", offer.user_card_id));
            }

            let card = owned
                .iter()
                .find(|c| c.id == offer.user_card_id && c.user_id == owner_id)
                .ok_or_else(|| format!("Card {} is not in the owner's collection", offer.user_card_id))?;

            if !card.is_for_trade {
                return Err(format!("Card {} is not available for trade", card.id));
            }

            let quantity = offer.quantity();
            if quantity < 1 {
                return Err("Offered quantity must be at least 1".into());
            }
            if quantity > card.quantity {
                return Err(format!(
                    "Card {} has only {} copies available",
                    card.id, card.quantity
                ));
            }

            items.push(TradeItemDraft {
                user_card_id: card.id,
                card_id: card.card_id,
                owner_id,
                condition: card.condition,
                quantity,
                unit_value: card.estimated_value,
            });
        }

        let total = round_cents(items.iter().map(|i| i.unit_value * i.quantity as f64).sum());
        Ok(PricedOffer { items, total })
    }
}

pub struct NewTrade {
    pub initiator_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub visibility: TradeVisibility,
    pub initiator_offer: PricedOffer,
    pub receiver_offer: Option<PricedOffer>,
    pub value_difference_percentage: Option<f64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TradeItemRow {
    #[sqlx(flatten)]
    pub item: TradeItemEntity,
    pub card_name: String,
    pub image_small: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeItemResponse {
    pub user_card_id: Uuid,
    pub card_id: Uuid,
    pub card_name: String,
    pub image_small: Option<String>,
    pub condition: CardCondition,
    pub quantity: i32,
    pub unit_value: f64,
    pub position: i32,
}

impl From<TradeItemRow> for TradeItemResponse {
    fn from(row: TradeItemRow) -> Self {
        TradeItemResponse {
            user_card_id: row.item.user_card_id,
            card_id: row.item.card_id,
            card_name: row.card_name,
            image_small: row.image_small,
            condition: row.item.condition,
            quantity: row.item.quantity,
            unit_value: row.item.unit_value,
            position: row.item.position,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResponse {
    pub id: Uuid,
    pub initiator_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub visibility: TradeVisibility,
    pub status: TradeStatus,
    pub initiator_cards: Vec<TradeItemResponse>,
    pub receiver_cards: Vec<TradeItemResponse>,
    pub initiator_total_value: f64,
    pub receiver_total_value: Option<f64>,
    pub value_difference_percentage: Option<f64>,
    pub note: Option<String>,
    pub responded_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl TradeResponse {
    /// Builds the response from the trade and its items; items of other trades are ignored.
    pub fn assemble(trade: TradeEntity, items: &[TradeItemRow]) -> Self {
        let mut mine: Vec<&TradeItemRow> = items.iter().filter(|r| r.item.trade_id == trade.id).collect();
        mine.sort_by_key(|r| r.item.position);

        let side = |side: TradeSide| {
            mine.iter()
                .filter(|r| r.item.side == side)
                .map(|r| TradeItemResponse::from((*r).clone()))
                .collect::<Vec<_>>()
        };

        TradeResponse {
            id: trade.id,
            initiator_id: trade.initiator_id,
            receiver_id: trade.receiver_id,
            visibility: trade.visibility,
            status: trade.status,
            initiator_cards: side(TradeSide::Initiator),
            receiver_cards: side(TradeSide::Receiver),
            initiator_total_value: trade.initiator_total_value,
            receiver_total_value: trade.receiver_total_value,
            value_difference_percentage: trade.value_difference_percentage,
            note: trade.note,
            responded_at: trade.responded_at,
            completed_at: trade.completed_at,
            created_at: trade.created_at,
            updated_at: trade.updated_at,
        }
    }
}

pub type TradeMessageResponse = TradeMessageEntity;
