use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

use crate::modules::collection::schema::CardCondition;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "trade_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl TradeStatus {
    /// Allowed lifecycle moves. Everything else is refused.
    pub fn can_transition_to(self, next: TradeStatus) -> bool {
        use TradeStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Accepted, Completed)
                | (Accepted, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Accepted => "accepted",
            TradeStatus::Rejected => "rejected",
            TradeStatus::Completed => "completed",
            TradeStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "trade_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TradeVisibility {
    #[default]
    Private,
    Public,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "trade_side", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Initiator,
    Receiver,
}

#[derive(Debug, Clone, FromRow)]
pub struct TradeEntity {
    pub id: Uuid,
    pub initiator_id: Uuid,
    pub receiver_id: Option<Uuid>,
    pub visibility: TradeVisibility,
    pub status: TradeStatus,
    pub initiator_total_value: f64,
    pub receiver_total_value: Option<f64>,
    pub value_difference_percentage: Option<f64>,
    pub note: Option<String>,
    pub responded_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl TradeEntity {
    pub fn is_participant(&self, user_id: &Uuid) -> bool {
        self.initiator_id == *user_id || self.receiver_id.as_ref() == Some(user_id)
    }

    /// A public listing nobody has answered yet.
    pub fn is_open_listing(&self) -> bool {
        self.visibility == TradeVisibility::Public
            && self.status == TradeStatus::Pending
            && self.receiver_id.is_none()
    }

    /// Who accepts or rejects: the receiver of a private offer, the
    /// initiator once a public listing has a response.
    pub fn deciding_party(&self) -> Option<Uuid> {
        match self.visibility {
            TradeVisibility::Private => self.receiver_id,
            TradeVisibility::Public => self.receiver_id.map(|_| self.initiator_id),
        }
    }

    pub fn counterpart(&self, user_id: &Uuid) -> Option<Uuid> {
        if self.initiator_id == *user_id {
            self.receiver_id
        } else if self.receiver_id.as_ref() == Some(user_id) {
            Some(self.initiator_id)
        } else {
            None
        }
    }

    pub fn participants(&self) -> Vec<Uuid> {
        std::iter::once(self.initiator_id).chain(self.receiver_id).collect()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TradeItemEntity {
    pub trade_id: Uuid,
    pub side: TradeSide,
    pub position: i32,
    pub user_card_id: Uuid,
    pub card_id: Uuid,
    pub owner_id: Uuid,
    pub condition: CardCondition,
    pub quantity: i32,
    pub unit_value: f64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeMessageEntity {
    pub id: Uuid,
    pub trade_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
