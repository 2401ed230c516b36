use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "card_condition", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CardCondition {
    Mint,
    #[default]
    NearMint,
    Excellent,
    Good,
    LightPlayed,
    Played,
    Poor,
}

impl CardCondition {
    /// Share of the market price a copy in this condition is worth.
    pub fn multiplier(&self) -> f64 {
        match self {
            CardCondition::Mint => 1.0,
            CardCondition::NearMint => 0.9,
            CardCondition::Excellent => 0.8,
            CardCondition::Good => 0.65,
            CardCondition::LightPlayed => 0.5,
            CardCondition::Played => 0.35,
            CardCondition::Poor => 0.2,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserCardEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub card_id: Uuid,
    pub condition: CardCondition,
    pub quantity: i32,
    pub is_for_trade: bool,
    pub is_favorite: bool,
    pub estimated_value: f64,
    pub value_overridden: bool,
    pub notes: Option<String>,
    pub acquired_at: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct WishlistItemEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub card_id: Uuid,
    pub priority: i16,
    pub max_price: Option<f64>,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
