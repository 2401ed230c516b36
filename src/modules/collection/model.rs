use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::card::model::CardSummary;
use crate::modules::collection::schema::{CardCondition, UserCardEntity, WishlistItemEntity};
use crate::utils::{double_option, round_cents};

/// Catalog price scaled by condition, in cents precision. Unpriced cards are worth 0.
pub fn estimate_value(market_price: Option<f64>, condition: CardCondition) -> f64 {
    match market_price {
        Some(price) if price.is_finite() && price > 0.0 => {
            round_cents(price * condition.multiplier())
        }
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddUserCardModel {
    pub card_id: Uuid,
    pub condition: Option<CardCondition>,
    #[validate(range(min = 1, max = 9999, message = "Quantity must be between 1 and 9999"))]
    pub quantity: Option<i32>,
    pub is_for_trade: Option<bool>,
    pub is_favorite: Option<bool>,
    #[validate(range(min = 0.0, message = "Estimated value cannot be negative"))]
    pub estimated_value: Option<f64>,
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
    pub acquired_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserCardModel {
    #[validate(range(min = 1, max = 9999, message = "Quantity must be between 1 and 9999"))]
    pub quantity: Option<i32>,
    pub condition: Option<CardCondition>,
    pub is_for_trade: Option<bool>,
    pub is_favorite: Option<bool>,
    /// `null` drops the override and goes back to the computed value.
    #[serde(default, deserialize_with = "double_option")]
    pub estimated_value: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<Option<String>>,
}

impl UpdateUserCardModel {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.condition.is_none()
            && self.is_for_trade.is_none()
            && self.is_favorite.is_none()
            && self.estimated_value.is_none()
            && self.notes.is_none()
    }
}

pub struct NewUserCard {
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
}

/// Fully resolved row state written back by an update.
#[derive(Debug, Clone, PartialEq)]
pub struct UserCardChanges {
    pub quantity: i32,
    pub condition: CardCondition,
    pub is_for_trade: bool,
    pub is_favorite: bool,
    pub estimated_value: f64,
    pub value_overridden: bool,
    pub notes: Option<String>,
}

impl UserCardChanges {
    /// Applies a patch on top of the current row. Without an override the
    /// value follows the condition.
    pub fn resolve(
        current: &UserCardEntity,
        patch: UpdateUserCardModel,
        market_price: Option<f64>,
    ) -> Result<Self, &'static str> {
        let condition = patch.condition.unwrap_or(current.condition);

        let (estimated_value, value_overridden) = match patch.estimated_value {
            Some(Some(value)) if !value.is_finite() || value < 0.0 => {
                return Err("Estimated value cannot be negative");
            }
            Some(Some(value)) => (round_cents(value), true),
            Some(None) => (estimate_value(market_price, condition), false),
            None if current.value_overridden => (current.estimated_value, true),
            None if condition != current.condition => (estimate_value(market_price, condition), false),
            None => (current.estimated_value, false),
        };

        Ok(UserCardChanges {
            quantity: patch.quantity.unwrap_or(current.quantity),
            condition,
            is_for_trade: patch.is_for_trade.unwrap_or(current.is_for_trade),
            is_favorite: patch.is_favorite.unwrap_or(current.is_favorite),
            estimated_value,
            value_overridden,
            notes: match patch.notes {
                Some(notes) => notes,
                None => current.notes.clone(),
            },
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CollectionQuery {
    pub for_trade: Option<bool>,
    pub favorite: Option<bool>,
    #[validate(range(min = 1, max = 100000, message = "Page must be between 1 and 100000"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionFilter {
    pub for_trade: Option<bool>,
    pub favorite: Option<bool>,
}

/// A user card joined with its catalog entry.
#[derive(Debug, Clone, FromRow)]
pub struct UserCardRow {
    #[sqlx(flatten)]
    pub user_card: UserCardEntity,
    pub pokemon_tcg_id: String,
    pub card_name: String,
    pub set_name: String,
    pub number: String,
    pub rarity: Option<String>,
    pub image_small: Option<String>,
    pub market_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCardResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub card: CardSummary,
    pub condition: CardCondition,
    pub quantity: i32,
    pub is_for_trade: bool,
    pub is_favorite: bool,
    pub estimated_value: f64,
    pub value_overridden: bool,
    pub total_value: f64,
    pub notes: Option<String>,
    pub acquired_at: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<UserCardRow> for UserCardResponse {
    fn from(row: UserCardRow) -> Self {
        let uc = row.user_card;
        UserCardResponse {
            id: uc.id,
            owner_id: uc.user_id,
            card: CardSummary {
                id: uc.card_id,
                pokemon_tcg_id: row.pokemon_tcg_id,
                name: row.card_name,
                set_name: row.set_name,
                number: row.number,
                rarity: row.rarity,
                image_small: row.image_small,
                market_price: row.market_price,
            },
            condition: uc.condition,
            quantity: uc.quantity,
            is_for_trade: uc.is_for_trade,
            is_favorite: uc.is_favorite,
            estimated_value: uc.estimated_value,
            value_overridden: uc.value_overridden,
            total_value: round_cents(uc.estimated_value * uc.quantity as f64),
            notes: uc.notes,
            acquired_at: uc.acquired_at,
            created_at: uc.created_at,
            updated_at: uc.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub distinct_cards: i64,
    pub total_copies: i64,
    pub for_trade_copies: i64,
    pub total_value: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddWishlistModel {
    pub card_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "Priority must be between 1 and 5"))]
    pub priority: Option<i16>,
    #[validate(range(min = 0.0, message = "Max price cannot be negative"))]
    pub max_price: Option<f64>,
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct WishlistRow {
    #[sqlx(flatten)]
    pub item: WishlistItemEntity,
    pub pokemon_tcg_id: String,
    pub card_name: String,
    pub set_name: String,
    pub number: String,
    pub rarity: Option<String>,
    pub image_small: Option<String>,
    pub market_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItemResponse {
    pub id: Uuid,
    pub card: CardSummary,
    pub priority: i16,
    pub max_price: Option<f64>,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<WishlistRow> for WishlistItemResponse {
    fn from(row: WishlistRow) -> Self {
        WishlistItemResponse {
            id: row.item.id,
            card: CardSummary {
                id: row.item.card_id,
                pokemon_tcg_id: row.pokemon_tcg_id,
                name: row.card_name,
                set_name: row.set_name,
                number: row.number,
                rarity: row.rarity,
                image_small: row.image_small,
                market_price: row.market_price,
            },
            priority: row.item.priority,
            max_price: row.item.max_price,
            notes: row.item.notes,
            created_at: row.item.created_at,
        }
    }
}

/// Another user's tradeable copy of a wished card.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WishlistMatch {
    pub wishlist_item_id: Uuid,
    pub card_id: Uuid,
    pub card_name: String,
    pub user_card_id: Uuid,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub owner_display_name: String,
    pub condition: CardCondition,
    pub quantity: i32,
    pub estimated_value: f64,
}
