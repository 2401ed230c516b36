use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::card::schema::{Ability, Attack, CardCategory, CardEntity, Weakness};

/// Category-specific part of a card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum CardDetails {
    #[serde(rename_all = "camelCase")]
    Pokemon {
        hp: Option<i32>,
        types: Vec<String>,
        evolves_from: Option<String>,
        attacks: Vec<Attack>,
        abilities: Vec<Ability>,
        weaknesses: Vec<Weakness>,
        retreat_cost: Option<i32>,
    },
    Trainer {
        rules: Vec<String>,
    },
    Energy {
        rules: Vec<String>,
    },
}

/// Snapshot of the market price used for valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPrice {
    pub amount: f64,
    pub currency: String,
    pub source: String,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSetRef {
    pub id: String,
    pub name: String,
    pub series: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardImages {
    pub small: Option<String>,
    pub large: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResponse {
    pub id: Uuid,
    pub pokemon_tcg_id: String,
    pub name: String,
    pub subtypes: Vec<String>,
    pub set: CardSetRef,
    pub number: String,
    pub rarity: Option<String>,
    pub artist: Option<String>,
    pub images: CardImages,
    #[serde(flatten)]
    pub details: CardDetails,
    pub price: Option<MarketPrice>,
}

impl From<CardEntity> for CardResponse {
    fn from(card: CardEntity) -> Self {
        let details = match card.category {
            CardCategory::Pokemon => CardDetails::Pokemon {
                hp: card.hp,
                types: card.types,
                evolves_from: card.evolves_from,
                attacks: card.attacks.0,
                abilities: card.abilities.0,
                weaknesses: card.weaknesses.0,
                retreat_cost: card.retreat_cost,
            },
            CardCategory::Trainer => CardDetails::Trainer { rules: card.rules },
            CardCategory::Energy => CardDetails::Energy { rules: card.rules },
        };

        let price = match (card.market_price, card.price_currency, card.price_source) {
            (Some(amount), Some(currency), Some(source)) => {
                Some(MarketPrice { amount, currency, source, updated_at: card.price_updated_at })
            }
            _ => None,
        };

        CardResponse {
            id: card.id,
            pokemon_tcg_id: card.pokemon_tcg_id,
            name: card.name,
            subtypes: card.subtypes,
            set: CardSetRef { id: card.set_id, name: card.set_name, series: card.series },
            number: card.number,
            rarity: card.rarity,
            artist: card.artist,
            images: CardImages { small: card.image_small, large: card.image_large },
            details,
            price,
        }
    }
}

/// Compact card shape embedded in collection and trade payloads.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CardSummary {
    pub id: Uuid,
    pub pokemon_tcg_id: String,
    pub name: String,
    pub set_name: String,
    pub number: String,
    pub rarity: Option<String>,
    pub image_small: Option<String>,
    pub market_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CardQuery {
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters long"))]
    pub name: Option<String>,
    pub set_id: Option<String>,
    pub category: Option<CardCategory>,
    pub rarity: Option<String>,
    #[serde(rename = "type")]
    pub energy_type: Option<String>,
    #[validate(range(min = 1, max = 100000, message = "Page must be between 1 and 100000"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct CardFilter {
    pub name: Option<String>,
    pub set_id: Option<String>,
    pub category: Option<CardCategory>,
    pub rarity: Option<String>,
    pub energy_type: Option<String>,
}

impl From<&CardQuery> for CardFilter {
    fn from(q: &CardQuery) -> Self {
        let clean = |v: &Option<String>| {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
        };
        CardFilter {
            name: clean(&q.name),
            set_id: clean(&q.set_id),
            category: q.category,
            rarity: clean(&q.rarity),
            energy_type: clean(&q.energy_type),
        }
    }
}

/// Write model produced by the catalog sync.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertCardSet {
    pub id: String,
    pub name: String,
    pub series: String,
    pub printed_total: Option<i32>,
    pub total: Option<i32>,
    pub release_date: Option<String>,
    pub symbol_url: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpsertCard {
    pub pokemon_tcg_id: String,
    pub name: String,
    pub category: CardCategory,
    pub subtypes: Vec<String>,
    pub set_id: String,
    pub set_name: String,
    pub series: String,
    pub number: String,
    pub rarity: Option<String>,
    pub artist: Option<String>,
    pub image_small: Option<String>,
    pub image_large: Option<String>,
    pub hp: Option<i32>,
    pub types: Vec<String>,
    pub evolves_from: Option<String>,
    pub attacks: Vec<Attack>,
    pub abilities: Vec<Ability>,
    pub weaknesses: Vec<Weakness>,
    pub retreat_cost: Option<i32>,
    pub rules: Vec<String>,
    pub price: Option<MarketPrice>,
}
