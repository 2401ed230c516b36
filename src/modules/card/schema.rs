use serde::{Deserialize, Serialize};
use sqlx::{
    prelude::{FromRow, Type},
    types::Json,
};
use uuid::Uuid;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "card_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CardCategory {
    Pokemon,
    Trainer,
    Energy,
}

impl CardCategory {
    /// Maps the upstream `supertype` ("Pokémon", "Trainer", "Energy").
    pub fn from_supertype(supertype: &str) -> Option<Self> {
        match supertype.trim().to_lowercase().as_str() {
            "pokémon" | "pokemon" => Some(CardCategory::Pokemon),
            "trainer" => Some(CardCategory::Trainer),
            "energy" => Some(CardCategory::Energy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attack {
    pub name: String,
    #[serde(default)]
    pub cost: Vec<String>,
    pub converted_energy_cost: Option<i32>,
    pub damage: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weakness {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CardEntity {
    pub id: Uuid,
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
    pub attacks: Json<Vec<Attack>>,
    pub abilities: Json<Vec<Ability>>,
    pub weaknesses: Json<Vec<Weakness>>,
    pub retreat_cost: Option<i32>,
    pub rules: Vec<String>,
    pub market_price: Option<f64>,
    pub price_currency: Option<String>,
    pub price_source: Option<String>,
    pub price_updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub synced_at: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSetEntity {
    pub id: String,
    pub name: String,
    pub series: String,
    pub printed_total: Option<i32>,
    pub total: Option<i32>,
    pub release_date: Option<String>,
    pub symbol_url: Option<String>,
    pub logo_url: Option<String>,
    pub synced_at: chrono::DateTime<chrono::Utc>,
}
