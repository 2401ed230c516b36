//! Wire shapes of the Pokémon TCG API (v2).
use serde::Deserialize;
use std::collections::HashMap;

use crate::modules::card::schema::{Ability, Attack, Weakness};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPage<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub count: u32,
    pub total_count: u32,
}

impl<T> ApiPage<T> {
    pub fn has_more(&self) -> bool {
        self.count > 0 && self.page.saturating_mul(self.page_size) < self.total_count
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSetImages {
    pub symbol: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub series: String,
    pub printed_total: Option<i32>,
    pub total: Option<i32>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: ApiSetImages,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiCardImages {
    pub small: Option<String>,
    pub large: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcgPlayerPrice {
    pub low: Option<f64>,
    pub mid: Option<f64>,
    pub high: Option<f64>,
    pub market: Option<f64>,
    pub direct_low: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcgPlayerPrices {
    pub url: Option<String>,
    pub updated_at: Option<String>,
    #[serde(default)]
    pub prices: HashMap<String, TcgPlayerPrice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardmarketPrice {
    pub average_sell_price: Option<f64>,
    pub low_price: Option<f64>,
    pub trend_price: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardmarketPrices {
    pub url: Option<String>,
    pub updated_at: Option<String>,
    pub prices: Option<CardmarketPrice>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCard {
    pub id: String,
    pub name: String,
    pub supertype: String,
    #[serde(default)]
    pub subtypes: Vec<String>,
    pub hp: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    pub evolves_from: Option<String>,
    #[serde(default)]
    pub attacks: Vec<Attack>,
    #[serde(default)]
    pub abilities: Vec<Ability>,
    #[serde(default)]
    pub weaknesses: Vec<Weakness>,
    pub converted_retreat_cost: Option<i32>,
    #[serde(default)]
    pub rules: Vec<String>,
    pub set: ApiSet,
    pub number: String,
    pub artist: Option<String>,
    pub rarity: Option<String>,
    #[serde(default)]
    pub images: ApiCardImages,
    pub tcgplayer: Option<TcgPlayerPrices>,
    pub cardmarket: Option<CardmarketPrices>,
}
