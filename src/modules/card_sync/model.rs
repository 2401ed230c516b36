use serde::Serialize;

use crate::modules::card::{
    model::{UpsertCard, UpsertCardSet},
    pricing::normalize_price,
    schema::CardCategory,
};
use crate::modules::card_sync::dto::{ApiCard, ApiSet};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedSet {
    pub set_id: String,
    pub reason: String,
}

/// Outcome of one catalog sync run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub sets_total: usize,
    pub sets_synced: usize,
    pub failed_sets: Vec<FailedSet>,
    pub cards_inserted: usize,
    pub cards_updated: usize,
    pub cards_failed: usize,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl SyncReport {
    pub fn start() -> Self {
        SyncReport {
            sets_total: 0,
            sets_synced: 0,
            failed_sets: Vec::new(),
            cards_inserted: 0,
            cards_updated: 0,
            cards_failed: 0,
            started_at: chrono::Utc::now(),
            finished_at: None,
        }
    }

    pub fn fail_set(&mut self, set_id: &str, reason: impl ToString) {
        self.failed_sets.push(FailedSet { set_id: set_id.to_string(), reason: reason.to_string() });
    }
}

impl From<&ApiSet> for UpsertCardSet {
    fn from(set: &ApiSet) -> Self {
        UpsertCardSet {
            id: set.id.clone(),
            name: set.name.clone(),
            series: set.series.clone(),
            printed_total: set.printed_total,
            total: set.total,
            release_date: set.release_date.clone(),
            symbol_url: set.images.symbol.clone(),
            logo_url: set.images.logo.clone(),
        }
    }
}

/// `None` when the card's supertype is not one we catalog.
pub fn to_upsert_card(card: &ApiCard) -> Option<UpsertCard> {
    let category = CardCategory::from_supertype(&card.supertype)?;
    let pokemon = category == CardCategory::Pokemon;

    Some(UpsertCard {
        pokemon_tcg_id: card.id.clone(),
        name: card.name.clone(),
        category,
        subtypes: card.subtypes.clone(),
        set_id: card.set.id.clone(),
        set_name: card.set.name.clone(),
        series: card.set.series.clone(),
        number: card.number.clone(),
        rarity: card.rarity.clone(),
        artist: card.artist.clone(),
        image_small: card.images.small.clone(),
        image_large: card.images.large.clone(),
        hp: if pokemon { card.hp.as_deref().and_then(|hp| hp.trim().parse().ok()) } else { None },
        types: if pokemon { card.types.clone() } else { Vec::new() },
        evolves_from: if pokemon { card.evolves_from.clone() } else { None },
        attacks: if pokemon { card.attacks.clone() } else { Vec::new() },
        abilities: if pokemon { card.abilities.clone() } else { Vec::new() },
        weaknesses: if pokemon { card.weaknesses.clone() } else { Vec::new() },
        retreat_cost: if pokemon { card.converted_retreat_cost } else { None },
        rules: card.rules.clone(),
        price: normalize_price(card.tcgplayer.as_ref(), card.cardmarket.as_ref()),
    })
}
