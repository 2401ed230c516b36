//! Turns upstream price blocks into a single market price.
use chrono::{NaiveDate, TimeZone, Utc};

use crate::modules::card::model::MarketPrice;
use crate::modules::card_sync::dto::{CardmarketPrices, TcgPlayerPrice, TcgPlayerPrices};
use crate::utils::round_cents;

/// TCGplayer variants, most representative first.
const TCGPLAYER_VARIANTS: [&str; 6] = [
    "normal",
    "holofoil",
    "reverseHolofoil",
    "1stEditionHolofoil",
    "1stEditionNormal",
    "unlimitedHolofoil",
];

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn variant_price(price: &TcgPlayerPrice) -> Option<f64> {
    usable(price.market).or_else(|| usable(price.mid))
}

/// Upstream dates look like `2021/08/04`.
fn parse_date(raw: Option<&str>) -> Option<chrono::DateTime<Utc>> {
    let raw = raw?.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn from_tcgplayer(tcgplayer: &TcgPlayerPrices) -> Option<MarketPrice> {
    let preferred = TCGPLAYER_VARIANTS
        .iter()
        .filter_map(|variant| tcgplayer.prices.get(*variant))
        .find_map(variant_price);

    // remaining variants in a stable order
    let amount = preferred.or_else(|| {
        let mut others: Vec<_> = tcgplayer
            .prices
            .iter()
            .filter(|(name, _)| !TCGPLAYER_VARIANTS.contains(&name.as_str()))
            .collect();
        others.sort_by(|a, b| a.0.cmp(b.0));
        others.into_iter().find_map(|(_, price)| variant_price(price))
    })?;

    Some(MarketPrice {
        amount: round_cents(amount),
        currency: "USD".into(),
        source: "tcgplayer".into(),
        updated_at: parse_date(tcgplayer.updated_at.as_deref()),
    })
}

fn from_cardmarket(cardmarket: &CardmarketPrices) -> Option<MarketPrice> {
    let prices = cardmarket.prices.as_ref()?;
    let amount = usable(prices.trend_price).or_else(|| usable(prices.average_sell_price))?;

    Some(MarketPrice {
        amount: round_cents(amount),
        currency: "EUR".into(),
        source: "cardmarket".into(),
        updated_at: parse_date(cardmarket.updated_at.as_deref()),
    })
}

pub fn normalize_price(
    tcgplayer: Option<&TcgPlayerPrices>,
    cardmarket: Option<&CardmarketPrices>,
) -> Option<MarketPrice> {
    tcgplayer.and_then(from_tcgplayer).or_else(|| cardmarket.and_then(from_cardmarket))
}
