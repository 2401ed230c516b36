use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    api::{error, pagination::PageQuery},
    modules::card::{
        model::{CardFilter, UpsertCard, UpsertCardSet},
        repository::{CardCatalogWriter, CardRepository},
        schema::{CardEntity, CardSetEntity},
    },
};

#[derive(Clone)]
pub struct CardRepositoryPg {
    pool: sqlx::PgPool,
}

impl CardRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

const SEARCH_FILTER: &str = r#"
    ($1::text IS NULL OR lower(name) LIKE '%' || lower($1) || '%')
    AND ($2::text IS NULL OR set_id = $2)
    AND ($3::card_category IS NULL OR category = $3)
    AND ($4::text IS NULL OR lower(rarity) = lower($4))
    AND ($5::text IS NULL OR $5 = ANY(types))
"#;

#[async_trait::async_trait]
impl CardRepository for CardRepositoryPg {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<CardEntity>, error::SystemError> {
        let card = sqlx::query_as::<_, CardEntity>("SELECT * FROM cards WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(card)
    }

    async fn find_by_tcg_id(
        &self,
        pokemon_tcg_id: &str,
    ) -> Result<Option<CardEntity>, error::SystemError> {
        let card = sqlx::query_as::<_, CardEntity>("SELECT * FROM cards WHERE pokemon_tcg_id = $1")
            .bind(pokemon_tcg_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(card)
    }

    async fn search(
        &self,
        filter: &CardFilter,
        page: &PageQuery,
    ) -> Result<(Vec<CardEntity>, i64), error::SystemError> {
        let items = sqlx::query_as::<_, CardEntity>(&format!(
            "SELECT * FROM cards WHERE {SEARCH_FILTER} ORDER BY set_id, name, number LIMIT $6 OFFSET $7"
        ))
        .bind(&filter.name)
        .bind(&filter.set_id)
        .bind(filter.category)
        .bind(&filter.rarity)
        .bind(&filter.energy_type)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM cards WHERE {SEARCH_FILTER}"))
                .bind(&filter.name)
                .bind(&filter.set_id)
                .bind(filter.category)
                .bind(&filter.rarity)
                .bind(&filter.energy_type)
                .fetch_one(&self.pool)
                .await?;

        Ok((items, total))
    }

    async fn find_sets(&self) -> Result<Vec<CardSetEntity>, error::SystemError> {
        let sets = sqlx::query_as::<_, CardSetEntity>(
            "SELECT * FROM card_sets ORDER BY release_date DESC NULLS LAST, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(sets)
    }
}

#[async_trait::async_trait]
impl CardCatalogWriter for CardRepositoryPg {
    async fn upsert_set(&self, set: &UpsertCardSet) -> Result<(), error::SystemError> {
        sqlx::query(
            r#"
            INSERT INTO card_sets
                (id, name, series, printed_total, total, release_date, symbol_url, logo_url, synced_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                series = EXCLUDED.series,
                printed_total = EXCLUDED.printed_total,
                total = EXCLUDED.total,
                release_date = EXCLUDED.release_date,
                symbol_url = EXCLUDED.symbol_url,
                logo_url = EXCLUDED.logo_url,
                synced_at = NOW()
            "#,
        )
        .bind(&set.id)
        .bind(&set.name)
        .bind(&set.series)
        .bind(set.printed_total)
        .bind(set.total)
        .bind(&set.release_date)
        .bind(&set.symbol_url)
        .bind(&set.logo_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_card(&self, card: &UpsertCard) -> Result<bool, error::SystemError> {
        let price = card.price.as_ref();

        // xmax is 0 only for freshly inserted tuples
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO cards (
                id, pokemon_tcg_id, name, category, subtypes, set_id, set_name, series, number,
                rarity, artist, image_small, image_large, hp, types, evolves_from, attacks,
                abilities, weaknesses, retreat_cost, rules, market_price, price_currency,
                price_source, price_updated_at, synced_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $23, $24, $25, NOW()
            )
            ON CONFLICT ON CONSTRAINT cards_pokemon_tcg_id_key DO UPDATE SET
                name = EXCLUDED.name,
                category = EXCLUDED.category,
                subtypes = EXCLUDED.subtypes,
                set_id = EXCLUDED.set_id,
                set_name = EXCLUDED.set_name,
                series = EXCLUDED.series,
                number = EXCLUDED.number,
                rarity = EXCLUDED.rarity,
                artist = EXCLUDED.artist,
                image_small = EXCLUDED.image_small,
                image_large = EXCLUDED.image_large,
                hp = EXCLUDED.hp,
                types = EXCLUDED.types,
                evolves_from = EXCLUDED.evolves_from,
                attacks = EXCLUDED.attacks,
                abilities = EXCLUDED.abilities,
                weaknesses = EXCLUDED.weaknesses,
                retreat_cost = EXCLUDED.retreat_cost,
                rules = EXCLUDED.rules,
                market_price = COALESCE(EXCLUDED.market_price, cards.market_price),
                price_currency = COALESCE(EXCLUDED.price_currency, cards.price_currency),
                price_source = COALESCE(EXCLUDED.price_source, cards.price_source),
                price_updated_at = COALESCE(EXCLUDED.price_updated_at, cards.price_updated_at),
                synced_at = NOW(),
                updated_at = NOW()
            RETURNING (xmax = 0)
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&card.pokemon_tcg_id)
        .bind(&card.name)
        .bind(card.category)
        .bind(&card.subtypes)
        .bind(&card.set_id)
        .bind(&card.set_name)
        .bind(&card.series)
        .bind(&card.number)
        .bind(&card.rarity)
        .bind(&card.artist)
        .bind(&card.image_small)
        .bind(&card.image_large)
        .bind(card.hp)
        .bind(&card.types)
        .bind(&card.evolves_from)
        .bind(Json(&card.attacks))
        .bind(Json(&card.abilities))
        .bind(Json(&card.weaknesses))
        .bind(card.retreat_cost)
        .bind(&card.rules)
        .bind(price.map(|p| p.amount))
        .bind(price.map(|p| p.currency.as_str()))
        .bind(price.map(|p| p.source.as_str()))
        .bind(price.and_then(|p| p.updated_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }
}
