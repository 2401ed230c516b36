use uuid::Uuid;

use crate::{
    api::{error, pagination::PageQuery},
    modules::collection::{
        model::{
            CollectionFilter, CollectionSummary, NewUserCard, UserCardChanges, UserCardRow,
            WishlistMatch, WishlistRow,
        },
        repository::{UserCardRepository, WishlistRepository},
        schema::{UserCardEntity, WishlistItemEntity},
    },
};

#[derive(Clone)]
pub struct CollectionRepositoryPg {
    pool: sqlx::PgPool,
}

impl CollectionRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

const USER_CARD_ROW: &str = r#"
    SELECT uc.*, c.pokemon_tcg_id, c.name AS card_name, c.set_name, c.number, c.rarity,
           c.image_small, c.market_price
    FROM user_cards uc
    JOIN cards c ON c.id = uc.card_id
"#;

#[async_trait::async_trait]
impl UserCardRepository for CollectionRepositoryPg {
    async fn find_user_card(&self, id: &Uuid) -> Result<Option<UserCardEntity>, error::SystemError> {
        let card = sqlx::query_as::<_, UserCardEntity>("SELECT * FROM user_cards WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(card)
    }

    async fn find_user_card_row(&self, id: &Uuid) -> Result<Option<UserCardRow>, error::SystemError> {
        let row = sqlx::query_as::<_, UserCardRow>(&format!("{USER_CARD_ROW} WHERE uc.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_owner(
        &self,
        owner_id: &Uuid,
        filter: &CollectionFilter,
        page: &PageQuery,
    ) -> Result<(Vec<UserCardRow>, i64), error::SystemError> {
        let rows = sqlx::query_as::<_, UserCardRow>(&format!(
            r#"{USER_CARD_ROW}
            WHERE uc.user_id = $1
              AND ($2::boolean IS NULL OR uc.is_for_trade = $2)
              AND ($3::boolean IS NULL OR uc.is_favorite = $3)
            ORDER BY uc.created_at DESC
            LIMIT $4 OFFSET $5"#
        ))
        .bind(owner_id)
        .bind(filter.for_trade)
        .bind(filter.favorite)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM user_cards
            WHERE user_id = $1
              AND ($2::boolean IS NULL OR is_for_trade = $2)
              AND ($3::boolean IS NULL OR is_favorite = $3)
            "#,
        )
        .bind(owner_id)
        .bind(filter.for_trade)
        .bind(filter.favorite)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, total))
    }

    async fn find_many_for_owner(
        &self,
        owner_id: &Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<UserCardEntity>, error::SystemError> {
        let cards = sqlx::query_as::<_, UserCardEntity>(
            "SELECT * FROM user_cards WHERE user_id = $1 AND id = ANY($2)",
        )
        .bind(owner_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(cards)
    }

    async fn insert_user_card(&self, card: &NewUserCard) -> Result<UserCardEntity, error::SystemError> {
        let entity = sqlx::query_as::<_, UserCardEntity>(
            r#"
            INSERT INTO user_cards (
                id, user_id, card_id, condition, quantity, is_for_trade, is_favorite,
                estimated_value, value_overridden, notes, acquired_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(card.user_id)
        .bind(card.card_id)
        .bind(card.condition)
        .bind(card.quantity)
        .bind(card.is_for_trade)
        .bind(card.is_favorite)
        .bind(card.estimated_value)
        .bind(card.value_overridden)
        .bind(&card.notes)
        .bind(card.acquired_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn update_user_card(
        &self,
        id: &Uuid,
        changes: &UserCardChanges,
    ) -> Result<UserCardEntity, error::SystemError> {
        let entity = sqlx::query_as::<_, UserCardEntity>(
            r#"
            UPDATE user_cards SET
                quantity = $2,
                condition = $3,
                is_for_trade = $4,
                is_favorite = $5,
                estimated_value = $6,
                value_overridden = $7,
                notes = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.quantity)
        .bind(changes.condition)
        .bind(changes.is_for_trade)
        .bind(changes.is_favorite)
        .bind(changes.estimated_value)
        .bind(changes.value_overridden)
        .bind(&changes.notes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| error::SystemError::not_found("Card not found in collection"))?;
        Ok(entity)
    }

    async fn delete_user_card(&self, id: &Uuid, owner_id: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query("DELETE FROM user_cards WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows > 0)
    }

    async fn summary(&self, owner_id: &Uuid) -> Result<CollectionSummary, error::SystemError> {
        let summary = sqlx::query_as::<_, CollectionSummary>(
            r#"
            SELECT
                COUNT(DISTINCT card_id) AS distinct_cards,
                COALESCE(SUM(quantity), 0)::BIGINT AS total_copies,
                COALESCE(SUM(quantity) FILTER (WHERE is_for_trade), 0)::BIGINT AS for_trade_copies,
                COALESCE(ROUND(SUM(estimated_value * quantity)::NUMERIC, 2), 0)::DOUBLE PRECISION
                    AS total_value
            FROM user_cards
            WHERE user_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }
}

#[async_trait::async_trait]
impl WishlistRepository for CollectionRepositoryPg {
    async fn add_wishlist_item(
        &self,
        user_id: &Uuid,
        card_id: &Uuid,
        priority: i16,
        max_price: Option<f64>,
        notes: &Option<String>,
    ) -> Result<WishlistItemEntity, error::SystemError> {
        let item = sqlx::query_as::<_, WishlistItemEntity>(
            r#"
            INSERT INTO wishlist_items (id, user_id, card_id, priority, max_price, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(card_id)
        .bind(priority)
        .bind(max_price)
        .bind(notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    async fn find_wishlist(&self, user_id: &Uuid) -> Result<Vec<WishlistRow>, error::SystemError> {
        let rows = sqlx::query_as::<_, WishlistRow>(
            r#"
            SELECT w.*, c.pokemon_tcg_id, c.name AS card_name, c.set_name, c.number, c.rarity,
                   c.image_small, c.market_price
            FROM wishlist_items w
            JOIN cards c ON c.id = w.card_id
            WHERE w.user_id = $1
            ORDER BY w.priority DESC, w.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_wishlist_item(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, error::SystemError> {
        let rows = sqlx::query("DELETE FROM wishlist_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows > 0)
    }

    async fn find_wishlist_matches(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<WishlistMatch>, error::SystemError> {
        let matches = sqlx::query_as::<_, WishlistMatch>(
            r#"
            SELECT
                w.id AS wishlist_item_id,
                c.id AS card_id,
                c.name AS card_name,
                uc.id AS user_card_id,
                u.id AS owner_id,
                u.username AS owner_username,
                u.display_name AS owner_display_name,
                uc.condition,
                uc.quantity,
                uc.estimated_value
            FROM wishlist_items w
            JOIN cards c ON c.id = w.card_id
            JOIN user_cards uc ON uc.card_id = w.card_id AND uc.is_for_trade
            JOIN users u ON u.id = uc.user_id AND u.deleted_at IS NULL
            WHERE w.user_id = $1
              AND uc.user_id <> $1
              AND (w.max_price IS NULL OR uc.estimated_value <= w.max_price)
              AND NOT EXISTS (
                  SELECT 1 FROM blocked_users b
                  WHERE (b.user_id = $1 AND b.blocked_user_id = uc.user_id)
                     OR (b.user_id = uc.user_id AND b.blocked_user_id = $1)
              )
            ORDER BY w.priority DESC, uc.estimated_value ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(matches)
    }
}
