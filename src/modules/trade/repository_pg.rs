use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    api::{error, pagination::PageQuery},
    modules::{
        collection::schema::UserCardEntity,
        trade::{
            model::{NewTrade, PricedOffer, TradeFilter, TradeItemRow, TradeRole},
            repository::TradeRepository,
            schema::{TradeEntity, TradeItemEntity, TradeMessageEntity, TradeSide, TradeStatus},
        },
    },
};

#[derive(Clone)]
pub struct TradeRepositoryPg {
    pool: sqlx::PgPool,
}

impl TradeRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    trade_id: &Uuid,
    side: TradeSide,
    offer: &PricedOffer,
) -> Result<(), error::SystemError> {
    for (position, item) in offer.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO trade_items (
                trade_id, side, position, user_card_id, card_id, owner_id,
                condition, quantity, unit_value
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(trade_id)
        .bind(side)
        .bind(position as i32)
        .bind(item.user_card_id)
        .bind(item.card_id)
        .bind(item.owner_id)
        .bind(item.condition)
        .bind(item.quantity)
        .bind(item.unit_value)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Takes `item.quantity` copies from the offering owner and hands them to `recipient_id`.
async fn transfer_item(
    tx: &mut Transaction<'_, Postgres>,
    item: &TradeItemEntity,
    recipient_id: &Uuid,
) -> Result<(), error::SystemError> {
    let source = sqlx::query_as::<_, UserCardEntity>(
        "SELECT * FROM user_cards WHERE id = $1 FOR UPDATE",
    )
    .bind(item.user_card_id)
    .fetch_optional(&mut **tx)
    .await?;

    let source = match source {
        Some(card) if card.user_id == item.owner_id && card.quantity >= item.quantity => card,
        _ => {
            return Err(error::SystemError::state_conflict(
                "An offered card is no longer available",
            ));
        }
    };

    if source.quantity == item.quantity {
        sqlx::query("DELETE FROM user_cards WHERE id = $1")
            .bind(source.id)
            .execute(&mut **tx)
            .await?;
    } else {
        sqlx::query(
            "UPDATE user_cards SET quantity = quantity - $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(source.id)
        .bind(item.quantity)
        .execute(&mut **tx)
        .await?;
    }

    let merged = sqlx::query(
        r#"
        UPDATE user_cards SET quantity = quantity + $4, updated_at = NOW()
        WHERE id = (
            SELECT id FROM user_cards
            WHERE user_id = $1 AND card_id = $2 AND condition = $3
            ORDER BY created_at
            LIMIT 1
            FOR UPDATE
        )
        "#,
    )
    .bind(recipient_id)
    .bind(item.card_id)
    .bind(item.condition)
    .bind(item.quantity)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    if merged == 0 {
        sqlx::query(
            r#"
            INSERT INTO user_cards (
                id, user_id, card_id, condition, quantity, is_for_trade, estimated_value
            )
            VALUES ($1, $2, $3, $4, $5, FALSE, $6)
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(recipient_id)
        .bind(item.card_id)
        .bind(item.condition)
        .bind(item.quantity)
        .bind(item.unit_value)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

const ITEM_ROW: &str = r#"
    SELECT ti.*, c.name AS card_name, c.image_small
    FROM trade_items ti
    JOIN cards c ON c.id = ti.card_id
"#;

#[async_trait::async_trait]
impl TradeRepository for TradeRepositoryPg {
    async fn create_trade(&self, trade: &NewTrade) -> Result<TradeEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;
        let id = Uuid::now_v7();

        let entity = sqlx::query_as::<_, TradeEntity>(
            r#"
            INSERT INTO trades (
                id, initiator_id, receiver_id, visibility, initiator_total_value,
                receiver_total_value, value_difference_percentage, note
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(trade.initiator_id)
        .bind(trade.receiver_id)
        .bind(trade.visibility)
        .bind(trade.initiator_offer.total)
        .bind(trade.receiver_offer.as_ref().map(|o| o.total))
        .bind(trade.value_difference_percentage)
        .bind(&trade.note)
        .fetch_one(&mut *tx)
        .await?;

        insert_items(&mut tx, &id, TradeSide::Initiator, &trade.initiator_offer).await?;
        if let Some(offer) = &trade.receiver_offer {
            insert_items(&mut tx, &id, TradeSide::Receiver, offer).await?;
        }

        tx.commit().await?;
        Ok(entity)
    }

    async fn find_trade(&self, id: &Uuid) -> Result<Option<TradeEntity>, error::SystemError> {
        let trade = sqlx::query_as::<_, TradeEntity>("SELECT * FROM trades WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(trade)
    }

    async fn find_items(&self, trade_ids: &[Uuid]) -> Result<Vec<TradeItemRow>, error::SystemError> {
        if trade_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, TradeItemRow>(&format!(
            "{ITEM_ROW} WHERE ti.trade_id = ANY($1) ORDER BY ti.trade_id, ti.side, ti.position"
        ))
        .bind(trade_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_for_user(
        &self,
        user_id: &Uuid,
        filter: &TradeFilter,
        page: &PageQuery,
    ) -> Result<(Vec<TradeEntity>, i64), error::SystemError> {
        let role_clause = match filter.role {
            Some(TradeRole::Initiator) => "initiator_id = $1",
            Some(TradeRole::Receiver) => "receiver_id = $1",
            None => "(initiator_id = $1 OR receiver_id = $1)",
        };
        let condition = format!("{role_clause} AND ($2::trade_status IS NULL OR status = $2)");

        let trades = sqlx::query_as::<_, TradeEntity>(&format!(
            "SELECT * FROM trades WHERE {condition} ORDER BY updated_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(filter.status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM trades WHERE {condition}"))
                .bind(user_id)
                .bind(filter.status)
                .fetch_one(&self.pool)
                .await?;

        Ok((trades, total))
    }

    async fn find_open_listings(
        &self,
        viewer_id: &Uuid,
        page: &PageQuery,
    ) -> Result<(Vec<TradeEntity>, i64), error::SystemError> {
        const OPEN: &str = r#"
            FROM trades t
            JOIN users u ON u.id = t.initiator_id AND u.deleted_at IS NULL
            WHERE t.visibility = 'public'
              AND t.status = 'pending'
              AND t.receiver_id IS NULL
              AND t.initiator_id <> $1
              AND NOT EXISTS (
                  SELECT 1 FROM blocked_users b
                  WHERE (b.user_id = $1 AND b.blocked_user_id = t.initiator_id)
                     OR (b.user_id = t.initiator_id AND b.blocked_user_id = $1)
              )
        "#;

        let trades = sqlx::query_as::<_, TradeEntity>(&format!(
            "SELECT t.* {OPEN} ORDER BY t.created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(viewer_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {OPEN}"))
            .bind(viewer_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((trades, total))
    }

    async fn attach_response(
        &self,
        trade_id: &Uuid,
        receiver_id: &Uuid,
        offer: &PricedOffer,
        value_difference_percentage: f64,
    ) -> Result<Option<TradeEntity>, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let trade = sqlx::query_as::<_, TradeEntity>(
            r#"
            UPDATE trades SET
                receiver_id = $2,
                receiver_total_value = $3,
                value_difference_percentage = $4,
                updated_at = NOW()
            WHERE id = $1
              AND visibility = 'public'
              AND status = 'pending'
              AND receiver_id IS NULL
            RETURNING *
            "#,
        )
        .bind(trade_id)
        .bind(receiver_id)
        .bind(offer.total)
        .bind(value_difference_percentage)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(trade) = trade else {
            tx.rollback().await?;
            return Ok(None);
        };

        insert_items(&mut tx, trade_id, TradeSide::Receiver, offer).await?;
        tx.commit().await?;
        Ok(Some(trade))
    }

    async fn update_status(
        &self,
        trade_id: &Uuid,
        from: TradeStatus,
        to: TradeStatus,
    ) -> Result<Option<TradeEntity>, error::SystemError> {
        let trade = sqlx::query_as::<_, TradeEntity>(
            r#"
            UPDATE trades SET
                status = $3,
                responded_at = CASE
                    WHEN $3 IN ('accepted', 'rejected') THEN NOW()
                    ELSE responded_at
                END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(trade_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;
        Ok(trade)
    }

    async fn complete_trade_atomic(
        &self,
        trade_id: &Uuid,
        completed_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<TradeEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let trade =
            sqlx::query_as::<_, TradeEntity>("SELECT * FROM trades WHERE id = $1 FOR UPDATE")
                .bind(trade_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| error::SystemError::not_found("Trade not found"))?;

        if trade.status != TradeStatus::Accepted {
            tx.rollback().await?;
            return Err(error::SystemError::state_conflict(format!(
                "Trade is {} and cannot be completed",
                trade.status.as_str()
            )));
        }

        let Some(receiver_id) = trade.receiver_id else {
            tx.rollback().await?;
            return Err(error::SystemError::state_conflict("Trade has no receiver"));
        };

        let items = sqlx::query_as::<_, TradeItemEntity>(
            "SELECT * FROM trade_items WHERE trade_id = $1 ORDER BY side, position",
        )
        .bind(trade_id)
        .fetch_all(&mut *tx)
        .await?;

        // lock every source row in id order so overlapping completions queue instead of deadlocking
        let mut source_ids: Vec<Uuid> = items.iter().map(|i| i.user_card_id).collect();
        source_ids.sort();
        source_ids.dedup();
        sqlx::query("SELECT id FROM user_cards WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&source_ids)
            .execute(&mut *tx)
            .await?;

        for item in &items {
            let recipient = match item.side {
                TradeSide::Initiator => receiver_id,
                TradeSide::Receiver => trade.initiator_id,
            };
            if let Err(e) = transfer_item(&mut tx, item, &recipient).await {
                tx.rollback().await?;
                return Err(e);
            }
        }

        let completed = sqlx::query_as::<_, TradeEntity>(
            r#"
            UPDATE trades SET
                status = 'completed',
                completed_at = COALESCE($2, NOW()),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(trade_id)
        .bind(completed_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(completed)
    }

    async fn add_message(
        &self,
        trade_id: &Uuid,
        sender_id: &Uuid,
        content: &str,
    ) -> Result<TradeMessageEntity, error::SystemError> {
        let message = sqlx::query_as::<_, TradeMessageEntity>(
            r#"
            INSERT INTO trade_messages (id, trade_id, sender_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(trade_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    async fn find_messages(&self, trade_id: &Uuid) -> Result<Vec<TradeMessageEntity>, error::SystemError> {
        let messages = sqlx::query_as::<_, TradeMessageEntity>(
            "SELECT * FROM trade_messages WHERE trade_id = $1 ORDER BY created_at ASC",
        )
        .bind(trade_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }
}
