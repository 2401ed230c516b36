use uuid::Uuid;

use crate::api::{error, pagination::PageQuery};
use crate::modules::card::{
    model::{CardFilter, UpsertCard, UpsertCardSet},
    schema::{CardEntity, CardSetEntity},
};

#[async_trait::async_trait]
pub trait CardRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<CardEntity>, error::SystemError>;

    async fn find_by_tcg_id(
        &self,
        pokemon_tcg_id: &str,
    ) -> Result<Option<CardEntity>, error::SystemError>;

    async fn search(
        &self,
        filter: &CardFilter,
        page: &PageQuery,
    ) -> Result<(Vec<CardEntity>, i64), error::SystemError>;

    async fn find_sets(&self) -> Result<Vec<CardSetEntity>, error::SystemError>;
}

/// Write side of the catalog, used only by the sync job.
#[async_trait::async_trait]
pub trait CardCatalogWriter {
    async fn upsert_set(&self, set: &UpsertCardSet) -> Result<(), error::SystemError>;

    /// Returns `true` when the card was inserted, `false` when an existing row was updated.
    async fn upsert_card(&self, card: &UpsertCard) -> Result<bool, error::SystemError>;
}
