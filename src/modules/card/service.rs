use std::sync::Arc;
use uuid::Uuid;

use crate::api::{
    error,
    pagination::{Page, PageQuery},
};
use crate::modules::card::{
    model::{CardFilter, CardQuery, CardResponse},
    repository::CardRepository,
    schema::CardSetEntity,
};

#[derive(Clone)]
pub struct CardService<R>
where
    R: CardRepository + Send + Sync,
{
    card_repo: Arc<R>,
}

impl<R> CardService<R>
where
    R: CardRepository + Send + Sync,
{
    pub fn with_dependencies(card_repo: Arc<R>) -> Self {
        CardService { card_repo }
    }

    pub async fn get_card(&self, id: Uuid) -> Result<CardResponse, error::SystemError> {
        self.card_repo
            .find_by_id(&id)
            .await?
            .map(CardResponse::from)
            .ok_or_else(|| error::SystemError::not_found("Card not found"))
    }

    pub async fn get_by_tcg_id(
        &self,
        pokemon_tcg_id: &str,
    ) -> Result<CardResponse, error::SystemError> {
        self.card_repo
            .find_by_tcg_id(pokemon_tcg_id)
            .await?
            .map(CardResponse::from)
            .ok_or_else(|| error::SystemError::not_found("Card not found"))
    }

    pub async fn search(&self, query: CardQuery) -> Result<Page<CardResponse>, error::SystemError> {
        let filter = CardFilter::from(&query);
        let page = PageQuery::new(query.page, query.limit);
        let (cards, total) = self.card_repo.search(&filter, &page).await?;
        Ok(Page::new(cards, &page, total).map(CardResponse::from))
    }

    pub async fn list_sets(&self) -> Result<Vec<CardSetEntity>, error::SystemError> {
        self.card_repo.find_sets().await
    }
}
