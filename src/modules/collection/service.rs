use std::sync::Arc;
use uuid::Uuid;

use crate::api::{
    error,
    pagination::{Page, PageQuery},
};
use crate::modules::card::repository::CardRepository;
use crate::modules::collection::{
    model::{
        AddUserCardModel, AddWishlistModel, CollectionFilter, CollectionQuery, CollectionSummary,
        NewUserCard, UpdateUserCardModel, UserCardChanges, UserCardResponse, WishlistItemResponse,
        WishlistMatch, estimate_value,
    },
    repository::{UserCardRepository, WishlistRepository},
};
use crate::modules::user::repository::UserRepository;
use crate::utils::round_cents;

#[derive(Clone)]
pub struct CollectionService<R, K, U>
where
    R: UserCardRepository + WishlistRepository + Send + Sync,
    K: CardRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    collection_repo: Arc<R>,
    card_repo: Arc<K>,
    user_repo: Arc<U>,
}

impl<R, K, U> CollectionService<R, K, U>
where
    R: UserCardRepository + WishlistRepository + Send + Sync,
    K: CardRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(collection_repo: Arc<R>, card_repo: Arc<K>, user_repo: Arc<U>) -> Self {
        CollectionService { collection_repo, card_repo, user_repo }
    }

    async fn load_response(&self, id: Uuid) -> Result<UserCardResponse, error::SystemError> {
        self.collection_repo
            .find_user_card_row(&id)
            .await?
            .map(UserCardResponse::from)
            .ok_or_else(|| error::SystemError::not_found("Card not found in collection"))
    }

    pub async fn add_card(
        &self,
        owner_id: Uuid,
        model: AddUserCardModel,
    ) -> Result<UserCardResponse, error::SystemError> {
        let card = self
            .card_repo
            .find_by_id(&model.card_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Card not found"))?;

        let condition = model.condition.unwrap_or_default();
        let (estimated_value, value_overridden) = match model.estimated_value {
            Some(value) => (round_cents(value), true),
            None => (estimate_value(card.market_price, condition), false),
        };

        let new_card = NewUserCard {
            user_id: owner_id,
            card_id: card.id,
            condition,
            quantity: model.quantity.unwrap_or(1),
            is_for_trade: model.is_for_trade.unwrap_or(false),
            is_favorite: model.is_favorite.unwrap_or(false),
            estimated_value,
            value_overridden,
            notes: model.notes,
            acquired_at: model.acquired_at.unwrap_or_else(chrono::Utc::now),
        };

        let entity = self.collection_repo.insert_user_card(&new_card).await?;
        log::debug!("User {} added card {} to collection", owner_id, card.pokemon_tcg_id);
        self.load_response(entity.id).await
    }

    pub async fn update_card(
        &self,
        owner_id: Uuid,
        user_card_id: Uuid,
        patch: UpdateUserCardModel,
    ) -> Result<UserCardResponse, error::SystemError> {
        if patch.is_empty() {
            return Err(error::SystemError::bad_request("No fields to update"));
        }

        let current = self
            .collection_repo
            .find_user_card(&user_card_id)
            .await?
            .filter(|c| c.user_id == owner_id)
            .ok_or_else(|| error::SystemError::not_found("Card not found in collection"))?;

        let market_price = self.card_repo.find_by_id(&current.card_id).await?.and_then(|c| c.market_price);

        let changes = UserCardChanges::resolve(&current, patch, market_price)
            .map_err(error::SystemError::bad_request)?;

        self.collection_repo.update_user_card(&user_card_id, &changes).await?;
        self.load_response(user_card_id).await
    }

    pub async fn remove_card(&self, owner_id: Uuid, user_card_id: Uuid) -> Result<(), error::SystemError> {
        if !self.collection_repo.delete_user_card(&user_card_id, &owner_id).await? {
            return Err(error::SystemError::not_found("Card not found in collection"));
        }
        Ok(())
    }

    pub async fn list_own(
        &self,
        owner_id: Uuid,
        query: CollectionQuery,
    ) -> Result<Page<UserCardResponse>, error::SystemError> {
        let filter = CollectionFilter { for_trade: query.for_trade, favorite: query.favorite };
        self.list(owner_id, filter, PageQuery::new(query.page, query.limit)).await
    }

    /// Another user's collection, hidden when they turned `showCollection` off.
    pub async fn list_for_viewer(
        &self,
        viewer_id: Uuid,
        owner_id: Uuid,
        query: CollectionQuery,
    ) -> Result<Page<UserCardResponse>, error::SystemError> {
        let owner = self
            .user_repo
            .find_by_id(&owner_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        if viewer_id != owner_id && !owner.show_collection {
            return Err(error::SystemError::forbidden("This collection is private"));
        }

        self.list_own(owner_id, query).await
    }

    pub async fn list_trade_cards(
        &self,
        owner_id: Uuid,
        page: PageQuery,
    ) -> Result<Page<UserCardResponse>, error::SystemError> {
        if self.user_repo.find_by_id(&owner_id).await?.is_none() {
            return Err(error::SystemError::not_found("User not found"));
        }
        let filter = CollectionFilter { for_trade: Some(true), favorite: None };
        self.list(owner_id, filter, page).await
    }

    async fn list(
        &self,
        owner_id: Uuid,
        filter: CollectionFilter,
        page: PageQuery,
    ) -> Result<Page<UserCardResponse>, error::SystemError> {
        let (rows, total) = self.collection_repo.find_by_owner(&owner_id, &filter, &page).await?;
        Ok(Page::new(rows, &page, total).map(UserCardResponse::from))
    }

    pub async fn summary(&self, owner_id: Uuid) -> Result<CollectionSummary, error::SystemError> {
        self.collection_repo.summary(&owner_id).await
    }

    pub async fn add_to_wishlist(
        &self,
        user_id: Uuid,
        model: AddWishlistModel,
    ) -> Result<WishlistItemResponse, error::SystemError> {
        if self.card_repo.find_by_id(&model.card_id).await?.is_none() {
            return Err(error::SystemError::not_found("Card not found"));
        }

        let item = self
            .collection_repo
            .add_wishlist_item(
                &user_id,
                &model.card_id,
                model.priority.unwrap_or(3),
                model.max_price,
                &model.notes,
            )
            .await
            .map_err(|e| match e {
                error::SystemError::Conflict(_) => {
                    error::SystemError::state_conflict("Card is already on your wishlist")
                }
                other => other,
            })?;

        self.collection_repo
            .find_wishlist(&user_id)
            .await?
            .into_iter()
            .find(|row| row.item.id == item.id)
            .map(WishlistItemResponse::from)
            .ok_or_else(|| error::SystemError::not_found("Wishlist item not found"))
    }

    pub async fn get_wishlist(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<WishlistItemResponse>, error::SystemError> {
        let rows = self.collection_repo.find_wishlist(&user_id).await?;
        Ok(rows.into_iter().map(WishlistItemResponse::from).collect())
    }

    pub async fn remove_from_wishlist(&self, user_id: Uuid, item_id: Uuid) -> Result<(), error::SystemError> {
        if !self.collection_repo.delete_wishlist_item(&item_id, &user_id).await? {
            return Err(error::SystemError::not_found("Wishlist item not found"));
        }
        Ok(())
    }

    pub async fn wishlist_matches(&self, user_id: Uuid) -> Result<Vec<WishlistMatch>, error::SystemError> {
        self.collection_repo.find_wishlist_matches(&user_id).await
    }
}
