use uuid::Uuid;

use crate::api::{error, pagination::PageQuery};
use crate::modules::collection::{
    model::{
        CollectionFilter, CollectionSummary, NewUserCard, UserCardChanges, UserCardRow,
        WishlistMatch, WishlistRow,
    },
    schema::{UserCardEntity, WishlistItemEntity},
};

#[async_trait::async_trait]
pub trait UserCardRepository {
    async fn find_user_card(&self, id: &Uuid) -> Result<Option<UserCardEntity>, error::SystemError>;

    async fn find_user_card_row(&self, id: &Uuid) -> Result<Option<UserCardRow>, error::SystemError>;

    async fn find_by_owner(
        &self,
        owner_id: &Uuid,
        filter: &CollectionFilter,
        page: &PageQuery,
    ) -> Result<(Vec<UserCardRow>, i64), error::SystemError>;

    /// Rows of `owner_id` among `ids`; ids owned by someone else are left out.
    async fn find_many_for_owner(
        &self,
        owner_id: &Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<UserCardEntity>, error::SystemError>;

    async fn insert_user_card(&self, card: &NewUserCard) -> Result<UserCardEntity, error::SystemError>;

    async fn update_user_card(
        &self,
        id: &Uuid,
        changes: &UserCardChanges,
    ) -> Result<UserCardEntity, error::SystemError>;

    async fn delete_user_card(&self, id: &Uuid, owner_id: &Uuid) -> Result<bool, error::SystemError>;

    async fn summary(&self, owner_id: &Uuid) -> Result<CollectionSummary, error::SystemError>;
}

#[async_trait::async_trait]
pub trait WishlistRepository {
    async fn add_wishlist_item(
        &self,
        user_id: &Uuid,
        card_id: &Uuid,
        priority: i16,
        max_price: Option<f64>,
        notes: &Option<String>,
    ) -> Result<WishlistItemEntity, error::SystemError>;

    async fn find_wishlist(&self, user_id: &Uuid) -> Result<Vec<WishlistRow>, error::SystemError>;

    async fn delete_wishlist_item(&self, id: &Uuid, user_id: &Uuid) -> Result<bool, error::SystemError>;

    /// Tradeable copies of wished cards held by other, non-blocked users.
    async fn find_wishlist_matches(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<WishlistMatch>, error::SystemError>;
}
