use actix_web::{HttpRequest, delete, get, patch, post, web};
use uuid::Uuid;

use crate::{
    api::{
        error,
        pagination::{Page, PageQuery},
        success,
    },
    middlewares::get_claims,
    modules::{
        card::repository_pg::CardRepositoryPg,
        collection::{model, repository_pg::CollectionRepositoryPg, service::CollectionService},
        user::repository_pg::UserRepositoryPg,
    },
    utils::{ValidatedJson, ValidatedQuery},
};

pub type CollectionSvc = CollectionService<CollectionRepositoryPg, CardRepositoryPg, UserRepositoryPg>;

#[post("")]
pub async fn add_card(
    collection_service: web::Data<CollectionSvc>,
    body: ValidatedJson<model::AddUserCardModel>,
    req: HttpRequest,
) -> Result<success::Success<model::UserCardResponse>, error::Error> {
    let owner_id = get_claims(&req)?.sub;
    let card = collection_service.add_card(owner_id, body.0).await?;
    Ok(success::Success::created(Some(card)).message("Card added to collection"))
}

#[get("")]
pub async fn list_collection(
    collection_service: web::Data<CollectionSvc>,
    query: ValidatedQuery<model::CollectionQuery>,
    req: HttpRequest,
) -> Result<success::Success<Page<model::UserCardResponse>>, error::Error> {
    let owner_id = get_claims(&req)?.sub;
    let cards = collection_service.list_own(owner_id, query.0).await?;
    Ok(success::Success::ok(Some(cards)))
}

#[get("/summary")]
pub async fn collection_summary(
    collection_service: web::Data<CollectionSvc>,
    req: HttpRequest,
) -> Result<success::Success<model::CollectionSummary>, error::Error> {
    let owner_id = get_claims(&req)?.sub;
    let summary = collection_service.summary(owner_id).await?;
    Ok(success::Success::ok(Some(summary)))
}

#[patch("/{id}")]
pub async fn update_card(
    collection_service: web::Data<CollectionSvc>,
    user_card_id: web::Path<Uuid>,
    body: ValidatedJson<model::UpdateUserCardModel>,
    req: HttpRequest,
) -> Result<success::Success<model::UserCardResponse>, error::Error> {
    let owner_id = get_claims(&req)?.sub;
    let card = collection_service.update_card(owner_id, *user_card_id, body.0).await?;
    Ok(success::Success::ok(Some(card)).message("Card updated"))
}

#[delete("/{id}")]
pub async fn remove_card(
    collection_service: web::Data<CollectionSvc>,
    user_card_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let owner_id = get_claims(&req)?.sub;
    collection_service.remove_card(owner_id, *user_card_id).await?;
    Ok(success::Success::no_content())
}

#[get("/{id}/collection")]
pub async fn list_user_collection(
    collection_service: web::Data<CollectionSvc>,
    owner_id: web::Path<Uuid>,
    query: ValidatedQuery<model::CollectionQuery>,
    req: HttpRequest,
) -> Result<success::Success<Page<model::UserCardResponse>>, error::Error> {
    let viewer_id = get_claims(&req)?.sub;
    let cards = collection_service.list_for_viewer(viewer_id, *owner_id, query.0).await?;
    Ok(success::Success::ok(Some(cards)))
}

#[get("/{id}/trade-cards")]
pub async fn list_user_trade_cards(
    collection_service: web::Data<CollectionSvc>,
    owner_id: web::Path<Uuid>,
    page: ValidatedQuery<PageQuery>,
) -> Result<success::Success<Page<model::UserCardResponse>>, error::Error> {
    let cards = collection_service.list_trade_cards(*owner_id, page.0).await?;
    Ok(success::Success::ok(Some(cards)))
}

#[post("")]
pub async fn add_to_wishlist(
    collection_service: web::Data<CollectionSvc>,
    body: ValidatedJson<model::AddWishlistModel>,
    req: HttpRequest,
) -> Result<success::Success<model::WishlistItemResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let item = collection_service.add_to_wishlist(user_id, body.0).await?;
    Ok(success::Success::created(Some(item)).message("Card added to wishlist"))
}

#[get("")]
pub async fn get_wishlist(
    collection_service: web::Data<CollectionSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<model::WishlistItemResponse>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let items = collection_service.get_wishlist(user_id).await?;
    Ok(success::Success::ok(Some(items)))
}

#[get("/matches")]
pub async fn wishlist_matches(
    collection_service: web::Data<CollectionSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<model::WishlistMatch>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let matches = collection_service.wishlist_matches(user_id).await?;
    Ok(success::Success::ok(Some(matches)))
}

#[delete("/{id}")]
pub async fn remove_from_wishlist(
    collection_service: web::Data<CollectionSvc>,
    item_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    collection_service.remove_from_wishlist(user_id, *item_id).await?;
    Ok(success::Success::no_content())
}
