use actix_web::{get, web};
use uuid::Uuid;

use crate::{
    api::{error, pagination::Page, success},
    modules::card::{
        model::{CardQuery, CardResponse},
        repository_pg::CardRepositoryPg,
        schema::CardSetEntity,
        service::CardService,
    },
    utils::ValidatedQuery,
};

pub type CardSvc = CardService<CardRepositoryPg>;

#[get("")]
pub async fn search_cards(
    card_service: web::Data<CardSvc>,
    query: ValidatedQuery<CardQuery>,
) -> Result<success::Success<Page<CardResponse>>, error::Error> {
    let cards = card_service.search(query.0).await?;
    Ok(success::Success::ok(Some(cards)))
}

#[get("/sets")]
pub async fn list_sets(
    card_service: web::Data<CardSvc>,
) -> Result<success::Success<Vec<CardSetEntity>>, error::Error> {
    let sets = card_service.list_sets().await?;
    Ok(success::Success::ok(Some(sets)))
}

#[get("/tcg/{pokemon_tcg_id}")]
pub async fn get_card_by_tcg_id(
    card_service: web::Data<CardSvc>,
    pokemon_tcg_id: web::Path<String>,
) -> Result<success::Success<CardResponse>, error::Error> {
    let card = card_service.get_by_tcg_id(&pokemon_tcg_id).await?;
    Ok(success::Success::ok(Some(card)))
}

#[get("/{id:[0-9a-fA-F-]{36}}")]
pub async fn get_card(
    card_service: web::Data<CardSvc>,
    card_id: web::Path<Uuid>,
) -> Result<success::Success<CardResponse>, error::Error> {
    let card = card_service.get_card(card_id.into_inner()).await?;
    Ok(success::Success::ok(Some(card)))
}
