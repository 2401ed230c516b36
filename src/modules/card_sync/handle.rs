use actix_web::{post, web};

use crate::{
    api::{error, success},
    modules::{
        card::repository_pg::CardRepositoryPg,
        card_sync::{model::SyncReport, service::CatalogSyncService, source::TcgApiClient},
    },
};

pub type CatalogSyncSvc = CatalogSyncService<TcgApiClient, CardRepositoryPg>;

#[post("/sync")]
pub async fn trigger_card_sync(
    sync_service: web::Data<CatalogSyncSvc>,
) -> Result<success::Success<SyncReport>, error::Error> {
    let report = sync_service.run().await?;
    Ok(success::Success::ok(Some(report)).message("Card catalog synchronized"))
}
