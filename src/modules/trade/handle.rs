use actix_web::{HttpRequest, get, patch, post, web};
use uuid::Uuid;

use crate::{
    api::{
        error,
        pagination::{Page, PageQuery},
        success,
    },
    middlewares::get_claims,
    modules::{
        collection::repository_pg::CollectionRepositoryPg,
        trade::{
            model, repository_pg::TradeRepositoryPg, schema::TradeStatus, service::TradeService,
        },
    },
    utils::{ValidatedJson, ValidatedQuery},
};

pub type TradeSvc = TradeService<TradeRepositoryPg, CollectionRepositoryPg>;

#[post("")]
pub async fn create_trade(
    trade_service: web::Data<TradeSvc>,
    body: ValidatedJson<model::CreateTradeModel>,
    req: HttpRequest,
) -> Result<success::Success<model::TradeResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let trade = trade_service.create_trade(user_id, body.0).await?;
    Ok(success::Success::created(Some(trade)).message("Trade created"))
}

#[get("")]
pub async fn list_trades(
    trade_service: web::Data<TradeSvc>,
    query: ValidatedQuery<model::TradeQuery>,
    req: HttpRequest,
) -> Result<success::Success<Page<model::TradeResponse>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let trades = trade_service.list_trades(user_id, query.0).await?;
    Ok(success::Success::ok(Some(trades)))
}

#[get("/public")]
pub async fn list_public_trades(
    trade_service: web::Data<TradeSvc>,
    page: ValidatedQuery<PageQuery>,
    req: HttpRequest,
) -> Result<success::Success<Page<model::TradeResponse>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let trades = trade_service.list_public(user_id, page.0).await?;
    Ok(success::Success::ok(Some(trades)))
}

#[get("/{id}")]
pub async fn get_trade(
    trade_service: web::Data<TradeSvc>,
    trade_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<model::TradeResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let trade = trade_service.get_trade(user_id, *trade_id).await?;
    Ok(success::Success::ok(Some(trade)))
}

#[post("/{id}/respond")]
pub async fn respond_to_trade(
    trade_service: web::Data<TradeSvc>,
    trade_id: web::Path<Uuid>,
    body: ValidatedJson<model::RespondTradeModel>,
    req: HttpRequest,
) -> Result<success::Success<model::TradeResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let trade = trade_service.respond_to_listing(user_id, *trade_id, body.0).await?;
    Ok(success::Success::ok(Some(trade)).message("Response sent"))
}

#[patch("/{id}")]
pub async fn patch_trade(
    trade_service: web::Data<TradeSvc>,
    trade_id: web::Path<Uuid>,
    body: ValidatedJson<model::TradePatchModel>,
    req: HttpRequest,
) -> Result<success::Success<model::TradeResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let trade = trade_service.patch_trade(user_id, *trade_id, body.0).await?;
    Ok(success::Success::ok(Some(trade)))
}

async fn run_transition(
    trade_service: &TradeSvc,
    trade_id: Uuid,
    next: TradeStatus,
    req: &HttpRequest,
) -> Result<success::Success<model::TradeResponse>, error::Error> {
    let user_id = get_claims(req)?.sub;
    let trade = trade_service.transition(user_id, trade_id, next, None).await?;
    Ok(success::Success::ok(Some(trade)))
}

#[post("/{id}/accept")]
pub async fn accept_trade(
    trade_service: web::Data<TradeSvc>,
    trade_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<model::TradeResponse>, error::Error> {
    run_transition(&trade_service, *trade_id, TradeStatus::Accepted, &req).await
}

#[post("/{id}/reject")]
pub async fn reject_trade(
    trade_service: web::Data<TradeSvc>,
    trade_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<model::TradeResponse>, error::Error> {
    run_transition(&trade_service, *trade_id, TradeStatus::Rejected, &req).await
}

#[post("/{id}/cancel")]
pub async fn cancel_trade(
    trade_service: web::Data<TradeSvc>,
    trade_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<model::TradeResponse>, error::Error> {
    run_transition(&trade_service, *trade_id, TradeStatus::Cancelled, &req).await
}

#[post("/{id}/complete")]
pub async fn complete_trade(
    trade_service: web::Data<TradeSvc>,
    trade_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<model::TradeResponse>, error::Error> {
    run_transition(&trade_service, *trade_id, TradeStatus::Completed, &req).await
}

#[post("/{id}/messages")]
pub async fn add_trade_message(
    trade_service: web::Data<TradeSvc>,
    trade_id: web::Path<Uuid>,
    body: ValidatedJson<model::TradeMessageModel>,
    req: HttpRequest,
) -> Result<success::Success<model::TradeMessageResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let message = trade_service.add_message(user_id, *trade_id, body.0.content).await?;
    Ok(success::Success::created(Some(message)))
}

#[get("/{id}/messages")]
pub async fn get_trade_messages(
    trade_service: web::Data<TradeSvc>,
    trade_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<Vec<model::TradeMessageResponse>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let messages = trade_service.get_messages(user_id, *trade_id).await?;
    Ok(success::Success::ok(Some(messages)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test as actix_test};
    use std::sync::Arc;

    use crate::test::{MemoryBlocks, MemoryUsers, notifier};

    fn lazy_service() -> TradeSvc {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let users = Arc::new(MemoryUsers::default());
        let (notifier, _) = notifier(users.clone());
        TradeService::with_dependencies(
            Arc::new(TradeRepositoryPg::new(pool.clone())),
            Arc::new(CollectionRepositoryPg::new(pool)),
            users,
            Arc::new(MemoryBlocks::default()),
            notifier,
        )
    }

    #[actix_web::test]
    async fn test_patch_with_unknown_field_is_bad_request() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_service()))
                .service(web::scope("/trades").service(patch_trade)),
        )
        .await;

        for body in [
            serde_json::json!({ "initiatorTotalValue": 1000 }),
            serde_json::json!({ "status": "cancelled", "receiverId": Uuid::now_v7() }),
        ] {
            let request = actix_test::TestRequest::patch()
                .uri(&format!("/trades/{}", Uuid::now_v7()))
                .set_json(&body)
                .to_request();
            let response = actix_test::call_service(&app, request).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }
}
