use actix_web::{HttpRequest, get, web};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        chat::{
            model::ChatHistoryQuery, repository_pg::ChatRepositoryPg, schema::ChatMessageEntity,
            service::ChatService,
        },
        trade::repository_pg::TradeRepositoryPg,
    },
    utils::ValidatedQuery,
};

pub type ChatSvc = ChatService<ChatRepositoryPg, TradeRepositoryPg>;

#[get("/rooms/{room_id}/messages")]
pub async fn get_room_messages(
    chat_service: web::Data<ChatSvc>,
    room_id: web::Path<Uuid>,
    query: ValidatedQuery<ChatHistoryQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ChatMessageEntity>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let messages = chat_service.room_history(user_id, *room_id, query.0).await?;
    Ok(success::Success::ok(Some(messages)))
}

#[get("/private/{user_id}")]
pub async fn get_private_messages(
    chat_service: web::Data<ChatSvc>,
    other_id: web::Path<Uuid>,
    query: ValidatedQuery<ChatHistoryQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ChatMessageEntity>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let messages = chat_service.private_history(user_id, *other_id, query.0).await?;
    Ok(success::Success::ok(Some(messages)))
}
