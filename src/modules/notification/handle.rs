use actix_web::{HttpRequest, delete, get, patch, web};
use uuid::Uuid;

use crate::api::{error, pagination::Page, success};
use crate::middlewares::get_claims;
use crate::modules::notification::{model, service::NotificationService};
use crate::utils::ValidatedQuery;

#[get("")]
pub async fn list_notifications(
    notification_service: web::Data<NotificationService>,
    query: ValidatedQuery<model::NotificationQuery>,
    req: HttpRequest,
) -> Result<success::Success<Page<model::NotificationResponse>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let page = notification_service.list(user_id, query.0).await?;
    Ok(success::Success::ok(Some(page)))
}

#[get("/unread-count")]
pub async fn unread_count(
    notification_service: web::Data<NotificationService>,
    req: HttpRequest,
) -> Result<success::Success<model::UnreadCountResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let unread = notification_service.unread_count(user_id).await?;
    Ok(success::Success::ok(Some(model::UnreadCountResponse { unread })))
}

#[patch("/read-all")]
pub async fn mark_all_read(
    notification_service: web::Data<NotificationService>,
    req: HttpRequest,
) -> Result<success::Success<model::AffectedResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let affected = notification_service.mark_all_read(user_id).await?;
    Ok(success::Success::ok(Some(model::AffectedResponse { affected }))
        .message("All notifications marked as read"))
}

#[patch("/{id}/read")]
pub async fn mark_read(
    notification_service: web::Data<NotificationService>,
    notification_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<model::NotificationResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let notification =
        notification_service.mark_read(user_id, notification_id.into_inner()).await?;
    Ok(success::Success::ok(Some(notification)))
}

#[delete("/{id}")]
pub async fn delete_notification(
    notification_service: web::Data<NotificationService>,
    notification_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    notification_service.delete(user_id, notification_id.into_inner()).await?;
    Ok(success::Success::no_content())
}

#[delete("")]
pub async fn delete_all_notifications(
    notification_service: web::Data<NotificationService>,
    req: HttpRequest,
) -> Result<success::Success<model::AffectedResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let affected = notification_service.delete_all(user_id).await?;
    Ok(success::Success::ok(Some(model::AffectedResponse { affected }))
        .message("Notifications deleted"))
}
