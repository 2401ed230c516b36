use crate::modules::friend::handle::*;
use actix_web::web::{ServiceConfig, scope};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/friends")
            .service(send_friend_request)
            .service(accept_friend_request)
            .service(decline_friend_request)
            .service(list_friends)
            .service(list_friend_requests)
            .service(list_blocked_users)
            .service(block_user)
            .service(unblock_user)
            .service(remove_friend),
    );
}
