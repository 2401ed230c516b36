use crate::modules::chat::handle::*;
use actix_web::web::{ServiceConfig, scope};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/chat").service(get_room_messages).service(get_private_messages));
}
