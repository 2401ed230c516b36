use crate::modules::card_sync::handle::*;
use actix_web::web::{ServiceConfig, scope};

pub fn admin_configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/cards").service(trigger_card_sync));
}
