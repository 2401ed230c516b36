use crate::modules::card::handle::*;
use actix_web::web::{ServiceConfig, scope};

/// Catalog reads need no authentication.
pub fn public_api_configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/cards")
            .service(search_cards)
            .service(list_sets)
            .service(get_card_by_tcg_id)
            .service(get_card),
    );
}
