use crate::modules::collection::handle::*;
use actix_web::web::{ServiceConfig, scope};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/collection")
            .service(add_card)
            .service(list_collection)
            .service(collection_summary)
            .service(update_card)
            .service(remove_card),
    )
    .service(
        scope("/wishlist")
            .service(add_to_wishlist)
            .service(get_wishlist)
            .service(wishlist_matches)
            .service(remove_from_wishlist),
    );
}
