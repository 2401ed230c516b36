use crate::modules::trade::handle::*;
use actix_web::web::{ServiceConfig, scope};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/trades")
            .service(create_trade)
            .service(list_trades)
            .service(list_public_trades)
            .service(respond_to_trade)
            .service(accept_trade)
            .service(reject_trade)
            .service(cancel_trade)
            .service(complete_trade)
            .service(add_trade_message)
            .service(get_trade_messages)
            .service(patch_trade)
            .service(get_trade),
    );
}
