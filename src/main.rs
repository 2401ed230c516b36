use actix::Actor;
use actix_cors::Cors;
use actix_web::{
    self, App, HttpServer,
    middleware::{Logger, from_fn},
    web,
};
use std::{
    sync::{Arc, LazyLock},
    time::Duration,
};

use crate::{
    configs::{RedisCache, connect_database, run_migrations},
    constants::CHAT_PRUNE_INTERVAL_SECS,
    middlewares::{authentication, authorization},
    utils::TokenSettings,
    modules::{
        card::{repository_pg::CardRepositoryPg, service::CardService},
        card_sync::{service::CatalogSyncService, source::TcgApiClient},
        chat::{repository_pg::ChatRepositoryPg, service::ChatService},
        collection::{repository_pg::CollectionRepositoryPg, service::CollectionService},
        friend::{repository_pg::FriendRepositoryPg, service::FriendService},
        notification::{repository_pg::NotificationRepositoryPg, service::NotificationService},
        trade::{repository_pg::TradeRepositoryPg, service::TradeService},
        user::{repository_pg::UserRepositoryPg, schema::UserRole, service::UserService},
        websocket::{handler::websocket_handler, server::WebSocketServer},
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    log::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check(db_pool: web::Data<sqlx::PgPool>) -> &'static str {
    match sqlx::query("SELECT 1").execute(db_pool.get_ref()).await {
        Ok(_) => "Server is running",
        Err(_) => "Server is running, database unreachable",
    }
}

fn init_logging() {
    env_logger::init();
    // websocket and sync code log through `tracing`
    let subscriber = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        log::warn!("Tracing subscriber already set: {}", e);
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_logging();

    let db_pool =
        connect_database().await.map_err(|_| std::io::Error::other("Database connection error"))?;
    run_migrations(&db_pool).await.map_err(|_| std::io::Error::other("Database migration error"))?;

    let redis_pool =
        RedisCache::new().await.map_err(|_| std::io::Error::other("Redis connection error"))?;

    let user_repo = Arc::new(UserRepositoryPg::new(db_pool.clone()));
    let friend_repo = Arc::new(FriendRepositoryPg::new(db_pool.clone()));
    let card_repo = Arc::new(CardRepositoryPg::new(db_pool.clone()));
    let collection_repo = Arc::new(CollectionRepositoryPg::new(db_pool.clone()));
    let trade_repo = Arc::new(TradeRepositoryPg::new(db_pool.clone()));
    let notification_repo = Arc::new(NotificationRepositoryPg::new(db_pool.clone()));
    let chat_repo = Arc::new(ChatRepositoryPg::new(db_pool.clone()));

    let ws_server = WebSocketServer::new().start();

    let notification_service = NotificationService::with_dependencies(
        notification_repo,
        user_repo.clone(),
        Some(ws_server.clone()),
    );
    let user_service = UserService::with_dependencies(
        user_repo.clone(),
        friend_repo.clone(),
        Arc::new(redis_pool),
        TokenSettings::from_env(),
    );
    let friend_service = FriendService::with_dependencies(
        friend_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
    );
    let card_service = CardService::with_dependencies(card_repo.clone());
    let collection_service = CollectionService::with_dependencies(
        collection_repo.clone(),
        card_repo.clone(),
        user_repo.clone(),
    );
    let trade_service = TradeService::with_dependencies(
        trade_repo.clone(),
        collection_repo,
        user_repo.clone(),
        friend_repo.clone(),
        notification_service.clone(),
    );
    let chat_service = ChatService::with_dependencies(
        chat_repo,
        trade_repo,
        user_repo,
        friend_repo,
        notification_service.clone(),
    );

    let tcg_client = TcgApiClient::new()
        .map_err(|_| std::io::Error::other("Card catalog client initialization error"))?;
    let sync_service = CatalogSyncService::with_dependencies(Arc::new(tcg_client), card_repo);

    if ENV.card_sync_interval_hours > 0 {
        sync_service.spawn_periodic(Duration::from_secs(ENV.card_sync_interval_hours * 3600));
        log::info!("Card catalog sync scheduled every {}h", ENV.card_sync_interval_hours);
    }
    chat_service.spawn_prune_task(Duration::from_secs(CHAT_PRUNE_INTERVAL_SECS));

    log::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&ENV.frontend_url)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(friend_service.clone()))
            .app_data(web::Data::new(card_service.clone()))
            .app_data(web::Data::new(collection_service.clone()))
            .app_data(web::Data::new(trade_service.clone()))
            .app_data(web::Data::new(notification_service.clone()))
            .app_data(web::Data::new(chat_service.clone()))
            .app_data(web::Data::new(sync_service.clone()))
            .app_data(web::Data::new(ws_server.clone()))
            .app_data(web::Data::new(db_pool.clone()))
            .service(health_check)
            .route("/ws", web::get().to(websocket_handler))
            .service(
                web::scope("/api")
                    .configure(modules::user::route::public_api_configure)
                    .configure(modules::card::route::public_api_configure)
                    .service(
                        web::scope("/admin")
                            .wrap(from_fn(authorization(vec![UserRole::Admin])))
                            .wrap(from_fn(authentication))
                            .configure(modules::card_sync::route::admin_configure),
                    )
                    .service(
                        web::scope("")
                            .wrap(from_fn(authorization(vec![UserRole::User, UserRole::Admin])))
                            .wrap(from_fn(authentication))
                            .configure(modules::user::route::configure)
                            .configure(modules::friend::route::configure)
                            .configure(modules::collection::route::configure)
                            .configure(modules::trade::route::configure)
                            .configure(modules::notification::route::configure)
                            .configure(modules::chat::route::configure),
                    ),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(2)
    .run()
    .await
}
