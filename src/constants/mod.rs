/// Maximum allowed gap between the two sides of a trade, in percent.
pub const MAX_VALUE_DIFFERENCE_PERCENT: f64 = 10.0;

/// Chat messages expire this many days after they are sent.
pub const CHAT_MESSAGE_TTL_DAYS: i64 = 3;

pub const CHAT_PRUNE_INTERVAL_SECS: u64 = 3600;

pub const TCG_API_PAGE_SIZE: u32 = 250;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const USER_CACHE_TTL_SECS: usize = 3600;

pub struct Env {
    pub jwt_secret: String,
    pub access_token_expiration: u64,
    pub refresh_token_expiration: u64,
    pub database_url: String,
    pub redis_url: String,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
    pub tcg_api_url: String,
    pub tcg_api_key: Option<String>,
    pub tcg_api_timeout_secs: u64,
    pub card_sync_interval_hours: u64,
}

impl Env {
    fn new() -> Self {
        let jwt_secret = std::env::var("SECRET_KEY")
            .expect("SECRET_KEY must be set in .env file or environment variable");

        let access_token_expiration = std::env::var("ACCESS_TOKEN_EXPIRATION")
            .unwrap_or_else(|_| "900".to_string())
            .parse::<u64>()
            .expect("ACCESS_TOKEN_EXPIRATION must be a valid u64 integer");
        let refresh_token_expiration = std::env::var("REFRESH_TOKEN_EXPIRATION")
            .unwrap_or_else(|_| "604800".to_string())
            .parse::<u64>()
            .expect("REFRESH_TOKEN_EXPIRATION must be a valid u64 integer");

        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in .env file or environment variable");
        let redis_url = std::env::var("REDIS_URL")
            .expect("REDIS_URL must be set in .env file or environment variable");

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let ip = std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16 integer");

        let tcg_api_url = std::env::var("TCG_API_URL")
            .unwrap_or_else(|_| "https://api.pokemontcg.io/v2".to_string())
            .trim_end_matches('/')
            .to_string();
        let tcg_api_key = std::env::var("TCG_API_KEY").ok().filter(|k| !k.trim().is_empty());
        let tcg_api_timeout_secs = std::env::var("TCG_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .expect("TCG_API_TIMEOUT_SECS must be a valid u64 integer");
        let card_sync_interval_hours = std::env::var("CARD_SYNC_INTERVAL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse::<u64>()
            .expect("CARD_SYNC_INTERVAL_HOURS must be a valid u64 integer");

        Env {
            jwt_secret,
            access_token_expiration,
            refresh_token_expiration,
            database_url,
            redis_url,
            frontend_url,
            ip,
            port,
            tcg_api_url,
            tcg_api_key,
            tcg_api_timeout_secs,
            card_sync_interval_hours,
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
