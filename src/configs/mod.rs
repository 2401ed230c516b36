use deadpool_redis::{Runtime, redis::AsyncCommands};
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{ENV, api::error};

pub async fn connect_database() -> Result<PgPool, error::SystemError> {
    let database_url = &ENV.database_url;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_slow_threshold(std::time::Duration::from_secs(3))
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), error::SystemError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| error::SystemError::InternalError(Box::new(e)))?;
    log::info!("Database migrations applied");
    Ok(())
}

/// Byte-level key/value store with expiry, used for profile caching and refresh tokens.
#[async_trait::async_trait]
pub trait CacheStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, error::SystemError>;

    async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        expiration: usize,
    ) -> Result<(), error::SystemError>;

    /// True when the key existed.
    async fn delete(&self, key: &str) -> Result<bool, error::SystemError>;
}

impl dyn CacheStore + Send + Sync {
    pub async fn get<T>(&self, key: &str) -> Result<Option<T>, error::SystemError>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.get_raw(key).await? {
            Some(v) => Ok(Some(serde_json::from_slice(&v)?)),
            None => Ok(None),
        }
    }

    pub async fn set<T>(
        &self,
        key: &str,
        value: &T,
        expiration: usize,
    ) -> Result<(), error::SystemError>
    where
        T: serde::Serialize,
    {
        let serialized = serde_json::to_vec(value)?;
        self.set_raw(key, serialized, expiration).await
    }
}

pub struct RedisCache {
    pool: deadpool_redis::Pool,
}

impl RedisCache {
    pub async fn new() -> Result<Self, error::SystemError> {
        let mut cfg = deadpool_redis::Config::from_url(&ENV.redis_url);
        cfg.pool = Some(deadpool_redis::PoolConfig { max_size: 16, ..Default::default() });
        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl CacheStore for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, error::SystemError> {
        let mut conn = self.pool.get().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        expiration: usize,
    ) -> Result<(), error::SystemError> {
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(key, value, expiration as u64).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, error::SystemError> {
        let mut conn = self.pool.get().await?;
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }
}
