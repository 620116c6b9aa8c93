use crate::auth::{
    jwt::JwtKeys,
    memory::MemoryUserStore,
    repo::{PgUserStore, UserStore},
};
use crate::config::{AppConfig, StoreConfig};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub keys: JwtKeys,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let users = match &config.store {
            StoreConfig::Postgres { database_url } => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(database_url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                info!("postgres user store ready");
                Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>
            }
            StoreConfig::Memory => {
                warn!("using in-memory user store; accounts are lost on restart");
                Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        Ok(Self::from_parts(users, config))
    }

    pub fn from_parts(users: Arc<dyn UserStore>, config: Arc<AppConfig>) -> Self {
        Self {
            keys: JwtKeys::new(&config.jwt),
            users,
            config,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{Environment, JwtConfig};

        let config = Arc::new(AppConfig {
            store: StoreConfig::Memory,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_days: 7,
            },
            environment: Environment::Development,
            host: "127.0.0.1".into(),
            port: 0,
            cors_allowed_origins: Vec::new(),
        });
        Self::from_parts(Arc::new(MemoryUserStore::new()), config)
    }
}
