use crate::auth::{jwt::JwtKeys, repo::{PgUserStore, UserStore}};
use crate::cars::repo::{CarStore, PgCarStore};
use crate::config::AppConfig;
use crate::memory::MemoryStore;
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

/// Process-wide state, built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: Arc<JwtKeys>,
    pub users: Arc<dyn UserStore>,
    pub cars: Arc<dyn CarStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let Some(database_url) = config.database_url.as_deref() else {
            warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
            return Ok(Self::in_memory(config));
        };

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        info!("database ready");

        let keys = Arc::new(JwtKeys::from_config(&config.jwt));
        Ok(Self {
            config,
            keys,
            users: Arc::new(PgUserStore::new(db.clone())),
            cars: Arc::new(PgCarStore::new(db)),
        })
    }

    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let keys = Arc::new(JwtKeys::from_config(&config.jwt));
        Self {
            config,
            keys,
            users: store.clone(),
            cars: store,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{CarsConfig, JwtConfig};

        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test".into(),
                ttl_minutes: None,
            },
            cars: CarsConfig::default(),
            request_timeout_secs: 5,
        });
        Self::in_memory(config)
    }
}
