use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{MemoryUserRepo, PgUserRepo, UserRepo};
use crate::config::AppConfig;
use crate::db;
use crate::tasks::repo::{MemoryTaskRepo, PgTaskRepo, TaskRepo};

/// Everything a handler needs, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepo>,
    pub tasks: Arc<dyn TaskRepo>,
    pub jwt: JwtKeys,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Connects the configured store: Postgres when `database_url` is set,
    /// otherwise the in-memory one.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let Some(url) = config.database_url.clone() else {
            warn!("DATABASE_URL not set; using in-memory store, data is lost on restart");
            return Ok(Self::in_memory(config));
        };

        let pool = db::connect(&url, config.db_max_connections).await?;
        db::migrate(&pool).await?;
        info!("connected to postgres");

        Ok(Self::from_parts(
            Arc::new(PgUserRepo::new(pool.clone())),
            Arc::new(PgTaskRepo::new(pool)),
            config,
        ))
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_parts(
            Arc::new(MemoryUserRepo::new()),
            Arc::new(MemoryTaskRepo::new()),
            config,
        )
    }

    pub fn from_parts(
        users: Arc<dyn UserRepo>,
        tasks: Arc<dyn TaskRepo>,
        config: AppConfig,
    ) -> Self {
        Self {
            users,
            tasks,
            jwt: JwtKeys::new(&config.jwt),
            config: Arc::new(config),
        }
    }
}
