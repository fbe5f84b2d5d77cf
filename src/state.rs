use std::sync::Arc;

use crate::{
    config::{AppConfig, StoreBackend},
    db::PgStore,
    members::repo::MemberRepo,
    memory::MemoryStore,
    orders::repo::OrderRepo,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub members: Arc<dyn MemberRepo>,
    pub orders: Arc<dyn OrderRepo>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        match config.store {
            StoreBackend::Postgres => {
                let store = Arc::new(PgStore::connect(&config).await?);
                store.migrate().await?;
                tracing::info!("using postgres store");
                Ok(Self::from_parts(config, store.clone(), store))
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        members: Arc<dyn MemberRepo>,
        orders: Arc<dyn OrderRepo>,
    ) -> Self {
        Self {
            config,
            members,
            orders,
        }
    }

    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        let store = Arc::new(MemoryStore::seeded());
        Self::from_parts(config, store.clone(), store)
    }

    /// Seeded in-memory state on a loopback config.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            store: StoreBackend::Memory,
            database_url: None,
            max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
        });
        Self::in_memory(config)
    }
}
