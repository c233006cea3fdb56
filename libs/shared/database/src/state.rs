use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, DatabaseBackend};

use crate::memory::MemoryStore;
use crate::store::SchedulingStore;
use crate::supabase_store::SupabaseStore;

/// Per-process state handed to every handler: configuration plus the single
/// store handle created at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn SchedulingStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn SchedulingStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    pub fn from_config(config: AppConfig) -> Self {
        let store: Arc<dyn SchedulingStore> = match config.database_backend {
            DatabaseBackend::Memory => {
                info!("Using in-memory scheduling store");
                Arc::new(MemoryStore::new())
            }
            DatabaseBackend::Supabase => {
                info!("Using Supabase scheduling store at {}", config.supabase_url);
                Arc::new(SupabaseStore::new(&config))
            }
        };

        Self::new(config, store)
    }
}
