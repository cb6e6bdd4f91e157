use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    config::Config,
    db::Cache,
    services::{
        assistant::{CompletionProvider, OpenAiCompatibleProvider},
        signals::{PgSignalStore, SignalStore},
    },
};

/// Shared application state
pub struct AppState {
    pub db_pool: PgPool,
    pub cache: Cache,
    pub signal_store: Arc<dyn SignalStore>,
    pub assistant: Arc<dyn CompletionProvider>,
    pub config: Config,
}

impl AppState {
    /// Wires the Postgres-backed signal store and the configured LLM provider
    pub fn new(config: Config, db_pool: PgPool, cache: Cache) -> Self {
        let signal_store = Arc::new(PgSignalStore::new(db_pool.clone()));
        let assistant = Arc::new(OpenAiCompatibleProvider::from_config(&config));

        Self {
            db_pool,
            cache,
            signal_store,
            assistant,
            config,
        }
    }
}
