use crate::Config;
use crate::llm::create_model;
use crate::preferences::{InMemoryPreferenceStore, PreferenceStore, SqlitePreferenceStore};
use crate::providers::create_collaborators;
use crate::storage::open_pool;
use crate::workflow::{
    AssistantContext, AssistantProfile, CheckpointStore, InMemoryCheckpointStore,
    SqliteCheckpointStore, WorkflowEngine,
};
use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Where workflow state and preference profiles live.
pub struct Stores {
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub pool: Option<SqlitePool>,
}

impl Stores {
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = open_pool(&config.database_path()).await?;
        Ok(Self {
            checkpoints: Arc::new(SqliteCheckpointStore::new(pool.clone()).await?),
            preferences: Arc::new(SqlitePreferenceStore::new(pool.clone()).await?),
            pool: Some(pool),
        })
    }

    pub fn ephemeral() -> Self {
        Self {
            checkpoints: Arc::new(InMemoryCheckpointStore::new()),
            preferences: Arc::new(InMemoryPreferenceStore::new()),
            pool: None,
        }
    }
}

pub fn build_engine(config: &Config, stores: &Stores) -> WorkflowEngine {
    let model = create_model(config);
    let collaborators = create_collaborators(config);
    let ctx = AssistantContext::new(
        model,
        &collaborators,
        Arc::clone(&stores.preferences),
        AssistantProfile::from_config(config),
    );
    tracing::debug!(
        mail = collaborators.mail.name(),
        calendar = collaborators.calendar.name(),
        checkpoints = stores.checkpoints.name(),
        preferences = stores.preferences.name(),
        "workflow engine assembled"
    );
    WorkflowEngine::new(ctx, Arc::clone(&stores.checkpoints))
}
