use super::{Checkpoint, CheckpointStore};
use crate::workflow::state::RunStatus;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

/// Process-local checkpoints, lost on exit.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    threads: Mutex<HashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn save<'a>(
        &'a self,
        checkpoint: &'a Checkpoint,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.threads
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(checkpoint.thread_id.clone(), checkpoint.clone());
            Ok(())
        })
    }

    fn load<'a>(
        &'a self,
        thread_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Checkpoint>>> + Send + 'a>> {
        Box::pin(async move {
            Ok(self
                .threads
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(thread_id)
                .cloned())
        })
    }

    fn list<'a>(
        &'a self,
        status: RunStatus,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<Checkpoint>>> + Send + 'a>> {
        Box::pin(async move {
            let threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
            let mut matching: Vec<Checkpoint> = threads
                .values()
                .filter(|checkpoint| checkpoint.status == status)
                .cloned()
                .collect();
            matching.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
            Ok(matching)
        })
    }
}
