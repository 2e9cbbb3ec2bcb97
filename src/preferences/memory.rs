use super::traits::{Namespace, PreferenceRevision, PreferenceStore};
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
struct Inner {
    profiles: HashMap<Namespace, String>,
    history: Vec<PreferenceRevision>,
}

/// Process-local store for tests and the `--ephemeral` run mode.
#[derive(Default)]
pub struct InMemoryPreferenceStore {
    inner: Mutex<Inner>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get<'a>(
        &'a self,
        namespace: Namespace,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(inner.profiles.get(&namespace).cloned())
        })
    }

    fn insert_if_absent<'a>(
        &'a self,
        namespace: Namespace,
        profile: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(inner
                .profiles
                .entry(namespace)
                .or_insert_with(|| profile.to_string())
                .clone())
        })
    }

    fn replace<'a>(
        &'a self,
        namespace: Namespace,
        profile: &'a str,
        rationale: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.profiles.insert(namespace, profile.to_string());
            inner.history.push(PreferenceRevision {
                namespace,
                profile: profile.to_string(),
                rationale: rationale.to_string(),
                recorded_at: Utc::now().to_rfc3339(),
            });
            Ok(())
        })
    }

    fn history<'a>(
        &'a self,
        namespace: Namespace,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<PreferenceRevision>>> + Send + 'a>> {
        Box::pin(async move {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(inner
                .history
                .iter()
                .rev()
                .filter(|revision| revision.namespace == namespace)
                .take(limit)
                .cloned()
                .collect())
        })
    }
}
