use super::traits::{Namespace, PreferenceStore};
use crate::llm::{ModelCapability, ProviderMessage, messages_to_text};
use crate::prompt::memory_update_prompt;
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::info;

/// Preference reads and model-assisted merges over a [`PreferenceStore`].
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
    model: Arc<dyn ModelCapability>,
}

impl Preferences {
    pub fn new(store: Arc<dyn PreferenceStore>, model: Arc<dyn ModelCapability>) -> Self {
        Self { store, model }
    }

    pub fn store(&self) -> &Arc<dyn PreferenceStore> {
        &self.store
    }

    /// Stored profile, or `default` persisted as the first value. An empty
    /// stored profile is treated as absent.
    pub async fn get_or_default(&self, namespace: Namespace, default: &str) -> Result<String> {
        if let Some(profile) = self.store.get(namespace).await?
            && !profile.trim().is_empty()
        {
            return Ok(profile);
        }
        let stored = self.store.insert_if_absent(namespace, default).await?;
        if stored.trim().is_empty() {
            return Ok(default.to_string());
        }
        Ok(stored)
    }

    /// Ask the model for a complete replacement of the namespace profile,
    /// given the rationale messages, and store it. Returns the new profile.
    pub async fn merge_update(
        &self,
        namespace: Namespace,
        rationale: &[ProviderMessage],
    ) -> Result<String> {
        let current = self
            .get_or_default(namespace, namespace.default_profile())
            .await?;
        let system_prompt = memory_update_prompt(&current, namespace.label())?;

        let updated = self
            .model
            .merge_profile(&system_prompt, rationale)
            .await
            .with_context(|| format!("preference merge for {namespace} failed"))?;
        let updated = updated.trim();
        if updated.is_empty() {
            bail!("preference merge for {namespace} returned an empty profile");
        }

        self.store
            .replace(namespace, updated, &messages_to_text(rationale))
            .await?;
        info!(%namespace, chars = updated.len(), "preference profile updated");
        Ok(updated.to_string())
    }
}
