use serde::Deserialize;
use std::sync::Arc;

use crate::domain::llm::ProviderKind;
use crate::domain::settings::{KeyValueStore, ProviderConfig};
use crate::domain::{CredentialProvider, DomainError};

/// Key under which the provider selection is stored
pub const SETTINGS_KEY: &str = "mm_rag_settings";

#[derive(Debug, Deserialize)]
struct StoredSettings {
    provider: String,
    #[serde(default)]
    credential: String,
}

/// Reads and writes the `ProviderConfig` entry, filling blank credentials
/// from the fallback credential source.
pub struct SettingsRepository {
    store: Arc<dyn KeyValueStore>,
    fallback: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for SettingsRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsRepository")
            .field("fallback", &self.fallback.provider_name())
            .finish()
    }
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, fallback: Arc<dyn CredentialProvider>) -> Self {
        Self { store, fallback }
    }

    /// Entry exactly as stored, without fallback credentials
    pub async fn stored(&self) -> Result<Option<ProviderConfig>, DomainError> {
        let Some(raw) = self.store.get(SETTINGS_KEY).await? else {
            return Ok(None);
        };

        let settings: StoredSettings = serde_json::from_str(&raw).map_err(|e| {
            DomainError::configuration(format!("Stored settings are not valid: {}", e))
        })?;

        let provider: ProviderKind = settings.provider.parse()?;
        Ok(Some(ProviderConfig::new(provider, settings.credential)))
    }

    /// Effective configuration: stored entry or defaults, with a blank
    /// credential replaced by the fallback source when it has one
    pub async fn load(&self) -> Result<ProviderConfig, DomainError> {
        let config = self.stored().await?.unwrap_or_default();
        Ok(self.apply_fallback(config).await)
    }

    pub async fn apply_fallback(&self, mut config: ProviderConfig) -> ProviderConfig {
        if config.has_credential() {
            return config;
        }

        if let Some(credential) = self.fallback.get_credential(config.provider).await {
            tracing::debug!(
                provider = %config.provider,
                source = self.fallback.provider_name(),
                "Using fallback credential"
            );
            config.credential = credential;
        }

        config
    }

    pub async fn save(&self, config: &ProviderConfig) -> Result<(), DomainError> {
        let raw = serde_json::to_string(config)
            .map_err(|e| DomainError::internal(format!("Failed to serialize settings: {}", e)))?;

        self.store.set(SETTINGS_KEY, &raw).await?;
        tracing::info!(provider = %config.provider, "Settings saved");
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), DomainError> {
        self.store.remove(SETTINGS_KEY).await
    }
}
