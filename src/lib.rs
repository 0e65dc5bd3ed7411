//! Nexus RAG
//!
//! Multimodal document chat over several LLM backends:
//! - Gemini and OpenAI over their REST APIs
//! - A local model served by an Ollama daemon, pulled on first use
//! - Whole-document prompting: every ready attachment rides along with each turn

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use domain::llm::ProgressCallback;
use domain::{CredentialProvider, KeyValueStore};
use infrastructure::{
    attachments::AttachmentLoader,
    credentials::EnvCredentialProvider,
    llm::{EngineSlot, LlmProviderFactory},
    services::ChatService,
    settings::SettingsRepository,
    storage::FileKeyValueStore,
};
use tracing::info;

/// Everything a front-end needs for one session
#[derive(Debug, Clone)]
pub struct AppContext {
    pub chat: ChatService,
    pub settings: Arc<SettingsRepository>,
    pub attachments: AttachmentLoader,
    pub engine_slot: Arc<EngineSlot>,
}

/// Build the context with settings stored in the configured file
pub fn create_app_context(
    config: &AppConfig,
    progress: Option<ProgressCallback>,
) -> anyhow::Result<AppContext> {
    let path = match &config.storage.path {
        Some(path) => path.clone(),
        None => FileKeyValueStore::default_path()?,
    };
    info!("Settings file: {}", path.display());

    create_app_context_with_store(config, Arc::new(FileKeyValueStore::new(path)), progress)
}

/// Build the context on top of an arbitrary settings store
pub fn create_app_context_with_store(
    config: &AppConfig,
    store: Arc<dyn KeyValueStore>,
    progress: Option<ProgressCallback>,
) -> anyhow::Result<AppContext> {
    let client = LlmProviderFactory::create_http_client(&config.http)?;
    let engine_slot = LlmProviderFactory::create_engine_slot(config, client.clone());
    let dispatcher =
        LlmProviderFactory::create_dispatcher(config, client, engine_slot.clone(), progress);

    info!(providers = ?dispatcher.registered(), "Dispatcher ready");

    let fallback: Arc<dyn CredentialProvider> = Arc::new(EnvCredentialProvider::default());

    Ok(AppContext {
        chat: ChatService::new(Arc::new(dispatcher)),
        settings: Arc::new(SettingsRepository::new(store, fallback)),
        attachments: AttachmentLoader::new(config.attachments.max_size_bytes),
        engine_slot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatSession, ProviderConfig, ProviderKind};
    use crate::infrastructure::storage::InMemoryKeyValueStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_context_round_trips_settings() {
        let ctx = create_app_context_with_store(
            &AppConfig::default(),
            Arc::new(InMemoryKeyValueStore::new()),
            None,
        )
        .unwrap();

        ctx.settings
            .save(&ProviderConfig::new(ProviderKind::Local, ""))
            .await
            .unwrap();

        assert_eq!(ctx.settings.load().await.unwrap().provider, ProviderKind::Local);
        assert!(!ctx.engine_slot.is_ready().await);
    }

    #[tokio::test]
    async fn test_missing_credential_fails_without_network() {
        let ctx = create_app_context_with_store(
            &AppConfig::default(),
            Arc::new(InMemoryKeyValueStore::new()),
            None,
        )
        .unwrap();

        let mut session = ChatSession::new();
        let config = ProviderConfig::new(ProviderKind::Google, "");
        let err = ctx.chat.send(&mut session, "hello", &config).await.unwrap_err();

        assert!(err.is_configuration());
        assert!(!session.is_pending());
    }

    #[test]
    fn test_context_uses_configured_storage_path() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.storage.path = Some(dir.path().join("settings.json"));

        assert!(create_app_context(&config, None).is_ok());
    }
}
