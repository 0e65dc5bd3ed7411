use std::sync::Arc;
use std::time::Duration;

use super::gemini::GeminiProvider;
use super::http_client::HttpClient;
use super::local::{EngineSlot, LocalProvider, OllamaLoader};
use super::openai::OpenAiProvider;
use crate::config::{AppConfig, HttpConfig};
use crate::domain::llm::{ProgressCallback, RequestNormalizer};
use crate::domain::{DomainError, Dispatcher};

/// Builds the provider registry from configuration
#[derive(Debug)]
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    pub fn create_http_client(config: &HttpConfig) -> Result<HttpClient, DomainError> {
        match config.timeout_secs {
            Some(secs) => HttpClient::with_timeout(Duration::from_secs(secs)),
            None => Ok(HttpClient::new()),
        }
    }

    /// Engine slot for the configured local model, backed by Ollama
    pub fn create_engine_slot(config: &AppConfig, client: HttpClient) -> Arc<EngineSlot> {
        let local = &config.providers.local;
        let loader = OllamaLoader::with_base_url(client, &local.base_url);
        Arc::new(EngineSlot::new(Arc::new(loader), &local.model))
    }

    /// Dispatcher with every built-in provider registered
    pub fn create_dispatcher(
        config: &AppConfig,
        client: HttpClient,
        engine_slot: Arc<EngineSlot>,
        progress: Option<ProgressCallback>,
    ) -> Dispatcher {
        let params = config.generation.params();
        let providers = &config.providers;

        let google = GeminiProvider::with_base_url(client.clone(), &providers.google.base_url)
            .with_model(&providers.google.model)
            .with_params(params.clone());

        let openai = OpenAiProvider::with_base_url(client, &providers.openai.base_url)
            .with_model(&providers.openai.model)
            .with_params(params.clone());

        let mut local = LocalProvider::new(engine_slot).with_params(params);
        if let Some(progress) = progress {
            local = local.with_progress(progress);
        }

        Dispatcher::builder()
            .provider(Arc::new(google))
            .provider(Arc::new(openai))
            .provider(Arc::new(local))
            .normalizer(RequestNormalizer::with_policy(
                config.attachments.unparsed_policy,
            ))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::{ProviderInfo, ProviderKind, UnparsedDocumentPolicy};

    fn build(config: &AppConfig) -> Dispatcher {
        let client = LlmProviderFactory::create_http_client(&config.http).unwrap();
        let slot = LlmProviderFactory::create_engine_slot(config, client.clone());
        LlmProviderFactory::create_dispatcher(config, client, slot, None)
    }

    #[test]
    fn test_all_providers_registered() {
        let dispatcher = build(&AppConfig::default());

        assert_eq!(
            dispatcher.registered(),
            vec![ProviderKind::Google, ProviderKind::Local, ProviderKind::OpenAi]
        );
    }

    #[test]
    fn test_models_follow_config() {
        let mut config = AppConfig::default();
        config.providers.openai.model = "gpt-4o-mini".to_string();
        config.providers.local.model = "qwen2.5:7b".to_string();

        let dispatcher = build(&config);

        let openai = dispatcher.provider(ProviderKind::OpenAi).unwrap();
        assert_eq!(openai.model_name(), "gpt-4o-mini");

        let local = dispatcher.provider(ProviderKind::Local).unwrap();
        assert_eq!(local.model_name(), "qwen2.5:7b");
        assert!(!local.requires_credential());
    }

    #[test]
    fn test_http_client_with_timeout() {
        let config = HttpConfig {
            timeout_secs: Some(30),
        };
        assert!(LlmProviderFactory::create_http_client(&config).is_ok());
    }

    #[tokio::test]
    async fn test_reject_policy_from_config() {
        let mut config = AppConfig::default();
        config.attachments.unparsed_policy = UnparsedDocumentPolicy::Reject;
        let dispatcher = build(&config);

        let attachments = vec![crate::domain::Attachment::from_bytes(
            "scan.pdf",
            "application/pdf",
            b"%PDF-1.7",
        )];
        let settings = crate::domain::ProviderConfig::new(ProviderKind::Local, "");

        let err = dispatcher
            .generate(&[], "read it", &attachments, &settings)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation { .. }));
    }
}
