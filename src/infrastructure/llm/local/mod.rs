//! Local inference: an engine slot plus the adapter that dispatches to it

mod ollama;
mod slot;

pub use ollama::{DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL, OllamaEngine, OllamaLoader};
pub use slot::EngineSlot;

#[cfg(test)]
pub(crate) use slot::mock as engine_mock;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::domain::DomainError;
use crate::domain::llm::{
    EngineReply, GenerationParams, Message, NormalizedRequest, ProgressCallback, ProviderAdapter,
    ProviderInfo, ProviderKind, ProviderOutput,
};

/// Messages and sampling options handed to the local engine
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPayload {
    pub messages: Vec<Message>,
    pub params: GenerationParams,
}

/// Adapter for a model running on this machine. Needs no credential.
pub struct LocalProvider {
    slot: Arc<EngineSlot>,
    params: GenerationParams,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for LocalProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalProvider")
            .field("slot", &self.slot)
            .field("has_progress", &self.progress.is_some())
            .finish()
    }
}

impl LocalProvider {
    pub fn new(slot: Arc<EngineSlot>) -> Self {
        Self {
            slot,
            params: GenerationParams::default(),
            progress: None,
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl ProviderInfo for LocalProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn model_name(&self) -> &str {
        self.slot.model_id()
    }

    fn requires_credential(&self) -> bool {
        false
    }
}

#[async_trait]
impl ProviderAdapter for LocalProvider {
    type Payload = LocalPayload;
    type Response = EngineReply;

    fn encode(&self, request: &NormalizedRequest) -> LocalPayload {
        LocalPayload {
            messages: request.to_chat_messages(&self.params.system_instruction),
            params: self.params.clone(),
        }
    }

    async fn invoke(
        &self,
        payload: LocalPayload,
        _credential: Option<&str>,
    ) -> Result<EngineReply, DomainError> {
        let engine = self.slot.acquire(self.progress.clone()).await?;

        engine
            .complete(&payload.messages, &payload.params)
            .await
            .map_err(|e| {
                let detail = match e {
                    DomainError::Transport { message, .. } => message,
                    other => other.to_string(),
                };
                DomainError::transport("local", format!("Local inference failed: {}", detail))
            })
    }

    fn decode(&self, response: EngineReply) -> ProviderOutput {
        let tokens = response.prompt_tokens + response.completion_tokens;
        ProviderOutput::from_optional_text(response.content, tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::slot::mock::{CountingLoader, StaticEngine};
    use super::*;
    use crate::domain::llm::{ContentPart, LlmProvider, MessageRole, NO_RESPONSE_TEXT};

    fn request() -> NormalizedRequest {
        NormalizedRequest {
            history: vec![Message::user("Hi"), Message::assistant("Hello")],
            attachment_parts: vec![ContentPart::text("[Document: a.txt]\nalpha")],
            prompt: "What is alpha?".to_string(),
            sources_count: 1,
        }
    }

    fn provider_with(engine: Arc<StaticEngine>) -> (LocalProvider, Arc<CountingLoader>) {
        let loader = Arc::new(CountingLoader::new(engine));
        let slot = Arc::new(EngineSlot::new(loader.clone(), "llama3.2:3b"));
        (LocalProvider::new(slot), loader)
    }

    #[tokio::test]
    async fn test_local_generate_sums_tokens() {
        let engine = Arc::new(StaticEngine::replying("llama3.2:3b", Some("alpha is a"), 12, 4));
        let (provider, loader) = provider_with(engine.clone());

        let output = provider.generate(&request(), None).await.unwrap();

        assert_eq!(output.text, "alpha is a");
        assert_eq!(output.tokens_used, 16);
        assert_eq!(provider.model_name(), "llama3.2:3b");
        assert!(!provider.requires_credential());
        assert_eq!(loader.load_count(), 1);

        let seen = engine.seen.lock().unwrap();
        let roles: Vec<_> = seen[0].iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
    }

    #[tokio::test]
    async fn test_engine_loaded_once_across_calls() {
        let engine = Arc::new(StaticEngine::replying("llama3.2:3b", Some("ok"), 1, 1));
        let (provider, loader) = provider_with(engine);

        provider.generate(&request(), None).await.unwrap();
        provider.generate(&request(), None).await.unwrap();

        assert_eq!(loader.load_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_content_resolves_with_fallback() {
        let engine = Arc::new(StaticEngine::replying("llama3.2:3b", None, 0, 0));
        let (provider, _) = provider_with(engine);

        let output = provider.generate(&request(), None).await.unwrap();
        assert_eq!(output.text, NO_RESPONSE_TEXT);
    }

    #[tokio::test]
    async fn test_engine_failure_is_wrapped() {
        let engine = Arc::new(StaticEngine::failing("llama3.2:3b", "out of memory"));
        let (provider, _) = provider_with(engine);

        let err = provider.generate(&request(), None).await.unwrap_err();

        assert_eq!(err.provider_name(), Some("local"));
        assert!(err.to_string().contains("Local inference failed"));
        assert!(err.to_string().contains("out of memory"));
    }

    #[tokio::test]
    async fn test_load_failure_surfaces_as_initialization() {
        let engine = Arc::new(StaticEngine::replying("llama3.2:3b", Some("ok"), 1, 1));
        let loader = Arc::new(CountingLoader::new(engine).failing_times(1));
        let slot = Arc::new(EngineSlot::new(loader, "llama3.2:3b"));
        let provider = LocalProvider::new(slot.clone());

        let err = provider.generate(&request(), None).await.unwrap_err();

        assert!(matches!(err, DomainError::Initialization { .. }));
        assert!(!slot.is_ready().await);
    }
}
