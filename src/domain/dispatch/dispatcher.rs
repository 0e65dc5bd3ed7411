use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::domain::DomainError;
use crate::domain::attachment::Attachment;
use crate::domain::chat::{ChatTurn, RetrievalMetric};
use crate::domain::llm::{Generation, LlmProvider, ProviderInfo, ProviderKind, RequestNormalizer};
use crate::domain::settings::ProviderConfig;

/// Selects the adapter for the configured provider and normalizes the outcome.
///
/// One attempt per call: no retries, no fallback to another provider, no
/// internal timeout.
pub struct Dispatcher {
    providers: HashMap<ProviderKind, Arc<dyn LlmProvider>>,
    normalizer: RequestNormalizer,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("providers", &self.registered())
            .field("normalizer", &self.normalizer)
            .finish()
    }
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn registered(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.providers.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    pub fn provider(&self, kind: ProviderKind) -> Option<&Arc<dyn LlmProvider>> {
        self.providers.get(&kind)
    }

    pub async fn generate(
        &self,
        history: &[ChatTurn],
        prompt: &str,
        attachments: &[Attachment],
        config: &ProviderConfig,
    ) -> Result<Generation, DomainError> {
        let started = Instant::now();

        let provider = self.providers.get(&config.provider).ok_or_else(|| {
            DomainError::configuration(format!(
                "No adapter registered for provider '{}'",
                config.provider
            ))
        })?;

        if provider.requires_credential() && !config.has_credential() {
            tracing::warn!(provider = %config.provider, "Refusing to dispatch without credential");
            return Err(DomainError::configuration(format!(
                "{} API key is missing. Add it in settings or set it in the environment.",
                config.provider.display_name()
            )));
        }

        let request = self.normalizer.normalize(history, prompt, attachments)?;

        tracing::debug!(
            provider = %config.provider,
            model = provider.model_name(),
            history_len = request.history.len(),
            sources = request.sources_count,
            "Dispatching generation"
        );

        let output = match provider.generate(&request, config.credential()).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(
                    provider = %config.provider,
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Generation failed"
                );
                return Err(e);
            }
        };

        let metrics = RetrievalMetric {
            latency_ms: started.elapsed().as_millis() as u64,
            tokens_used: output.tokens_used,
            sources_count: request.sources_count,
            model_name: provider.model_name().to_string(),
        };

        tracing::info!(
            provider = %config.provider,
            model = %metrics.model_name,
            latency_ms = metrics.latency_ms,
            tokens_used = metrics.tokens_used,
            sources = metrics.sources_count,
            "Generation completed"
        );

        Ok(Generation {
            text: output.text,
            metrics,
        })
    }
}

/// Builder for Dispatcher
#[derive(Default)]
pub struct DispatcherBuilder {
    providers: HashMap<ProviderKind, Arc<dyn LlmProvider>>,
    normalizer: RequestNormalizer,
}

impl DispatcherBuilder {
    /// Register an adapter under the kind it reports; replaces any previous one
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn normalizer(mut self, normalizer: RequestNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            providers: self.providers,
            normalizer: self.normalizer,
        }
    }
}
