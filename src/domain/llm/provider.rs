use async_trait::async_trait;
use std::fmt::Debug;

use super::{NormalizedRequest, ProviderKind, ProviderOutput};
use crate::domain::DomainError;

/// Identity shared by typed adapters and erased providers
pub trait ProviderInfo: Send + Sync + Debug {
    fn kind(&self) -> ProviderKind;

    /// Model name reported in metrics
    fn model_name(&self) -> &str;

    fn requires_credential(&self) -> bool {
        true
    }
}

/// Typed capability set of one backend: encode, invoke, decode.
///
/// Payload and response are explicit structs per provider, validated at this
/// boundary before anything else sees them.
#[async_trait]
pub trait ProviderAdapter: ProviderInfo {
    type Payload: Send + 'static;
    type Response: Send + 'static;

    /// Convert the normalized request into the provider's call shape
    fn encode(&self, request: &NormalizedRequest) -> Self::Payload;

    /// Perform the network or local-inference call
    async fn invoke(
        &self,
        payload: Self::Payload,
        credential: Option<&str>,
    ) -> Result<Self::Response, DomainError>;

    /// Extract text and token usage; never fails
    fn decode(&self, response: Self::Response) -> ProviderOutput;
}

/// Object-safe provider used by the dispatcher registry
#[async_trait]
pub trait LlmProvider: ProviderInfo {
    async fn generate(
        &self,
        request: &NormalizedRequest,
        credential: Option<&str>,
    ) -> Result<ProviderOutput, DomainError>;
}

#[async_trait]
impl<A> LlmProvider for A
where
    A: ProviderAdapter,
{
    async fn generate(
        &self,
        request: &NormalizedRequest,
        credential: Option<&str>,
    ) -> Result<ProviderOutput, DomainError> {
        let payload = self.encode(request);
        let response = self.invoke(payload, credential).await?;
        Ok(self.decode(response))
    }
}

/// Return the credential or fail before any transport is touched
pub fn require_credential(
    kind: ProviderKind,
    credential: Option<&str>,
) -> Result<&str, DomainError> {
    match credential.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(DomainError::configuration(format!(
            "{} API key is missing. Add it in settings or set it in the environment.",
            kind.display_name()
        ))),
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Adapter that records what it was asked to send
    #[derive(Debug)]
    pub struct MockAdapter {
        kind: ProviderKind,
        model: String,
        requires_credential: bool,
        text: Option<String>,
        tokens: u64,
        error: Option<String>,
        invocations: AtomicUsize,
        last_payload: Mutex<Option<NormalizedRequest>>,
    }

    impl MockAdapter {
        pub fn new(kind: ProviderKind) -> Self {
            Self {
                kind,
                model: "mock-model".to_string(),
                requires_credential: kind != ProviderKind::Local,
                text: None,
                tokens: 0,
                error: None,
                invocations: AtomicUsize::new(0),
                last_payload: Mutex::new(None),
            }
        }

        pub fn with_text(mut self, text: impl Into<String>, tokens: u64) -> Self {
            self.text = Some(text.into());
            self.tokens = tokens;
            self
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        pub fn with_model(mut self, model: impl Into<String>) -> Self {
            self.model = model.into();
            self
        }

        pub fn invocations(&self) -> usize {
            self.invocations.load(Ordering::SeqCst)
        }

        pub fn last_payload(&self) -> Option<NormalizedRequest> {
            self.last_payload.lock().unwrap().clone()
        }
    }

    impl ProviderInfo for MockAdapter {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn model_name(&self) -> &str {
            &self.model
        }

        fn requires_credential(&self) -> bool {
            self.requires_credential
        }
    }

    #[async_trait]
    impl ProviderAdapter for MockAdapter {
        type Payload = NormalizedRequest;
        type Response = Option<String>;

        fn encode(&self, request: &NormalizedRequest) -> NormalizedRequest {
            request.clone()
        }

        async fn invoke(
            &self,
            payload: NormalizedRequest,
            _credential: Option<&str>,
        ) -> Result<Option<String>, DomainError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            *self.last_payload.lock().unwrap() = Some(payload);

            if let Some(ref error) = self.error {
                return Err(DomainError::transport(self.kind.as_str(), error));
            }

            Ok(self.text.clone())
        }

        fn decode(&self, response: Option<String>) -> ProviderOutput {
            ProviderOutput::from_optional_text(response, self.tokens)
        }
    }
}
