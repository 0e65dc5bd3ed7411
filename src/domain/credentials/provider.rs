use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::llm::ProviderKind;

/// Source of default credentials (environment, secret stores, ...)
#[async_trait]
pub trait CredentialProvider: Send + Sync + Debug {
    /// Credential for the provider, or `None` when the source has none
    async fn get_credential(&self, provider: ProviderKind) -> Option<String>;

    /// Get provider name for logging/debugging
    fn provider_name(&self) -> &'static str;
}
