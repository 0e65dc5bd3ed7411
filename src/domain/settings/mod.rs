//! Provider selection and its local persistence seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(test)]
use mockall::automock;

use crate::domain::DomainError;
use crate::domain::llm::ProviderKind;

/// Which provider to call and with which credential
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    #[serde(default)]
    pub credential: String,
}

impl ProviderConfig {
    pub fn new(provider: ProviderKind, credential: impl Into<String>) -> Self {
        Self {
            provider,
            credential: credential.into(),
        }
    }

    pub fn has_credential(&self) -> bool {
        !self.credential.trim().is_empty()
    }

    /// Credential as passed to adapters; blank means absent
    pub fn credential(&self) -> Option<&str> {
        if self.has_credential() {
            Some(self.credential.trim())
        } else {
            None
        }
    }

    /// Credential with everything but the last four characters hidden
    pub fn masked_credential(&self) -> String {
        let key = self.credential.trim();
        if key.is_empty() {
            return "(not set)".to_string();
        }

        let visible: String = key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{}", visible)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(ProviderKind::OpenAi, "")
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("credential", &self.masked_credential())
            .finish()
    }
}

/// Local key-value storage of opaque text entries
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError>;

    async fn remove(&self, key: &str) -> Result<(), DomainError>;
}
