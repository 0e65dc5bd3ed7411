use async_trait::async_trait;
use std::collections::HashMap;
use std::env;

use crate::domain::CredentialProvider;
use crate::domain::llm::ProviderKind;

/// Environment variables consulted for one provider, first non-empty wins
#[derive(Debug, Clone)]
pub struct EnvMapping {
    pub vars: Vec<String>,
}

impl EnvMapping {
    pub fn new(api_key_var: impl Into<String>) -> Self {
        Self {
            vars: vec![api_key_var.into()],
        }
    }

    pub fn or_var(mut self, env_var: impl Into<String>) -> Self {
        self.vars.push(env_var.into());
        self
    }
}

/// Credential provider that reads from environment variables
#[derive(Debug)]
pub struct EnvCredentialProvider {
    mappings: HashMap<ProviderKind, EnvMapping>,
}

impl EnvCredentialProvider {
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
        }
    }

    pub fn with_mapping(mut self, provider: ProviderKind, mapping: EnvMapping) -> Self {
        self.mappings.insert(provider, mapping);
        self
    }

    pub fn with_defaults(mut self) -> Self {
        self.mappings.insert(
            ProviderKind::Google,
            EnvMapping::new("GEMINI_API_KEY").or_var("API_KEY"),
        );

        self.mappings.insert(
            ProviderKind::OpenAi,
            EnvMapping::new("OPENAI_API_KEY").or_var("VITE_OPENAI_API_KEY"),
        );

        self
    }

    fn read_credential(&self, provider: ProviderKind) -> Option<String> {
        let mapping = self.mappings.get(&provider)?;

        mapping.vars.iter().find_map(|var| {
            env::var(var)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
    }
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new().with_defaults()
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn get_credential(&self, provider: ProviderKind) -> Option<String> {
        let credential = self.read_credential(provider);
        if credential.is_some() {
            tracing::debug!(provider = %provider, "Using credential from environment");
        }
        credential
    }

    fn provider_name(&self) -> &'static str {
        "env"
    }
}
