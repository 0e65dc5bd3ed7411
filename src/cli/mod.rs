//! CLI module for Nexus RAG
//!
//! Subcommands:
//! - `ask`: one question, answer on stdout
//! - `chat`: interactive session with attachments
//! - `settings`: show or change the stored provider selection
//! - `warmup`: load the local model ahead of time

pub mod ask;
pub mod chat;
pub mod settings;
pub mod warmup;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::domain::llm::ProgressCallback;
use crate::domain::{ProviderConfig, ProviderKind, RetrievalMetric};
use crate::infrastructure::logging;
use crate::{AppContext, create_app_context};

/// Nexus RAG - chat with your documents through Gemini, OpenAI or a local model
#[derive(Parser)]
#[command(name = "nexus-rag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ask a single question about some files
    Ask(ask::AskArgs),

    /// Start an interactive chat session
    Chat(chat::ChatArgs),

    /// Show or change provider settings
    #[command(subcommand)]
    Settings(settings::SettingsCommand),

    /// Download and initialize the local model
    Warmup,
}

/// Provider overrides shared by `ask` and `chat`; never persisted
#[derive(clap::Args, Clone, Debug, Default)]
pub struct ProviderOverride {
    /// Provider to use for this run (google, openai, local)
    #[arg(long)]
    pub provider: Option<ProviderKind>,

    /// API key to use for this run
    #[arg(long, env = "NEXUS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl ProviderOverride {
    /// Stored settings with this run's overrides applied
    pub async fn resolve(&self, ctx: &AppContext) -> anyhow::Result<ProviderConfig> {
        let mut config = ctx.settings.load().await?;

        if let Some(provider) = self.provider {
            if provider != config.provider {
                // The stored key belongs to the stored provider
                config = ProviderConfig::new(provider, "");
            }
        }

        if let Some(key) = &self.api_key {
            config.credential = key.clone();
        }

        Ok(ctx.settings.apply_fallback(config).await)
    }
}

/// Load `.env`, configuration and logging
pub fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let (config, load_error) = config_or_default(AppConfig::load());
    logging::init_logging(&config.logging);

    // Logging only exists once the config is known, so the warning comes after init
    if let Some(e) = load_error {
        tracing::warn!(error = %e, "Invalid configuration, falling back to defaults");
    }

    config
}

fn config_or_default(
    loaded: Result<AppConfig, ::config::ConfigError>,
) -> (AppConfig, Option<::config::ConfigError>) {
    match loaded {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    }
}

pub fn context(config: &AppConfig, progress: Option<ProgressCallback>) -> anyhow::Result<AppContext> {
    create_app_context(config, progress)
}

/// Progress lines for local model downloads, written to stderr
pub fn stderr_progress() -> ProgressCallback {
    Arc::new(|line: &str| eprintln!("[local] {}", line))
}

pub fn format_metrics(metrics: &RetrievalMetric) -> String {
    format!(
        "{} | {} ms | {} tokens | {} sources",
        metrics.model_name, metrics.latency_ms, metrics.tokens_used, metrics.sources_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::UnparsedDocumentPolicy;

    fn parse(toml: &str) -> Result<AppConfig, ::config::ConfigError> {
        ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn test_invalid_config_is_reported_not_swallowed() {
        let (config, error) = config_or_default(parse(
            r#"
            [attachments]
            unparsed_policy = "Reject"
            "#,
        ));

        assert!(error.is_some());
        assert_eq!(
            config.attachments.unparsed_policy,
            UnparsedDocumentPolicy::Placeholder
        );
    }

    #[test]
    fn test_valid_config_passes_through() {
        let (config, error) = config_or_default(parse(
            r#"
            [attachments]
            unparsed_policy = "reject"
            "#,
        ));

        assert!(error.is_none());
        assert_eq!(config.attachments.unparsed_policy, UnparsedDocumentPolicy::Reject);
    }
}
