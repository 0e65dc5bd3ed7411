//! Settings command - inspect and change the stored provider selection

use clap::Subcommand;

use super::{bootstrap, context};
use crate::domain::{ProviderConfig, ProviderKind};

#[derive(Subcommand, Clone, Debug)]
pub enum SettingsCommand {
    /// Print the effective provider and a masked key
    Show,

    /// Store a provider and optionally its API key
    Set {
        /// google, openai or local
        #[arg(long)]
        provider: ProviderKind,

        /// API key; leave out to rely on the environment
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Remove stored settings
    Clear,
}

/// Run a settings subcommand
pub async fn run(command: SettingsCommand) -> anyhow::Result<()> {
    let config = bootstrap();
    let ctx = context(&config, None)?;

    match command {
        SettingsCommand::Show => {
            let effective = ctx.settings.load().await?;
            let stored = ctx.settings.stored().await?;

            println!("provider:   {}", effective.provider);
            println!("model:      {}", model_for(&config, effective.provider));
            println!("api key:    {}", effective.masked_credential());
            if stored.as_ref().is_none_or(|s| !s.has_credential()) && effective.has_credential() {
                println!("            (from environment)");
            }
        }
        SettingsCommand::Set { provider, api_key } => {
            let settings = ProviderConfig::new(provider, api_key.unwrap_or_default());
            ctx.settings.save(&settings).await?;
            println!("Saved: {} {}", settings.provider, settings.masked_credential());
        }
        SettingsCommand::Clear => {
            ctx.settings.clear().await?;
            println!("Settings cleared");
        }
    }

    Ok(())
}

fn model_for(config: &crate::AppConfig, provider: ProviderKind) -> &str {
    match provider {
        ProviderKind::Google => &config.providers.google.model,
        ProviderKind::OpenAi => &config.providers.openai.model,
        ProviderKind::Local => &config.providers.local.model,
    }
}
