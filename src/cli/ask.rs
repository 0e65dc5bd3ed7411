//! Ask command - one question, one answer

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use super::{ProviderOverride, bootstrap, context, format_metrics, stderr_progress};
use crate::domain::ChatSession;

/// Arguments for the ask command
#[derive(Args, Clone, Debug)]
pub struct AskArgs {
    /// Question to ask
    pub prompt: String,

    /// Files to attach (repeatable)
    #[arg(short, long = "file")]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub provider: ProviderOverride,

    /// Print latency, tokens and sources to stderr
    #[arg(long)]
    pub metrics: bool,
}

/// Run the ask command
pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    let config = bootstrap();
    let ctx = context(&config, Some(stderr_progress()))?;

    let provider_config = args.provider.resolve(&ctx).await?;
    info!(provider = %provider_config.provider, "Asking");

    let mut session = ChatSession::new();
    for path in &args.files {
        session.add_attachment(ctx.attachments.load(path).await?);
    }

    let turn = ctx
        .chat
        .send(&mut session, &args.prompt, &provider_config)
        .await?;

    println!("{}", turn.content);

    if args.metrics {
        if let Some(metrics) = &turn.metrics {
            eprintln!("{}", format_metrics(metrics));
        }
    }

    Ok(())
}
