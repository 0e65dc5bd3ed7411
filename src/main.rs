use clap::Parser;
use nexus_rag::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ask(args) => cli::ask::run(args).await,
        Command::Chat(args) => cli::chat::run(args).await,
        Command::Settings(command) => cli::settings::run(command).await,
        Command::Warmup => cli::warmup::run().await,
    }
}
