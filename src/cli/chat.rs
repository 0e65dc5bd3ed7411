//! Chat command - interactive session over stdin

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{ProviderOverride, bootstrap, context, format_metrics, stderr_progress};
use crate::AppContext;
use crate::domain::{AttachmentStatus, ChatSession, ProviderConfig, ProviderKind};
use crate::infrastructure::llm::EngineSlot;

/// Arguments for the chat command
#[derive(Args, Clone, Debug)]
pub struct ChatArgs {
    /// Files to attach before the first prompt (repeatable)
    #[arg(short, long = "file")]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub provider: ProviderOverride,
}

const HELP: &str = "\
Commands:
  /attach <path>    add a file to the session
  /detach <n>       remove attachment number n
  /files            list attachments
  /provider <name>  switch provider for this session (google, openai, local)
  /clear            forget history and attachments, unload the local model
  /quit             leave";

/// A line typed at the prompt
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Prompt(&'a str),
    Attach(&'a str),
    Detach(&'a str),
    Files,
    Provider(&'a str),
    Clear,
    Help,
    Quit,
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    let Some(command) = line.strip_prefix('/') else {
        return Input::Prompt(line);
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "attach" => Input::Attach(arg),
        "detach" => Input::Detach(arg),
        "files" => Input::Files,
        "provider" => Input::Provider(arg),
        "clear" => Input::Clear,
        "quit" | "exit" => Input::Quit,
        _ => Input::Help,
    }
}

/// Run the interactive chat
pub async fn run(args: ChatArgs) -> anyhow::Result<()> {
    let config = bootstrap();
    let ctx = context(&config, Some(stderr_progress()))?;
    let mut provider_config = args.provider.resolve(&ctx).await?;

    let mut session = ChatSession::new();
    for path in &args.files {
        attach(&ctx, &mut session, path).await;
    }

    eprintln!(
        "Chatting with {} ({} attachments). /help for commands.",
        provider_config.provider.display_name(),
        session.attachments().len()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("> ");
        std::io::stderr().flush().ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::Help => eprintln!("{}", HELP),
            Input::Files => list_files(&session),
            Input::Clear => {
                clear_session(&mut session, &ctx.engine_slot).await;
                eprintln!("Session cleared");
            }
            Input::Attach(path) => attach(&ctx, &mut session, path).await,
            Input::Detach(index) => detach(&mut session, index),
            Input::Provider(name) => match name.parse::<ProviderKind>() {
                Ok(kind) => {
                    let switched = ProviderConfig::new(kind, "");
                    provider_config = ctx.settings.apply_fallback(switched).await;
                    eprintln!("Using {}", kind.display_name());
                }
                Err(e) => eprintln!("{}", e),
            },
            Input::Prompt(prompt) => {
                match ctx.chat.send(&mut session, prompt, &provider_config).await {
                    Ok(turn) => {
                        println!("{}\n", turn.content);
                        if let Some(metrics) = &turn.metrics {
                            eprintln!("  {}", format_metrics(metrics));
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
        }
    }

    Ok(())
}

/// Start over: history, attachments and the loaded local engine all go
async fn clear_session(session: &mut ChatSession, slot: &EngineSlot) {
    session.clear();
    slot.reset().await;
}

async fn attach(ctx: &AppContext, session: &mut ChatSession, path: impl AsRef<std::path::Path>) {
    match ctx.attachments.load(path).await {
        Ok(attachment) => {
            eprintln!("Attached {} ({})", attachment.name(), attachment.mime_type());
            session.add_attachment(attachment);
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn detach(session: &mut ChatSession, index: &str) {
    let id = index
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| session.attachments().get(i))
        .map(|a| *a.id());

    match id.and_then(|id| session.remove_attachment(&id)) {
        Some(removed) => eprintln!("Removed {}", removed.name()),
        None => eprintln!("No attachment number '{}'", index),
    }
}

fn list_files(session: &ChatSession) {
    if session.attachments().is_empty() {
        eprintln!("No attachments");
        return;
    }

    for (i, attachment) in session.attachments().iter().enumerate() {
        let status = match attachment.status() {
            AttachmentStatus::Ready => "ready",
            AttachmentStatus::Uploading => "uploading",
            AttachmentStatus::Error => "error",
        };
        eprintln!(
            "  {}. {} ({}, {} bytes, {})",
            i + 1,
            attachment.name(),
            attachment.mime_type(),
            attachment.size_bytes(),
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Attachment;
    use crate::infrastructure::llm::local::engine_mock::{CountingLoader, StaticEngine};
    use std::sync::Arc;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("  what is this? "), Input::Prompt("what is this?"));
        assert_eq!(parse_input("/attach ./a b.txt"), Input::Attach("./a b.txt"));
        assert_eq!(parse_input("/detach 2"), Input::Detach("2"));
        assert_eq!(parse_input("/provider local"), Input::Provider("local"));
        assert_eq!(parse_input("/files"), Input::Files);
        assert_eq!(parse_input("/exit"), Input::Quit);
        assert_eq!(parse_input("/bogus"), Input::Help);
        assert_eq!(parse_input("   "), Input::Empty);
    }

    #[test]
    fn test_detach_by_position() {
        let mut session = ChatSession::new();
        session.add_attachment(Attachment::from_bytes("a.txt", "text/plain", b"a"));
        session.add_attachment(Attachment::from_bytes("b.txt", "text/plain", b"b"));

        detach(&mut session, "1");
        assert_eq!(session.attachments().len(), 1);
        assert_eq!(session.attachments()[0].name(), "b.txt");

        detach(&mut session, "5");
        detach(&mut session, "x");
        assert_eq!(session.attachments().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_unloads_local_engine() {
        let engine = Arc::new(StaticEngine::replying("llama3.2:3b", Some("ok"), 1, 1));
        let loader = Arc::new(CountingLoader::new(engine));
        let slot = EngineSlot::new(loader.clone(), "llama3.2:3b");
        slot.acquire(None).await.unwrap();

        let mut session = ChatSession::new();
        session.add_attachment(Attachment::from_bytes("a.txt", "text/plain", b"a"));

        clear_session(&mut session, &slot).await;

        assert!(session.attachments().is_empty());
        assert!(!slot.is_ready().await);

        slot.acquire(None).await.unwrap();
        assert_eq!(loader.load_count(), 2);
    }
}
