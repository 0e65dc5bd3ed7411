//! Chat service - runs one user turn through the dispatcher

use std::sync::Arc;

use crate::domain::{ChatSession, ChatTurn, Dispatcher, DomainError, ProviderConfig};

/// Chat service tying a session's history and attachments to the dispatcher
#[derive(Debug, Clone)]
pub struct ChatService {
    dispatcher: Arc<Dispatcher>,
}

impl ChatService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Send a prompt and append the model's answer to the session.
    ///
    /// On failure the user turn stays in history and the session is free for
    /// the next prompt.
    pub async fn send(
        &self,
        session: &mut ChatSession,
        prompt: &str,
        config: &ProviderConfig,
    ) -> Result<ChatTurn, DomainError> {
        let pending = session.begin_turn(prompt)?;

        let result = self
            .dispatcher
            .generate(
                &pending.history,
                &pending.prompt,
                &pending.attachments,
                config,
            )
            .await;

        match result {
            Ok(generation) => session.complete_turn(generation).cloned(),
            Err(e) => {
                session.fail_turn();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::{MockAdapter, ProviderKind};
    use crate::domain::{Attachment, TurnRole};

    fn service_with(adapter: Arc<MockAdapter>) -> ChatService {
        ChatService::new(Arc::new(Dispatcher::builder().provider(adapter).build()))
    }

    #[tokio::test]
    async fn test_send_appends_user_and_model_turns() {
        let adapter = Arc::new(
            MockAdapter::new(ProviderKind::OpenAi)
                .with_text("The chart shows growth.", 30)
                .with_model("gpt-4o"),
        );
        let service = service_with(adapter.clone());

        let mut session = ChatSession::new();
        session.add_attachment(Attachment::from_bytes("chart.png", "image/png", &[1, 2, 3]));
        let config = ProviderConfig::new(ProviderKind::OpenAi, "sk-test");

        let turn = service
            .send(&mut session, "What does the chart show?", &config)
            .await
            .unwrap();

        assert_eq!(turn.role, TurnRole::Model);
        assert_eq!(turn.content, "The chart shows growth.");
        let metrics = turn.metrics.unwrap();
        assert_eq!(metrics.sources_count, 1);
        assert_eq!(metrics.model_name, "gpt-4o");

        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].role, TurnRole::User);
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn test_history_excludes_current_prompt() {
        let adapter = Arc::new(MockAdapter::new(ProviderKind::OpenAi).with_text("ok", 1));
        let service = service_with(adapter.clone());
        let config = ProviderConfig::new(ProviderKind::OpenAi, "sk-test");

        let mut session = ChatSession::new();
        service.send(&mut session, "first", &config).await.unwrap();
        service.send(&mut session, "second", &config).await.unwrap();

        let payload = adapter.last_payload().unwrap();
        assert_eq!(payload.prompt, "second");
        assert_eq!(payload.history.len(), 2);
        assert_eq!(payload.history[0].content_text(), Some("first"));
        assert_eq!(session.model_turns().count(), 2);
    }

    #[tokio::test]
    async fn test_failure_keeps_user_turn_and_releases_session() {
        let adapter = Arc::new(MockAdapter::new(ProviderKind::Google).with_error("quota exceeded"));
        let service = service_with(adapter);
        let config = ProviderConfig::new(ProviderKind::Google, "key");

        let mut session = ChatSession::new();
        let err = service.send(&mut session, "hello", &config).await.unwrap_err();

        assert_eq!(err.provider_name(), Some("google"));
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].role, TurnRole::User);
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn test_blank_prompt_never_dispatches() {
        let adapter = Arc::new(MockAdapter::new(ProviderKind::OpenAi).with_text("ok", 1));
        let service = service_with(adapter.clone());
        let config = ProviderConfig::new(ProviderKind::OpenAi, "sk-test");

        let mut session = ChatSession::new();
        assert!(service.send(&mut session, "   ", &config).await.is_err());
        assert_eq!(adapter.invocations(), 0);
        assert!(session.history().is_empty());
    }
}
