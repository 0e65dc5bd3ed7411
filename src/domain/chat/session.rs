use uuid::Uuid;

use super::{ChatTurn, TurnRole};
use crate::domain::attachment::Attachment;
use crate::domain::llm::Generation;
use crate::domain::DomainError;

/// Snapshot handed to the dispatcher when a turn starts
#[derive(Debug, Clone)]
pub struct PendingTurn {
    /// History as it was before the new user turn
    pub history: Vec<ChatTurn>,
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

/// In-memory chat state for one user session.
///
/// At most one turn is pending at a time: `begin_turn` refuses to start a new
/// turn until the previous one is completed or failed.
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<ChatTurn>,
    attachments: Vec<Attachment>,
    pending: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    pub fn remove_attachment(&mut self, id: &Uuid) -> Option<Attachment> {
        let index = self.attachments.iter().position(|a| a.id() == id)?;
        Some(self.attachments.remove(index))
    }

    /// Append a local notice that stays out of provider payloads
    pub fn push_notice(&mut self, content: impl Into<String>) {
        self.history.push(ChatTurn::system(content));
    }

    pub fn begin_turn(&mut self, prompt: &str) -> Result<PendingTurn, DomainError> {
        if prompt.trim().is_empty() {
            return Err(DomainError::validation("Prompt must not be empty"));
        }

        if self.pending {
            return Err(DomainError::validation(
                "A response is already being generated for this session",
            ));
        }

        let pending = PendingTurn {
            history: self.history.clone(),
            prompt: prompt.to_string(),
            attachments: self.attachments.clone(),
        };

        self.history.push(ChatTurn::user(prompt));
        self.pending = true;

        Ok(pending)
    }

    pub fn complete_turn(&mut self, generation: Generation) -> Result<&ChatTurn, DomainError> {
        if !self.pending {
            return Err(DomainError::validation("No turn is pending"));
        }

        self.history
            .push(ChatTurn::model(generation.text).with_metrics(generation.metrics));
        self.pending = false;

        self.history
            .last()
            .ok_or_else(|| DomainError::internal("History is empty after completing a turn"))
    }

    /// Release the pending flag; the user turn stays in history
    pub fn fail_turn(&mut self) {
        self.pending = false;
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.attachments.clear();
        self.pending = false;
    }

    pub fn model_turns(&self) -> impl Iterator<Item = &ChatTurn> {
        self.history.iter().filter(|t| t.role == TurnRole::Model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::RetrievalMetric;

    fn generation(text: &str) -> Generation {
        Generation {
            text: text.to_string(),
            metrics: RetrievalMetric {
                latency_ms: 5,
                tokens_used: 10,
                sources_count: 0,
                model_name: "mock-model".to_string(),
            },
        }
    }

    #[test]
    fn test_begin_turn_snapshots_history_before_prompt() {
        let mut session = ChatSession::new();

        let pending = session.begin_turn("Hello").unwrap();
        assert!(pending.history.is_empty());
        assert_eq!(pending.prompt, "Hello");
        assert_eq!(session.history().len(), 1);
        assert!(session.is_pending());
    }

    #[test]
    fn test_only_one_pending_turn() {
        let mut session = ChatSession::new();
        session.begin_turn("first").unwrap();

        let result = session.begin_turn("second");
        assert!(matches!(result, Err(DomainError::Validation { .. })));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_complete_turn_appends_model_turn_with_metrics() {
        let mut session = ChatSession::new();
        session.begin_turn("Summarize").unwrap();

        let turn = session.complete_turn(generation("Summary")).unwrap();
        assert_eq!(turn.role, TurnRole::Model);
        assert_eq!(turn.metrics.as_ref().unwrap().model_name, "mock-model");
        assert!(!session.is_pending());
        assert_eq!(session.model_turns().count(), 1);

        let next = session.begin_turn("Again").unwrap();
        assert_eq!(next.history.len(), 2);
    }

    #[test]
    fn test_fail_turn_keeps_user_turn() {
        let mut session = ChatSession::new();
        session.begin_turn("Summarize").unwrap();
        session.fail_turn();

        assert!(!session.is_pending());
        assert_eq!(session.history().len(), 1);
        assert!(session.complete_turn(generation("late")).is_err());
    }

    #[test]
    fn test_blank_prompt_rejected() {
        let mut session = ChatSession::new();
        assert!(session.begin_turn("   ").is_err());
        assert!(!session.is_pending());
    }

    #[test]
    fn test_attachments_removable_by_id() {
        let mut session = ChatSession::new();
        let attachment = Attachment::from_bytes("notes.txt", "text/plain", b"hi");
        let id = *attachment.id();
        session.add_attachment(attachment);

        let pending = session.begin_turn("What is in the notes?").unwrap();
        assert_eq!(pending.attachments.len(), 1);
        session.fail_turn();

        assert!(session.remove_attachment(&id).is_some());
        assert!(session.remove_attachment(&id).is_none());
        assert!(session.attachments().is_empty());
    }
}
