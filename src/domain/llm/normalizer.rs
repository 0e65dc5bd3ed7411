//! Turns chat history, prompt and attachments into a provider-agnostic request

use serde::{Deserialize, Serialize};

use super::{ContentPart, Message, NormalizedRequest};
use crate::domain::DomainError;
use crate::domain::attachment::{Attachment, AttachmentKind};
use crate::domain::chat::{ChatTurn, TurnRole};

/// What to do with attachments whose content cannot be parsed (PDF, archives, ...)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnparsedDocumentPolicy {
    /// Substitute a named placeholder telling the model the content is unavailable
    #[default]
    Placeholder,
    /// Refuse the turn before any provider is called
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct RequestNormalizer {
    unparsed_policy: UnparsedDocumentPolicy,
}

impl RequestNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(unparsed_policy: UnparsedDocumentPolicy) -> Self {
        Self { unparsed_policy }
    }

    pub fn policy(&self) -> UnparsedDocumentPolicy {
        self.unparsed_policy
    }

    pub fn normalize(
        &self,
        history: &[ChatTurn],
        prompt: &str,
        attachments: &[Attachment],
    ) -> Result<NormalizedRequest, DomainError> {
        let history = history
            .iter()
            .filter_map(|turn| match turn.role {
                TurnRole::User => Some(Message::user(&turn.content)),
                TurnRole::Model => Some(Message::assistant(&turn.content)),
                TurnRole::System => None,
            })
            .collect();

        let mut attachment_parts = Vec::with_capacity(attachments.len());

        for attachment in attachments {
            if !attachment.is_ready() {
                tracing::debug!(
                    attachment = attachment.name(),
                    status = ?attachment.status(),
                    "Skipping attachment that is not ready"
                );
                continue;
            }

            attachment_parts.push(self.attachment_part(attachment)?);
        }

        Ok(NormalizedRequest {
            history,
            sources_count: attachment_parts.len(),
            attachment_parts,
            prompt: prompt.to_string(),
        })
    }

    fn attachment_part(&self, attachment: &Attachment) -> Result<ContentPart, DomainError> {
        match attachment.kind() {
            AttachmentKind::Image => Ok(ContentPart::inline_data(
                attachment.mime_type(),
                attachment.base64_payload(),
            )),
            AttachmentKind::Text => Ok(ContentPart::text(document_block(attachment))),
            AttachmentKind::Unparsed => match self.unparsed_policy {
                UnparsedDocumentPolicy::Placeholder => {
                    Ok(ContentPart::text(unparsed_placeholder(attachment)))
                }
                UnparsedDocumentPolicy::Reject => Err(DomainError::validation(format!(
                    "Attachment '{}' ({}) cannot be read; remove it or convert it to text",
                    attachment.name(),
                    attachment.mime_type()
                ))),
            },
        }
    }
}

fn document_block(attachment: &Attachment) -> String {
    match attachment.decode_text() {
        Ok(text) => format!("[Document: {}]\n{}", attachment.name(), text),
        Err(e) => {
            tracing::warn!(
                attachment = attachment.name(),
                error = %e,
                "Could not decode text attachment"
            );
            format!("[Document: {}] - Could not parse content", attachment.name())
        }
    }
}

fn unparsed_placeholder(attachment: &Attachment) -> String {
    format!(
        "[Attached File: {} ({})] Content of this file is not available to the model.",
        attachment.name(),
        attachment.mime_type()
    )
}
