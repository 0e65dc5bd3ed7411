use serde::{Deserialize, Serialize};

use super::{ContentPart, Message};

pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "\
You are Nexus, a multimodal document assistant.
Answer questions using ONLY the documents provided in this session (images, text, tables).

Rules:
1. **Grounding**: Base every answer on the visual and textual content supplied with the conversation.
2. **Citations**: Point to the part of a document you rely on (for example \"As seen in Table 1\").
3. **Multimodal**: You can see images. Read charts, graphs and document screenshots carefully.
4. **Honesty**: If the answer is not in the documents, say so plainly instead of guessing.
5. **Format**: Reply in Markdown and use bold for key terms.
";

/// Sampling parameters shared by every adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub system_instruction: String,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

/// Provider-agnostic request produced by the normalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRequest {
    /// Prior turns tagged user/assistant; system turns already dropped
    pub history: Vec<Message>,
    /// One part per ready attachment, in upload order
    pub attachment_parts: Vec<ContentPart>,
    pub prompt: String,
    pub sources_count: usize,
}

impl NormalizedRequest {
    /// All text blocks in order; the prompt is always last
    pub fn text_blocks(&self) -> Vec<&str> {
        self.attachment_parts
            .iter()
            .filter_map(ContentPart::as_text)
            .chain(std::iter::once(self.prompt.as_str()))
            .collect()
    }

    pub fn inline_parts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attachment_parts.iter().filter_map(|p| match p {
            ContentPart::InlineData { mime_type, data } => Some((mime_type.as_str(), data.as_str())),
            ContentPart::Text { .. } => None,
        })
    }

    /// Structured message list: system, history, then a final user message
    /// holding the prompt followed by every attachment part.
    pub fn to_chat_messages(&self, system_instruction: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message::system(system_instruction));
        messages.extend(self.history.iter().cloned());

        let mut parts = Vec::with_capacity(self.attachment_parts.len() + 1);
        parts.push(ContentPart::text(&self.prompt));
        parts.extend(self.attachment_parts.iter().cloned());
        messages.push(Message::user_with_parts(parts));

        messages
    }
}
