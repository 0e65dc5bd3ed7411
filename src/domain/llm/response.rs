use serde::{Deserialize, Serialize};

use crate::domain::chat::RetrievalMetric;

/// Text used when a provider answers successfully but without content
pub const NO_RESPONSE_TEXT: &str = "No response generated.";

/// Decoded result of one adapter call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOutput {
    pub text: String,
    pub tokens_used: u64,
}

impl ProviderOutput {
    pub fn new(text: impl Into<String>, tokens_used: u64) -> Self {
        Self {
            text: text.into(),
            tokens_used,
        }
    }

    /// Build from a possibly missing text field, substituting the fallback
    pub fn from_optional_text(text: Option<String>, tokens_used: u64) -> Self {
        let text = text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| NO_RESPONSE_TEXT.to_string());

        Self { text, tokens_used }
    }

    pub fn is_fallback(&self) -> bool {
        self.text == NO_RESPONSE_TEXT
    }
}

/// Result returned to the caller of the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub metrics: RetrievalMetric,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_text_uses_fallback() {
        let output = ProviderOutput::from_optional_text(None, 0);
        assert_eq!(output.text, NO_RESPONSE_TEXT);
        assert!(output.is_fallback());
    }

    #[test]
    fn test_blank_text_uses_fallback() {
        let output = ProviderOutput::from_optional_text(Some("  \n".to_string()), 12);
        assert!(output.is_fallback());
        assert_eq!(output.tokens_used, 12);
    }

    #[test]
    fn test_text_kept() {
        let output = ProviderOutput::from_optional_text(Some("Revenue grew.".to_string()), 3);
        assert_eq!(output.text, "Revenue grew.");
        assert!(!output.is_fallback());
    }
}
