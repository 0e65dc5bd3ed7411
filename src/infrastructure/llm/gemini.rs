use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::{HttpClientTrait, for_provider};
use crate::domain::llm::{
    ContentPart, GenerationParams, MessageRole, NormalizedRequest, ProviderAdapter, ProviderInfo,
    ProviderKind, ProviderOutput, require_credential,
};
use crate::domain::DomainError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Google Gemini `generateContent` adapter.
///
/// Each call is stateless, so prior turns are flattened into a single text
/// part instead of a structured message list.
#[derive(Debug)]
pub struct GeminiProvider<C: HttpClientTrait> {
    client: C,
    base_url: String,
    model: String,
    params: GenerationParams,
}

impl<C: HttpClientTrait> GeminiProvider<C> {
    pub fn new(client: C) -> Self {
        Self::with_base_url(client, DEFAULT_GEMINI_BASE_URL)
    }

    pub fn with_base_url(client: C, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            base_url,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            params: GenerationParams::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    fn generate_content_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

fn history_block(request: &NormalizedRequest) -> Option<String> {
    let lines: Vec<String> = request
        .history
        .iter()
        .map(|m| {
            let speaker = match m.role {
                MessageRole::User => "User",
                _ => "Assistant",
            };
            format!("{}: {}", speaker, m.content_text().unwrap_or(""))
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(format!(
            "Previously in conversation:\n{}\n\n",
            lines.join("\n\n")
        ))
    }
}

impl<C: HttpClientTrait> ProviderInfo for GeminiProvider<C> {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl<C: HttpClientTrait> ProviderAdapter for GeminiProvider<C> {
    type Payload = GeminiRequest;
    type Response = GeminiResponse;

    fn encode(&self, request: &NormalizedRequest) -> GeminiRequest {
        let mut parts: Vec<GeminiPart> = request
            .attachment_parts
            .iter()
            .map(|part| match part {
                ContentPart::InlineData { mime_type, data } => GeminiPart::InlineData {
                    inline_data: GeminiBlob {
                        mime_type: mime_type.clone(),
                        data: data.clone(),
                    },
                },
                ContentPart::Text { text } => GeminiPart::Text { text: text.clone() },
            })
            .collect();

        if let Some(history) = history_block(request) {
            parts.push(GeminiPart::Text { text: history });
        }

        parts.push(GeminiPart::Text {
            text: format!("User Query: {}", request.prompt),
        });

        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts,
            }],
            system_instruction: GeminiSystemInstruction {
                parts: vec![GeminiPart::Text {
                    text: self.params.system_instruction.clone(),
                }],
            },
            generation_config: GeminiGenerationConfig {
                temperature: self.params.temperature,
                max_output_tokens: self.params.max_output_tokens,
            },
        }
    }

    async fn invoke(
        &self,
        payload: GeminiRequest,
        credential: Option<&str>,
    ) -> Result<GeminiResponse, DomainError> {
        let api_key = require_credential(ProviderKind::Google, credential)?;
        let headers = vec![
            ("x-goog-api-key", api_key),
            ("Content-Type", "application/json"),
        ];

        let body = serde_json::to_value(&payload).map_err(|e| {
            DomainError::internal(format!("Failed to serialize Gemini request: {}", e))
        })?;

        let response = self
            .client
            .post_json(&self.generate_content_url(), headers, &body)
            .await
            .map_err(|e| for_provider(e, ProviderKind::Google))?;

        if !response.is_success() {
            tracing::warn!(status = response.status, "Gemini returned an error status");
            return Err(DomainError::transport("google", response.error_message()));
        }

        Ok(serde_json::from_value(response.body).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unexpected Gemini response shape");
            GeminiResponse::default()
        }))
    }

    fn decode(&self, response: GeminiResponse) -> ProviderOutput {
        let tokens = response
            .usage_metadata
            .and_then(|u| u.total_token_count)
            .unwrap_or(0);

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            });

        ProviderOutput::from_optional_text(text, tokens)
    }
}

// Gemini API types

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    pub system_instruction: GeminiSystemInstruction,
    pub generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeminiContent {
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiBlob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeminiSystemInstruction {
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    total_token_count: Option<u64>,
}
