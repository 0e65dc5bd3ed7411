use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::{HttpClientTrait, for_provider};
use crate::domain::llm::{
    ContentPart, GenerationParams, Message, NormalizedRequest, ProviderAdapter, ProviderInfo,
    ProviderKind, ProviderOutput, require_credential,
};
use crate::domain::DomainError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// OpenAI chat-completions adapter
#[derive(Debug)]
pub struct OpenAiProvider<C: HttpClientTrait> {
    client: C,
    base_url: String,
    model: String,
    params: GenerationParams,
}

impl<C: HttpClientTrait> OpenAiProvider<C> {
    pub fn new(client: C) -> Self {
        Self::with_base_url(client, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(client: C, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            base_url,
            model: DEFAULT_OPENAI_MODEL.to_string(),
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

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

impl<C: HttpClientTrait> ProviderInfo for OpenAiProvider<C> {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl<C: HttpClientTrait> ProviderAdapter for OpenAiProvider<C> {
    type Payload = OpenAiRequest;
    type Response = OpenAiResponse;

    fn encode(&self, request: &NormalizedRequest) -> OpenAiRequest {
        let messages = request
            .to_chat_messages(&self.params.system_instruction)
            .iter()
            .map(OpenAiMessage::from_domain)
            .collect();

        OpenAiRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.params.max_output_tokens,
            temperature: self.params.temperature,
        }
    }

    async fn invoke(
        &self,
        payload: OpenAiRequest,
        credential: Option<&str>,
    ) -> Result<OpenAiResponse, DomainError> {
        let api_key = require_credential(ProviderKind::OpenAi, credential)?;
        let auth_header = format!("Bearer {}", api_key);
        let headers = vec![
            ("Authorization", auth_header.as_str()),
            ("Content-Type", "application/json"),
        ];

        let body = serde_json::to_value(&payload).map_err(|e| {
            DomainError::internal(format!("Failed to serialize OpenAI request: {}", e))
        })?;

        let response = self
            .client
            .post_json(&self.chat_completions_url(), headers, &body)
            .await
            .map_err(|e| for_provider(e, ProviderKind::OpenAi))?;

        if !response.is_success() {
            tracing::warn!(status = response.status, "OpenAI returned an error status");
            return Err(DomainError::transport("openai", response.error_message()));
        }

        Ok(serde_json::from_value(response.body).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unexpected OpenAI response shape");
            OpenAiResponse::default()
        }))
    }

    fn decode(&self, response: OpenAiResponse) -> ProviderOutput {
        let tokens = response
            .usage
            .map(|u| {
                u.total_tokens
                    .unwrap_or(u.prompt_tokens.unwrap_or(0) + u.completion_tokens.unwrap_or(0))
            })
            .unwrap_or(0);

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);

        ProviderOutput::from_optional_text(text, tokens)
    }
}

// OpenAI API types

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenAiRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenAiMessage {
    pub role: String,
    pub content: OpenAiContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OpenAiContent {
    Text(String),
    Parts(Vec<OpenAiContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenAiContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAiImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenAiImageUrl {
    pub url: String,
}

impl OpenAiMessage {
    fn from_domain(message: &Message) -> Self {
        let content = if message.has_parts() {
            OpenAiContent::Parts(
                message
                    .content_parts()
                    .into_iter()
                    .map(|part| match part {
                        ContentPart::Text { text } => OpenAiContentPart::Text { text: text.clone() },
                        ContentPart::InlineData { mime_type, data } => OpenAiContentPart::ImageUrl {
                            image_url: OpenAiImageUrl {
                                url: format!("data:{};base64,{}", mime_type, data),
                            },
                        },
                    })
                    .collect(),
            )
        } else {
            OpenAiContent::Text(message.content_text().unwrap_or("").to_string())
        };

        Self {
            role: message.role.as_str().to_string(),
            content,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    message: Option<OpenAiResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
    #[serde(default)]
    total_tokens: Option<u64>,
}
