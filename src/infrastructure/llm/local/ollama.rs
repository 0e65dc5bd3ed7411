use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::DomainError;
use crate::domain::llm::{
    ContentPart, EngineLoader, EngineReply, GenerationParams, LocalEngine, Message,
    ProgressCallback,
};
use crate::infrastructure::llm::http_client::HttpClientTrait;

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";

/// Opens a model in a local Ollama daemon, pulling it first when it is not installed
#[derive(Debug, Clone)]
pub struct OllamaLoader<C: HttpClientTrait> {
    client: C,
    base_url: String,
}

impl<C: HttpClientTrait + Clone + 'static> OllamaLoader<C> {
    pub fn new(client: C) -> Self {
        Self::with_base_url(client, DEFAULT_OLLAMA_BASE_URL)
    }

    pub fn with_base_url(client: C, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PullStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    completed: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

impl PullStatus {
    fn describe(&self) -> Option<String> {
        let status = self.status.as_deref()?;
        match (self.total, self.completed) {
            (Some(total), Some(completed)) if total > 0 => {
                Some(format!("{} {}%", status, completed * 100 / total))
            }
            _ => Some(status.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Untagged ids resolve to `:latest` in Ollama
fn same_model(installed: &str, wanted: &str) -> bool {
    installed == wanted
        || (!wanted.contains(':') && installed.strip_suffix(":latest") == Some(wanted))
}

impl<C: HttpClientTrait + Clone + 'static> OllamaLoader<C> {
    /// Whether the daemon already has the model on disk.
    /// Any failure counts as "not installed" and leaves the decision to the pull.
    async fn is_installed(&self, model_id: &str) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        let response = match self.client.get_json(&url).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                tracing::debug!(error = %response.error_message(), "Could not list local models");
                return false;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Could not list local models");
                return false;
            }
        };

        let tags: TagsResponse = serde_json::from_value(response.body).unwrap_or_default();
        tags.models.iter().any(|m| same_model(&m.name, model_id))
    }

    async fn pull(
        &self,
        model_id: &str,
        progress: &Option<ProgressCallback>,
    ) -> Result<(), DomainError> {
        let url = format!("{}/api/pull", self.base_url);
        let body = serde_json::json!({ "model": model_id, "stream": true });

        let mut stream = self
            .client
            .post_json_stream(&url, vec![("Content-Type", "application/json")], &body)
            .await
            .map_err(|e| load_error(format!("Could not reach Ollama: {}", e)))?;

        let mut buffer: Vec<u8> = Vec::new();
        let mut last_status = None;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| load_error(e.to_string()))?;
            buffer.extend_from_slice(&chunk);

            // NDJSON lines may be split across chunks
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(status) = parse_line(&line)? {
                    report(progress, &status);
                    last_status = status.status;
                }
            }
        }

        if let Some(status) = parse_line(&buffer)? {
            report(progress, &status);
            last_status = status.status;
        }

        if last_status.as_deref() != Some("success") {
            return Err(load_error(format!(
                "Pull of '{}' ended without success",
                model_id
            )));
        }

        Ok(())
    }
}

fn load_error(message: impl Into<String>) -> DomainError {
    DomainError::initialization("local", message)
}

#[async_trait]
impl<C: HttpClientTrait + Clone + 'static> EngineLoader for OllamaLoader<C> {
    async fn load(
        &self,
        model_id: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<Arc<dyn LocalEngine>, DomainError> {
        if self.is_installed(model_id).await {
            tracing::debug!(model = %model_id, "Model already installed, skipping pull");
            if let Some(callback) = &progress {
                callback("cached");
            }
        } else {
            self.pull(model_id, &progress).await?;
        }

        Ok(Arc::new(OllamaEngine::new(
            self.client.clone(),
            self.base_url.clone(),
            model_id,
        )))
    }
}

fn parse_line(line: &[u8]) -> Result<Option<PullStatus>, DomainError> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let status: PullStatus = match serde_json::from_str(text) {
        Ok(status) => status,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed pull status line");
            return Ok(None);
        }
    };

    if let Some(error) = &status.error {
        return Err(load_error(error.clone()));
    }

    Ok(Some(status))
}

fn report(progress: &Option<ProgressCallback>, status: &PullStatus) {
    if let Some(line) = status.describe() {
        tracing::debug!(progress = %line, "Local model pull");
        if let Some(callback) = progress {
            callback(&line);
        }
    }
}

/// Chat completions against a model already present in Ollama
#[derive(Debug)]
pub struct OllamaEngine<C: HttpClientTrait> {
    client: C,
    base_url: String,
    model: String,
}

impl<C: HttpClientTrait> OllamaEngine<C> {
    pub fn new(client: C, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Default, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaResponseMessage>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OllamaMessage {
    fn from_domain(message: &Message) -> Self {
        let (content, images) = if message.has_parts() {
            let mut texts = Vec::new();
            let mut images = Vec::new();
            for part in message.content_parts() {
                match part {
                    ContentPart::Text { text } => texts.push(text.as_str()),
                    ContentPart::InlineData { data, .. } => images.push(data.clone()),
                }
            }
            (texts.join("\n\n"), images)
        } else {
            (message.content_text().unwrap_or("").to_string(), Vec::new())
        };

        Self {
            role: message.role.as_str(),
            content,
            images,
        }
    }
}

#[async_trait]
impl<C: HttpClientTrait> LocalEngine for OllamaEngine<C> {
    async fn complete(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<EngineReply, DomainError> {
        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: messages.iter().map(OllamaMessage::from_domain).collect(),
            stream: false,
            options: OllamaOptions {
                temperature: params.temperature,
                num_predict: params.max_output_tokens,
            },
        };

        let body = serde_json::to_value(&request).map_err(|e| {
            DomainError::internal(format!("Failed to serialize Ollama request: {}", e))
        })?;

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post_json(&url, vec![("Content-Type", "application/json")], &body)
            .await?;

        if !response.is_success() {
            return Err(DomainError::transport("local", response.error_message()));
        }

        let parsed: OllamaChatResponse = serde_json::from_value(response.body).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unexpected Ollama response shape");
            OllamaChatResponse::default()
        });

        Ok(EngineReply {
            content: parsed.message.and_then(|m| m.content),
            prompt_tokens: parsed.prompt_eval_count.unwrap_or(0),
            completion_tokens: parsed.eval_count.unwrap_or(0),
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
