use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::llm::{
    DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_SYSTEM_INSTRUCTION, DEFAULT_TEMPERATURE, GenerationParams,
    UnparsedDocumentPolicy,
};
use crate::infrastructure::llm::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL,
    DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL,
};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub generation: GenerationConfig,
    pub providers: ProvidersConfig,
    pub attachments: AttachmentsConfig,
    pub storage: StorageConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub system_instruction: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

impl GenerationConfig {
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            system_instruction: self.system_instruction.clone(),
        }
    }
}

/// Endpoint and model for one backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    pub model: String,
}

impl EndpointConfig {
    fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            model: model.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub google: EndpointConfig,
    pub openai: EndpointConfig,
    pub local: EndpointConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            google: EndpointConfig::new(DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL),
            openai: EndpointConfig::new(DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL),
            local: EndpointConfig::new(DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttachmentsConfig {
    pub max_size_bytes: u64,
    pub unparsed_policy: UnparsedDocumentPolicy,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 20 * 1024 * 1024,
            unparsed_policy: UnparsedDocumentPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Settings file; the platform config directory is used when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// No timeout unless set
    pub timeout_secs: Option<u64>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
