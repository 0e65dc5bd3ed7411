//! LLM provider implementations

mod factory;
mod gemini;
mod http_client;
pub mod local;
mod openai;

pub use factory::LlmProviderFactory;
pub use gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiProvider};
pub use http_client::{ByteStream, HttpClient, HttpClientTrait, JsonResponse};
pub use local::{
    DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL, EngineSlot, LocalProvider, OllamaEngine,
    OllamaLoader,
};
pub use openai::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, OpenAiProvider};
