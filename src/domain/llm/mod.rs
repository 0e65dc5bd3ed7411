//! LLM provider domain models and traits

mod engine;
mod message;
mod normalizer;
mod provider;
mod provider_kind;
mod request;
mod response;

pub use engine::{EngineLoader, EngineReply, LocalEngine, ProgressCallback};
pub use message::{ContentPart, Message, MessageRole};
pub use normalizer::{RequestNormalizer, UnparsedDocumentPolicy};
pub use provider::{LlmProvider, ProviderAdapter, ProviderInfo, require_credential};
pub use provider_kind::ProviderKind;
pub use request::{
    DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_SYSTEM_INSTRUCTION, DEFAULT_TEMPERATURE, GenerationParams,
    NormalizedRequest,
};
pub use response::{Generation, NO_RESPONSE_TEXT, ProviderOutput};

#[cfg(test)]
pub use provider::mock::MockAdapter;
