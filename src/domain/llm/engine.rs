use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use super::{GenerationParams, Message};
use crate::domain::DomainError;

/// Receives human-readable status lines while a local engine initializes
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Raw completion from a local engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineReply {
    pub content: Option<String>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Handle to a model running on this machine
#[async_trait]
pub trait LocalEngine: Send + Sync + Debug {
    async fn complete(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<EngineReply, DomainError>;

    fn model_id(&self) -> &str;
}

/// Downloads model assets and constructs a ready engine
#[async_trait]
pub trait EngineLoader: Send + Sync + Debug {
    async fn load(
        &self,
        model_id: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<Arc<dyn LocalEngine>, DomainError>;
}
