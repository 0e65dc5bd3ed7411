//! Domain layer - Core business logic and entities

pub mod attachment;
pub mod chat;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod llm;
pub mod settings;

pub use attachment::{Attachment, AttachmentKind, AttachmentStatus};
pub use chat::{ChatSession, ChatTurn, PendingTurn, RetrievalMetric, TurnRole};
pub use credentials::CredentialProvider;
pub use dispatch::{Dispatcher, DispatcherBuilder};
pub use error::DomainError;
pub use llm::{
    ContentPart, Generation, LlmProvider, Message, MessageRole, NormalizedRequest,
    ProviderAdapter, ProviderKind, ProviderOutput, RequestNormalizer,
};
pub use settings::{KeyValueStore, ProviderConfig};
