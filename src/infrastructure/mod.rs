//! Infrastructure layer - External service implementations

pub mod attachments;
pub mod credentials;
pub mod llm;
pub mod logging;
pub mod services;
pub mod settings;
pub mod storage;
