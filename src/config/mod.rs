//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, AttachmentsConfig, EndpointConfig, GenerationConfig, HttpConfig, LogFormat,
    LoggingConfig, ProvidersConfig, StorageConfig,
};
