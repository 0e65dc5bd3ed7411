//! Persisted provider selection

mod repository;

pub use repository::{SETTINGS_KEY, SettingsRepository};
