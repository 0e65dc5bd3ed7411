//! Credential lookup for providers

mod provider;

pub use provider::CredentialProvider;

#[cfg(test)]
pub use provider::mock;
