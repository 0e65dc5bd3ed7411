//! Reading attachments from the local filesystem

mod loader;

pub use loader::AttachmentLoader;
