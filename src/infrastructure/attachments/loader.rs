use std::path::Path;

use crate::domain::DomainError;
use crate::domain::attachment::{Attachment, to_data_url};

/// Turns files on disk into attachments, enforcing a size ceiling
#[derive(Debug, Clone)]
pub struct AttachmentLoader {
    max_size_bytes: u64,
}

impl AttachmentLoader {
    pub fn new(max_size_bytes: u64) -> Self {
        Self { max_size_bytes }
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Read a file into a ready attachment.
    ///
    /// The mime type is guessed from the extension, falling back to
    /// `application/octet-stream`.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<Attachment, DomainError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            DomainError::validation(format!("Cannot read {}: {}", path.display(), e))
        })?;

        if !metadata.is_file() {
            return Err(DomainError::validation(format!(
                "{} is not a file",
                path.display()
            )));
        }

        if metadata.len() > self.max_size_bytes {
            return Err(DomainError::validation(format!(
                "{} is {} bytes, above the {} byte limit",
                name,
                metadata.len(),
                self.max_size_bytes
            )));
        }

        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        let mut attachment = Attachment::uploading(&name, &mime_type, metadata.len());

        match tokio::fs::read(path).await {
            Ok(bytes) => {
                attachment.complete(to_data_url(&mime_type, &bytes))?;
                tracing::debug!(name = %name, mime = %mime_type, size = bytes.len(), "Attachment loaded");
                Ok(attachment)
            }
            Err(e) => {
                attachment.fail(e.to_string())?;
                Err(DomainError::validation(format!(
                    "Cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }
}
