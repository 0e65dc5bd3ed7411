//! Uploaded files held in memory for the session

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Upload lifecycle of an attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentStatus {
    Uploading,
    Ready,
    Error,
}

/// How an attachment's content reaches the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Sent as inline binary
    Image,
    /// Decoded and embedded as text
    Text,
    /// Not parsed; replaced by a placeholder
    Unparsed,
}

impl AttachmentKind {
    pub fn from_mime(mime_type: &str) -> Self {
        let mime = mime_type.trim().to_ascii_lowercase();

        if mime.starts_with("image/") {
            Self::Image
        } else if mime == "text/plain" || mime == "text/markdown" {
            Self::Text
        } else {
            Self::Unparsed
        }
    }
}

/// A user-supplied file, payload kept as data-URL base64 text.
///
/// Once `Ready` the attachment is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    id: Uuid,
    name: String,
    mime_type: String,
    size_bytes: u64,
    payload: String,
    status: AttachmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Attachment {
    /// Start tracking a file whose content is still being read
    pub fn uploading(name: impl Into<String>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
            payload: String::new(),
            status: AttachmentStatus::Uploading,
            error: None,
        }
    }

    /// Build a ready attachment from raw bytes
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        let mime_type = mime_type.into();
        let payload = to_data_url(&mime_type, bytes);

        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            size_bytes: bytes.len() as u64,
            mime_type,
            payload,
            status: AttachmentStatus::Ready,
            error: None,
        }
    }

    pub fn complete(&mut self, data_url: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_uploading()?;
        self.payload = data_url.into();
        self.status = AttachmentStatus::Ready;
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.ensure_uploading()?;
        self.error = Some(reason.into());
        self.status = AttachmentStatus::Error;
        Ok(())
    }

    fn ensure_uploading(&self) -> Result<(), DomainError> {
        if self.status != AttachmentStatus::Uploading {
            return Err(DomainError::validation(format!(
                "Attachment '{}' is no longer uploading",
                self.name
            )));
        }
        Ok(())
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn status(&self) -> &AttachmentStatus {
        &self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_ready(&self) -> bool {
        self.status == AttachmentStatus::Ready
    }

    pub fn kind(&self) -> AttachmentKind {
        AttachmentKind::from_mime(&self.mime_type)
    }

    /// Full data URL as stored
    pub fn data_url(&self) -> &str {
        &self.payload
    }

    /// Base64 payload with the data-URL header discarded
    pub fn base64_payload(&self) -> &str {
        match self.payload.split_once(',') {
            Some((_, data)) => data,
            None => &self.payload,
        }
    }

    /// Decode a text attachment into a string
    pub fn decode_text(&self) -> Result<String, base64::DecodeError> {
        let bytes = STANDARD.decode(self.base64_payload().trim())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}
