//! Generated image payload.

use base64::Engine;
use derive_getters::Getters;

/// Image bytes returned by a provider, with their content type.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct GeneratedImage {
    /// Raw image bytes
    bytes: Vec<u8>,
    /// MIME type of the payload, e.g. "image/png"
    content_type: String,
}

impl GeneratedImage {
    /// Creates a new generated image payload.
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// Number of bytes in the payload.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Renders the payload as a `data:<mime>;base64,<payload>` URL.
    pub fn data_url(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.content_type, encoded)
    }
}
