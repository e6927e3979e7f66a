//! The image provider capability trait.

use crate::ProviderResult;
use async_trait::async_trait;
use base64::Engine;
use std::path::Path;
use vermeer_core::{GeneratedImage, ImageSource};
use vermeer_error::{ProviderError, ProviderErrorKind};

/// Capability contract every vendor adapter implements.
///
/// All operations return the generated image bytes with their content type.
/// Adapters that lack native support for a capability degrade explicitly:
/// multi-image generation falls back to the first image, and image
/// conditioning falls back to text-only where the vendor has no img2img
/// endpoint. Each degradation is documented on the adapter.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Registered name of this provider.
    fn name(&self) -> &'static str;

    /// Model identifier requests are routed to.
    fn model(&self) -> &str;

    /// Generate an image from a text prompt only.
    async fn generate_from_text(&self, prompt: &str) -> ProviderResult<GeneratedImage>;

    /// Generate an image from a reference image and a text prompt.
    ///
    /// The reference stream is read through [`ImageSource::read_bytes`],
    /// which rewinds the stream before and after reading so callers can
    /// re-read it.
    async fn generate_from_image_and_text(
        &self,
        image: &mut dyn ImageSource,
        prompt: &str,
    ) -> ProviderResult<GeneratedImage>;

    /// Generate an image from an ordered list of reference images and a
    /// text prompt.
    ///
    /// Vendors without native multi-image support use the first image and
    /// ignore the rest.
    async fn generate_from_multiple_images_and_text(
        &self,
        images: &mut [Box<dyn ImageSource>],
        prompt: &str,
    ) -> ProviderResult<GeneratedImage>;

    /// Encode a reference image as a `data:<mime>;base64,<payload>` URL.
    ///
    /// Shared across adapters; MIME type is inferred from the filename
    /// extension, defaulting to JPEG.
    fn process_reference_image(&self, image: &mut dyn ImageSource) -> ProviderResult<String> {
        reference_data_url(image)
    }
}

/// MIME type inferred from a filename extension.
///
/// Unknown or missing extensions default to `image/jpeg`.
pub fn mime_for_filename(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Reads a reference image fully and encodes it as a base64 data URL.
pub fn reference_data_url(image: &mut dyn ImageSource) -> ProviderResult<String> {
    let mime = mime_for_filename(image.filename());
    let bytes = read_source(image)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:{};base64,{}", mime, encoded))
}

/// Effective MIME type of a reference image: the declared content type when
/// present, otherwise inferred from the filename.
pub(crate) fn effective_mime(image: &dyn ImageSource) -> String {
    match image.content_type() {
        Some(declared) => declared.to_string(),
        None => mime_for_filename(image.filename()).to_string(),
    }
}

/// Reads a reference stream, mapping IO failures into the provider domain.
pub(crate) fn read_source(image: &mut dyn ImageSource) -> ProviderResult<Vec<u8>> {
    image.read_bytes().map_err(|e| {
        ProviderError::new(ProviderErrorKind::Generation(format!(
            "Failed to read reference image '{}': {}",
            image.filename(),
            e
        )))
    })
}

/// Guards against an empty prompt reaching a vendor call.
pub(crate) fn ensure_prompt(prompt: &str) -> ProviderResult<()> {
    if prompt.trim().is_empty() {
        return Err(ProviderError::new(ProviderErrorKind::InvalidRequest(
            "Prompt cannot be empty".to_string(),
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vermeer_core::ImageUpload;

    #[test]
    fn mime_inference_map() {
        assert_eq!(mime_for_filename("a.jpg"), "image/jpeg");
        assert_eq!(mime_for_filename("a.JPEG"), "image/jpeg");
        assert_eq!(mime_for_filename("a.png"), "image/png");
        assert_eq!(mime_for_filename("a.gif"), "image/gif");
        assert_eq!(mime_for_filename("a.webp"), "image/webp");
        assert_eq!(mime_for_filename("a.bmp"), "image/jpeg");
        assert_eq!(mime_for_filename("reference"), "image/jpeg");
    }

    #[test]
    fn data_url_uses_extension_mime() {
        let mut upload = ImageUpload::new("cat.png", None, vec![137, 80, 78, 71]);
        let url = reference_data_url(&mut upload).expect("data url");
        assert!(url.starts_with("data:image/png;base64,"));
        // Stream is rewound, so the same source encodes identically twice.
        assert_eq!(reference_data_url(&mut upload).unwrap(), url);
    }

    #[test]
    fn empty_prompt_is_rejected() {
        assert!(ensure_prompt("   ").is_err());
        assert!(ensure_prompt("a cat").is_ok());
    }
}
