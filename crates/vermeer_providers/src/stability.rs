//! Stability AI image generation adapter.
//!
//! Multipart requests against the v2beta stable-image endpoints: `/edit`
//! for image conditioning and `/generate/core` for text-to-image. Responses
//! carry raw image bytes (`Accept: image/*`). Multi-image generation uses
//! the first image only.

use crate::client::{ImageProvider, effective_mime, ensure_prompt, read_source};
use crate::settings::{ProviderSettings, resolve_api_key};
use crate::{ProviderResult, http};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, instrument};
use vermeer_core::{GeneratedImage, ImageSource};
use vermeer_error::{ProviderError, ProviderErrorKind};

const STABILITY_API_BASE: &str = "https://api.stability.ai/v2beta/stable-image";
const STABILITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Strength of the reference image's influence in img2img mode.
const IMG2IMG_STRENGTH: &str = "0.7";

/// Image generator backed by the Stability AI API.
#[derive(Debug, Clone)]
pub struct StabilityClient {
    client: reqwest::Client,
    api_key: String,
}

impl StabilityClient {
    /// Creates a Stability client, resolving the API key from the explicit
    /// argument, `STABILITY_AI_API_KEY`, or settings.
    ///
    /// # Errors
    ///
    /// Fails at construction when no API key can be resolved.
    pub fn new(api_key: Option<String>, settings: &ProviderSettings) -> ProviderResult<Self> {
        let api_key = resolve_api_key(
            api_key,
            "STABILITY_AI_API_KEY",
            settings.stability_api_key().as_ref(),
            "stability",
        )?;
        Ok(Self {
            client: http::client(STABILITY_TIMEOUT)?,
            api_key,
        })
    }

    #[instrument(skip(self, form))]
    async fn send(&self, endpoint: &str, form: Form) -> ProviderResult<GeneratedImage> {
        let url = format!("{}/{}", STABILITY_API_BASE, endpoint);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "image/*")
            .multipart(form)
            .send()
            .await
            .map_err(http::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_text, "Stability API error");
            return Err(classify_failure(status.as_u16(), error_text));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response.bytes().await.map_err(http::transport_error)?;
        if bytes.is_empty() {
            return Err(ProviderError::new(ProviderErrorKind::NoImage));
        }
        info!(bytes = bytes.len(), "Stability returned image");
        Ok(GeneratedImage::new(bytes.to_vec(), content_type))
    }
}

/// Stability reports moderation refusals as structured JSON errors; map
/// those to the content-policy kind and let the status table handle the
/// rest.
fn classify_failure(status: u16, body: String) -> ProviderError {
    if let Ok(parsed) = serde_json::from_str::<StabilityError>(&body)
        && parsed.name.as_deref() == Some("content_moderation")
    {
        let message = parsed
            .errors
            .first()
            .cloned()
            .unwrap_or_else(|| "Stability refused to generate the image".to_string());
        return ProviderError::new(ProviderErrorKind::ContentPolicy {
            message,
            reason: Some("content_moderation".to_string()),
        });
    }
    ProviderError::from_status(status, body)
}

#[async_trait]
impl ImageProvider for StabilityClient {
    fn name(&self) -> &'static str {
        "stability"
    }

    fn model(&self) -> &str {
        "stable-image-core"
    }

    async fn generate_from_text(&self, prompt: &str) -> ProviderResult<GeneratedImage> {
        ensure_prompt(prompt)?;
        let form = Form::new()
            .text("prompt", prompt.to_string())
            .text("output_format", "png");
        self.send("generate/core", form).await
    }

    async fn generate_from_image_and_text(
        &self,
        image: &mut dyn ImageSource,
        prompt: &str,
    ) -> ProviderResult<GeneratedImage> {
        ensure_prompt(prompt)?;
        let mime = effective_mime(image);
        let filename = image.filename().to_string();
        let bytes = read_source(image)?;
        let part = Part::bytes(bytes)
            .file_name(filename)
            .mime_str(&mime)
            .map_err(|e| {
                ProviderError::new(ProviderErrorKind::InvalidRequest(format!(
                    "Invalid reference image MIME type: {}",
                    e
                )))
            })?;
        let form = Form::new()
            .part("image", part)
            .text("prompt", prompt.to_string())
            .text("mode", "image-to-image")
            .text("strength", IMG2IMG_STRENGTH)
            .text("seed", "0");
        self.send("edit", form).await
    }

    /// Stability takes a single reference image, so only the first is used.
    async fn generate_from_multiple_images_and_text(
        &self,
        images: &mut [Box<dyn ImageSource>],
        prompt: &str,
    ) -> ProviderResult<GeneratedImage> {
        let total = images.len();
        let Some(first) = images.first_mut() else {
            return Err(ProviderError::new(ProviderErrorKind::InvalidRequest(
                "At least one image file is required".to_string(),
            )));
        };
        info!(total, "Using first image for Stability generation");
        self.generate_from_image_and_text(first.as_mut(), prompt)
            .await
    }
}

#[derive(Debug, Deserialize)]
struct StabilityError {
    name: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}
