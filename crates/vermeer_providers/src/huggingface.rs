//! HuggingFace Inference API adapter.
//!
//! The Inference API serves text-to-image only, so image conditioning
//! degrades to text generation (the reference stream is still read and
//! rewound to honor the stream contract), and multi-image generation uses
//! the first image. A 503 means the model is still loading; the adapter
//! waits once and retries, the only automatic retry in the system.

use crate::client::{ImageProvider, ensure_prompt, read_source};
use crate::settings::{ProviderSettings, resolve_api_key};
use crate::{ProviderResult, http};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use vermeer_core::{GeneratedImage, ImageSource};
use vermeer_error::{ProviderError, ProviderErrorKind};

const HUGGINGFACE_API_BASE: &str = "https://api-inference.huggingface.co/models";
const HUGGINGFACE_TIMEOUT: Duration = Duration::from_secs(120);

/// Wait before the single model-loading retry.
const MODEL_LOADING_DELAY: Duration = Duration::from_secs(10);

/// Image generator backed by the HuggingFace Inference API.
#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl HuggingFaceClient {
    /// Creates a HuggingFace client, resolving the API key from the
    /// explicit argument, `HUGGINGFACE_API_KEY`, or settings.
    ///
    /// # Errors
    ///
    /// Fails at construction when no API key can be resolved.
    pub fn new(api_key: Option<String>, settings: &ProviderSettings) -> ProviderResult<Self> {
        let api_key = resolve_api_key(
            api_key,
            "HUGGINGFACE_API_KEY",
            settings.huggingface_api_key().as_ref(),
            "huggingface",
        )?;
        Ok(Self {
            client: http::client(HUGGINGFACE_TIMEOUT)?,
            api_key,
            model: settings.huggingface_model().clone(),
        })
    }

    #[instrument(skip(self), fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> ProviderResult<GeneratedImage> {
        let mut retried = false;
        loop {
            match self.request(prompt).await? {
                Outcome::Image(image) => return Ok(image),
                Outcome::ModelLoading(detail) => {
                    if retried {
                        return Err(ProviderError::new(ProviderErrorKind::Upstream(detail)));
                    }
                    warn!("Model is loading, waiting before the single retry");
                    tokio::time::sleep(MODEL_LOADING_DELAY).await;
                    retried = true;
                }
            }
        }
    }

    async fn request(&self, prompt: &str) -> ProviderResult<Outcome> {
        let url = format!("{}/{}", HUGGINGFACE_API_BASE, self.model);
        let body = json!({
            "inputs": prompt,
            "parameters": {
                "num_inference_steps": 50,
                "guidance_scale": 7.5,
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let status = response.status();
        if status.as_u16() == 503 {
            let detail = response.text().await.unwrap_or_default();
            return Ok(Outcome::ModelLoading(detail));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_text, "HuggingFace API error");
            return Err(ProviderError::from_status(status.as_u16(), error_text));
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
        info!(bytes = bytes.len(), "HuggingFace returned image");
        Ok(Outcome::Image(GeneratedImage::new(
            bytes.to_vec(),
            content_type,
        )))
    }
}

enum Outcome {
    Image(GeneratedImage),
    ModelLoading(String),
}

#[async_trait]
impl ImageProvider for HuggingFaceClient {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_from_text(&self, prompt: &str) -> ProviderResult<GeneratedImage> {
        ensure_prompt(prompt)?;
        self.generate(prompt).await
    }

    /// The Inference API has no img2img endpoint; the reference image is
    /// read (and the stream rewound) but generation is text-only.
    async fn generate_from_image_and_text(
        &self,
        image: &mut dyn ImageSource,
        prompt: &str,
    ) -> ProviderResult<GeneratedImage> {
        ensure_prompt(prompt)?;
        let reference = read_source(image)?;
        debug!(
            reference_bytes = reference.len(),
            "HuggingFace lacks img2img, generating from text only"
        );
        self.generate(prompt).await
    }

    /// Only the first reference image is consulted.
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
        info!(total, "Using first image for HuggingFace generation");
        self.generate_from_image_and_text(first.as_mut(), prompt)
            .await
    }
}
