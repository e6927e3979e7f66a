//! Replicate image generation adapter.
//!
//! Uses the synchronous predictions API (`Prefer: wait`) against a FLUX
//! model route. Replicate predictions return output URLs, so the final
//! image is downloaded in a second request. Multi-image generation uses the
//! first image only.

use crate::client::{ImageProvider, ensure_prompt, reference_data_url};
use crate::settings::{ProviderSettings, resolve_api_key};
use crate::{ProviderResult, http};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use vermeer_core::{GeneratedImage, ImageSource};
use vermeer_error::{ProviderError, ProviderErrorKind};

const REPLICATE_API_BASE: &str = "https://api.replicate.com/v1";
const REPLICATE_TIMEOUT: Duration = Duration::from_secs(120);

/// Image generator backed by the Replicate predictions API.
#[derive(Debug, Clone)]
pub struct ReplicateClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ReplicateClient {
    /// Creates a Replicate client, resolving the API key from the explicit
    /// argument, `REPLICATE_API_KEY`, or settings.
    ///
    /// # Errors
    ///
    /// Fails at construction when no API key can be resolved.
    pub fn new(api_key: Option<String>, settings: &ProviderSettings) -> ProviderResult<Self> {
        let api_key = resolve_api_key(
            api_key,
            "REPLICATE_API_KEY",
            settings.replicate_api_key().as_ref(),
            "replicate",
        )?;
        Ok(Self {
            client: http::client(REPLICATE_TIMEOUT)?,
            api_key,
            model: settings.replicate_model().clone(),
        })
    }

    #[instrument(skip(self, input), fields(model = %self.model))]
    async fn run_prediction(&self, input: serde_json::Value) -> ProviderResult<GeneratedImage> {
        let url = format!("{}/models/{}/predictions", REPLICATE_API_BASE, self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Prefer", "wait")
            .json(&json!({ "input": input }))
            .send()
            .await
            .map_err(http::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_text, "Replicate API error");
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let prediction: Prediction = response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse Replicate response");
            ProviderError::new(ProviderErrorKind::Generation(format!(
                "Failed to parse response: {}",
                e
            )))
        })?;

        if let Some(error) = prediction.error.filter(|e| !e.is_empty()) {
            error!(error = %error, "Replicate prediction failed");
            return Err(ProviderError::new(ProviderErrorKind::Generation(error)));
        }

        let Some(output_url) = prediction.first_output_url() else {
            debug!(status = ?prediction.status, "Replicate prediction returned no output");
            return Err(ProviderError::new(ProviderErrorKind::NoImage));
        };

        self.download(&output_url).await
    }

    async fn download(&self, url: &str) -> ProviderResult<GeneratedImage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(http::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(
                status.as_u16(),
                format!("Failed to download prediction output from {}", url),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response.bytes().await.map_err(http::transport_error)?;
        info!(bytes = bytes.len(), "Downloaded Replicate output");
        Ok(GeneratedImage::new(bytes.to_vec(), content_type))
    }
}

#[async_trait]
impl ImageProvider for ReplicateClient {
    fn name(&self) -> &'static str {
        "replicate"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_from_text(&self, prompt: &str) -> ProviderResult<GeneratedImage> {
        ensure_prompt(prompt)?;
        self.run_prediction(json!({
            "prompt": prompt,
            "num_outputs": 1,
            "guidance_scale": 7.5,
            "num_inference_steps": 28,
        }))
        .await
    }

    async fn generate_from_image_and_text(
        &self,
        image: &mut dyn ImageSource,
        prompt: &str,
    ) -> ProviderResult<GeneratedImage> {
        ensure_prompt(prompt)?;
        let data_url = reference_data_url(image)?;
        self.run_prediction(json!({
            "prompt": prompt,
            "image": data_url,
            "num_outputs": 1,
            "guidance_scale": 7.5,
            "num_inference_steps": 28,
        }))
        .await
    }

    /// FLUX takes a single conditioning image, so only the first reference
    /// is used.
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
        info!(total, "Using first image for Replicate generation");
        self.generate_from_image_and_text(first.as_mut(), prompt)
            .await
    }
}

#[derive(Debug, Deserialize)]
struct Prediction {
    status: Option<String>,
    #[serde(default)]
    output: Option<serde_json::Value>,
    error: Option<String>,
}

impl Prediction {
    /// Output may be a single URL or a list of URLs.
    fn first_output_url(&self) -> Option<String> {
        match self.output.as_ref()? {
            serde_json::Value::String(url) => Some(url.clone()),
            serde_json::Value::Array(urls) => urls
                .first()
                .and_then(|v| v.as_str())
                .map(str::to_string),
            _ => None,
        }
    }
}
