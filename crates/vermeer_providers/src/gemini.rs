//! Gemini image generation adapter.
//!
//! Talks to the `generateContent` REST endpoint directly. Gemini accepts
//! multiple inline images natively, so the multi-image operation forwards
//! every reference rather than degrading.

use crate::client::{ImageProvider, effective_mime, ensure_prompt, read_source};
use crate::settings::{ProviderSettings, resolve_api_key};
use crate::{ProviderResult, http};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use vermeer_core::{GeneratedImage, ImageSource};
use vermeer_error::{ProviderError, ProviderErrorKind};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_TIMEOUT: Duration = Duration::from_secs(120);

/// Candidate finish reasons that indicate a safety block.
const BLOCKING_FINISH_REASONS: [&str; 3] = ["SAFETY", "PROHIBITED_CONTENT", "IMAGE_SAFETY"];

/// Image generator backed by the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Creates a Gemini client, resolving the API key from the explicit
    /// argument, `GOOGLE_AI_API_KEY`, or settings.
    ///
    /// # Errors
    ///
    /// Fails at construction when no API key can be resolved.
    pub fn new(api_key: Option<String>, settings: &ProviderSettings) -> ProviderResult<Self> {
        let api_key = resolve_api_key(
            api_key,
            "GOOGLE_AI_API_KEY",
            settings.gemini_api_key().as_ref(),
            "gemini",
        )?;
        Ok(Self {
            client: http::client(GEMINI_TIMEOUT)?,
            api_key,
            model: settings.gemini_model().clone(),
        })
    }

    fn inline_part(image: &mut dyn ImageSource) -> ProviderResult<serde_json::Value> {
        let mime = effective_mime(image);
        let bytes = read_source(image)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Ok(json!({ "inlineData": { "mimeType": mime, "data": encoded } }))
    }

    #[instrument(skip(self, parts), fields(model = %self.model, part_count = parts.len()))]
    async fn generate(&self, parts: Vec<serde_json::Value>) -> ProviderResult<GeneratedImage> {
        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);
        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": { "responseModalities": ["IMAGE"] }
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_text, "Gemini API error");
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            error!(error = ?e, "Failed to parse Gemini response");
            ProviderError::new(ProviderErrorKind::Generation(format!(
                "Failed to parse response: {}",
                e
            )))
        })?;

        if let Some(feedback) = &parsed.prompt_feedback
            && let Some(reason) = &feedback.block_reason
        {
            warn!(reason = %reason, "Gemini blocked the prompt");
            return Err(ProviderError::new(ProviderErrorKind::ContentPolicy {
                message: "Gemini refused to process the prompt".to_string(),
                reason: Some(reason.clone()),
            }));
        }

        for candidate in &parsed.candidates {
            if let Some(reason) = &candidate.finish_reason
                && BLOCKING_FINISH_REASONS.contains(&reason.as_str())
            {
                warn!(reason = %reason, "Gemini blocked the candidate");
                return Err(ProviderError::new(ProviderErrorKind::ContentPolicy {
                    message: "Gemini refused to generate the image".to_string(),
                    reason: Some(reason.clone()),
                }));
            }
            let Some(content) = &candidate.content else {
                continue;
            };
            for part in &content.parts {
                if let Some(inline) = &part.inline_data {
                    let bytes = base64::engine::general_purpose::STANDARD
                        .decode(&inline.data)
                        .map_err(|e| {
                            ProviderError::new(ProviderErrorKind::Generation(format!(
                                "Failed to decode image payload: {}",
                                e
                            )))
                        })?;
                    debug!(bytes = bytes.len(), mime = %inline.mime_type, "Gemini returned image");
                    return Ok(GeneratedImage::new(bytes, inline.mime_type.clone()));
                }
            }
        }

        warn!("No image data found in Gemini response");
        Err(ProviderError::new(ProviderErrorKind::NoImage))
    }
}

#[async_trait]
impl ImageProvider for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_from_text(&self, prompt: &str) -> ProviderResult<GeneratedImage> {
        ensure_prompt(prompt)?;
        self.generate(vec![json!({ "text": prompt })]).await
    }

    async fn generate_from_image_and_text(
        &self,
        image: &mut dyn ImageSource,
        prompt: &str,
    ) -> ProviderResult<GeneratedImage> {
        ensure_prompt(prompt)?;
        let parts = vec![json!({ "text": prompt }), Self::inline_part(image)?];
        self.generate(parts).await
    }

    async fn generate_from_multiple_images_and_text(
        &self,
        images: &mut [Box<dyn ImageSource>],
        prompt: &str,
    ) -> ProviderResult<GeneratedImage> {
        ensure_prompt(prompt)?;
        let mut parts = vec![json!({ "text": prompt })];
        for image in images {
            parts.push(Self::inline_part(image.as_mut())?);
        }
        self.generate(parts).await
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[allow(dead_code)]
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}
