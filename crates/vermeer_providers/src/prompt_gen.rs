//! Image-to-prompt generation for the inspire flow.

use crate::client::{effective_mime, read_source};
use crate::settings::{ProviderSettings, resolve_api_key};
use crate::{ProviderResult, http};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{error, instrument, warn};
use vermeer_core::{ImageSource, MAX_PROMPT_CHARS};
use vermeer_error::{ProviderError, ProviderErrorKind};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_TIMEOUT: Duration = Duration::from_secs(120);

/// Capability contract for deriving a reusable text prompt from an image.
#[async_trait]
pub trait PromptGenerator: Send + Sync {
    /// Registered name of this generator.
    fn name(&self) -> &'static str;

    /// Derive an image-generation prompt describing the given image.
    ///
    /// `style` and `detail_level` steer the register of the description,
    /// e.g. "photorealistic" / "detailed".
    async fn generate_prompt_from_image(
        &self,
        image: &mut dyn ImageSource,
        style: &str,
        detail_level: &str,
    ) -> ProviderResult<String>;
}

/// Prompt generator backed by the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiPromptGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiPromptGenerator {
    /// Creates a Gemini prompt generator, resolving the API key from the
    /// explicit argument, `GOOGLE_AI_API_KEY`, or settings.
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
}

/// Instruction sent alongside the image.
fn describe_instruction(style: &str, detail_level: &str) -> String {
    format!(
        "Generate a {detail_level} AI image generation prompt describing this image \
         in a {style} style. Describe the subject, composition, colors, lighting, \
         and setting. Output a single prompt under 1000 characters suitable for \
         AI image generation, with no preamble."
    )
}

#[async_trait]
impl PromptGenerator for GeminiPromptGenerator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    #[instrument(skip(self, image), fields(model = %self.model, filename = %image.filename()))]
    async fn generate_prompt_from_image(
        &self,
        image: &mut dyn ImageSource,
        style: &str,
        detail_level: &str,
    ) -> ProviderResult<String> {
        let mime = effective_mime(image);
        let bytes = read_source(image)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);

        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);
        let body = json!({
            "contents": [{
                "parts": [
                    { "inlineData": { "mimeType": mime, "data": encoded } },
                    { "text": describe_instruction(style, detail_level) },
                ]
            }]
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

        let parsed: TextResponse = response.json().await.map_err(|e| {
            ProviderError::new(ProviderErrorKind::Generation(format!(
                "Failed to parse response: {}",
                e
            )))
        })?;

        let prompt = parsed.text();
        if prompt.is_empty() {
            warn!("Gemini returned no text for prompt derivation");
            return Err(ProviderError::new(ProviderErrorKind::Generation(
                "Generated prompt is empty".to_string(),
            )));
        }
        Ok(truncate_at_word_boundary(&prompt, MAX_PROMPT_CHARS))
    }
}

/// Truncates at the last word boundary within `max_chars`.
fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let clipped: String = text.chars().take(max_chars).collect();
    match clipped.rsplit_once(' ') {
        Some((head, _)) => head.to_string(),
        None => clipped,
    }
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    #[serde(default)]
    candidates: Vec<TextCandidate>,
}

impl TextResponse {
    fn text(&self) -> String {
        let parts: Vec<&str> = self
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();
        parts.join(" ").trim().to_string()
    }
}

#[derive(Debug, Deserialize)]
struct TextCandidate {
    content: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
struct TextContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_word_boundaries() {
        let text = "alpha beta gamma";
        assert_eq!(truncate_at_word_boundary(text, 100), text);
        assert_eq!(truncate_at_word_boundary(text, 12), "alpha beta");
        assert_eq!(truncate_at_word_boundary("abcdefgh", 4), "abcd");
    }

    #[test]
    fn response_text_joins_candidate_parts() {
        let parsed: TextResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "a cat" }, { "text": "on a mat" }] }
            }]
        }))
        .unwrap();
        assert_eq!(parsed.text(), "a cat on a mat");
    }
}
