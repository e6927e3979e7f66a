//! Provider factories.

use crate::client::ImageProvider;
use crate::gemini::GeminiClient;
use crate::huggingface::HuggingFaceClient;
use crate::prompt_gen::{GeminiPromptGenerator, PromptGenerator};
use crate::replicate::ReplicateClient;
use crate::settings::ProviderSettings;
use crate::stability::StabilityClient;
use std::str::FromStr;
use strum::IntoEnumIterator;
use tracing::info;
use vermeer_error::{UnsupportedProviderError, VermeerResult};

/// Registered image generation providers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderKind {
    /// Google Gemini
    Gemini,
    /// Replicate (FLUX)
    Replicate,
    /// Stability AI
    Stability,
    /// HuggingFace Inference API
    HuggingFace,
}

/// Factory for image generation providers.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Creates an image provider for the given name.
    ///
    /// Names are trimmed and matched case-insensitively. When `api_key` is
    /// omitted the adapter resolves its key from the environment or
    /// settings, failing at construction when none is found.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedProviderError`] listing the registered names
    /// when the name does not match, and a provider configuration error
    /// when no API key can be resolved.
    pub fn create(
        provider: &str,
        api_key: Option<String>,
        settings: &ProviderSettings,
    ) -> VermeerResult<Box<dyn ImageProvider>> {
        let name = provider.trim();
        let kind = ProviderKind::from_str(name).map_err(|_| {
            UnsupportedProviderError::new(name, Self::available_providers())
        })?;
        info!(provider = %kind, "Creating image provider");
        let client: Box<dyn ImageProvider> = match kind {
            ProviderKind::Gemini => Box::new(GeminiClient::new(api_key, settings)?),
            ProviderKind::Replicate => Box::new(ReplicateClient::new(api_key, settings)?),
            ProviderKind::Stability => Box::new(StabilityClient::new(api_key, settings)?),
            ProviderKind::HuggingFace => Box::new(HuggingFaceClient::new(api_key, settings)?),
        };
        Ok(client)
    }

    /// Registered provider names.
    pub fn available_providers() -> Vec<String> {
        ProviderKind::iter().map(|kind| kind.to_string()).collect()
    }
}

/// Factory for image-to-prompt generators.
pub struct PromptGeneratorFactory;

impl PromptGeneratorFactory {
    /// Creates a prompt generator for the given name (currently Gemini
    /// only).
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedProviderError`] listing the registered names
    /// when the name does not match.
    pub fn create(
        provider: &str,
        api_key: Option<String>,
        settings: &ProviderSettings,
    ) -> VermeerResult<Box<dyn PromptGenerator>> {
        let name = provider.trim();
        if !name.eq_ignore_ascii_case("gemini") {
            return Err(
                UnsupportedProviderError::new(name, Self::available_providers()).into(),
            );
        }
        info!("Creating gemini prompt generator");
        Ok(Box::new(GeminiPromptGenerator::new(api_key, settings)?))
    }

    /// Registered prompt generator names.
    pub fn available_providers() -> Vec<String> {
        vec![ProviderKind::Gemini.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_render_lowercase() {
        assert_eq!(
            ProviderFactory::available_providers(),
            vec!["gemini", "replicate", "stability", "huggingface"]
        );
    }

    #[test]
    fn name_parsing_is_case_insensitive() {
        assert_eq!(
            ProviderKind::from_str("GEMINI").unwrap(),
            ProviderKind::Gemini
        );
        assert_eq!(
            ProviderKind::from_str("HuggingFace").unwrap(),
            ProviderKind::HuggingFace
        );
        assert!(ProviderKind::from_str("not-a-provider").is_err());
    }
}
