//! Provider configuration.

use crate::ProviderResult;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use vermeer_error::{ProviderError, ProviderErrorKind};

/// Default Gemini image model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Default Replicate model route.
pub const DEFAULT_REPLICATE_MODEL: &str = "black-forest-labs/flux-dev";

/// Default HuggingFace Inference API model.
pub const DEFAULT_HUGGINGFACE_MODEL: &str = "stabilityai/stable-diffusion-xl-base-1.0";

/// Per-vendor API keys and model identifiers.
///
/// Keys are optional here: each adapter resolves its key in priority order
/// explicit argument, environment variable, then this settings object, and
/// fails at construction when none is found.
#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct ProviderSettings {
    /// Gemini API key (env fallback: GOOGLE_AI_API_KEY)
    gemini_api_key: Option<String>,
    /// Replicate API key (env fallback: REPLICATE_API_KEY)
    replicate_api_key: Option<String>,
    /// Stability API key (env fallback: STABILITY_AI_API_KEY)
    stability_api_key: Option<String>,
    /// HuggingFace API key (env fallback: HUGGINGFACE_API_KEY)
    huggingface_api_key: Option<String>,
    /// Gemini image model identifier
    gemini_model: String,
    /// Replicate model route (owner/name)
    replicate_model: String,
    /// HuggingFace Inference API model identifier
    huggingface_model: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            replicate_api_key: None,
            stability_api_key: None,
            huggingface_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            replicate_model: DEFAULT_REPLICATE_MODEL.to_string(),
            huggingface_model: DEFAULT_HUGGINGFACE_MODEL.to_string(),
        }
    }
}

/// Resolves an API key: explicit argument, then environment variable, then
/// the settings object. Fails fast when none is present.
pub(crate) fn resolve_api_key(
    explicit: Option<String>,
    env_var: &str,
    configured: Option<&String>,
    provider: &str,
) -> ProviderResult<String> {
    if let Some(key) = explicit.filter(|k| !k.is_empty()) {
        return Ok(key);
    }
    if let Ok(key) = std::env::var(env_var)
        && !key.is_empty()
    {
        return Ok(key);
    }
    if let Some(key) = configured.filter(|k| !k.is_empty()) {
        return Ok(key.clone());
    }
    Err(ProviderError::new(ProviderErrorKind::MissingApiKey {
        provider: provider.to_string(),
        env_var: env_var.to_string(),
    }))
}
