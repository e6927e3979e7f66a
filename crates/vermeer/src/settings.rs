//! Application settings.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use vermeer_error::{ConfigError, VermeerResult};
use vermeer_providers::ProviderSettings;

/// Default maximum upload size (10 MiB).
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Application settings, layered from defaults, an optional `vermeer.toml`,
/// and `VERMEER__*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct Settings {
    /// Per-vendor API keys and model identifiers
    providers: ProviderSettings,
    /// Provider used when a request does not name one
    default_provider: String,
    /// Maximum accepted upload size in bytes
    max_upload_bytes: u64,
    /// MIME type allow-list for uploads
    allowed_image_types: Vec<String>,
    /// Maximum reference images per request
    max_images_per_request: usize,
    /// Persist never-seen prompts from the generation path, with a
    /// thumbnail rendered from the generated image
    auto_save_generated: bool,
    /// Age threshold in days for the thumbnail-less cleanup sweep
    cleanup_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            providers: ProviderSettings::default(),
            default_provider: "gemini".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_image_types: vec![
                "image/jpeg".to_string(),
                "image/jpg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            max_images_per_request: 10,
            auto_save_generated: false,
            cleanup_days: 90,
        }
    }
}

impl Settings {
    /// Load settings from `vermeer.toml` (optional) and `VERMEER__*`
    /// environment variables, on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when a source cannot be read or a value fails to
    /// parse.
    pub fn load() -> VermeerResult<Self> {
        dotenvy::dotenv().ok();
        let config = config::Config::builder()
            .add_source(config::File::with_name("vermeer").required(false))
            .add_source(config::Environment::with_prefix("VERMEER").separator("__"))
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to load configuration: {}", e)))?;
        config
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)).into())
    }

    /// True when the MIME type is in the allow-list.
    ///
    /// Comparison is case-insensitive and `image/jpg` is treated as
    /// `image/jpeg`.
    pub fn is_allowed_mime(&self, mime: &str) -> bool {
        let normalized = normalize_mime(mime);
        self.allowed_image_types
            .iter()
            .any(|allowed| normalize_mime(allowed) == normalized)
    }
}

fn normalize_mime(mime: &str) -> String {
    let lowered = mime.to_ascii_lowercase();
    if lowered == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        lowered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let settings = Settings::default();
        assert_eq!(settings.default_provider(), "gemini");
        assert_eq!(*settings.max_upload_bytes(), 10 * 1024 * 1024);
        assert!(!*settings.auto_save_generated());
        assert_eq!(*settings.cleanup_days(), 90);
    }

    #[test]
    fn mime_allow_list_normalizes_jpg_aliases() {
        let settings = Settings::default();
        assert!(settings.is_allowed_mime("image/jpeg"));
        assert!(settings.is_allowed_mime("image/jpg"));
        assert!(settings.is_allowed_mime("IMAGE/PNG"));
        assert!(settings.is_allowed_mime("image/webp"));
        assert!(!settings.is_allowed_mime("image/tiff"));
        assert!(!settings.is_allowed_mime("application/pdf"));
    }
}
