//! Generative-image vendor integrations for Vermeer.
//!
//! Each adapter implements the [`ImageProvider`] capability trait and
//! translates the uniform contract into vendor-specific REST calls,
//! normalizing failures into the shared provider error taxonomy. The
//! [`ProviderFactory`] maps provider names to adapters.

mod client;
mod factory;
mod gemini;
mod http;
mod huggingface;
mod prompt_gen;
mod replicate;
mod settings;
mod stability;

pub use client::{ImageProvider, mime_for_filename, reference_data_url};
pub use factory::{ProviderFactory, ProviderKind, PromptGeneratorFactory};
pub use gemini::GeminiClient;
pub use huggingface::HuggingFaceClient;
pub use prompt_gen::{GeminiPromptGenerator, PromptGenerator};
pub use replicate::ReplicateClient;
pub use settings::{
    DEFAULT_GEMINI_MODEL, DEFAULT_HUGGINGFACE_MODEL, DEFAULT_REPLICATE_MODEL, ProviderSettings,
};
pub use stability::StabilityClient;

/// Result type for provider operations.
pub type ProviderResult<T> = std::result::Result<T, vermeer_error::ProviderError>;
