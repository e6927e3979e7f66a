//! Prompt-driven image generation backend with a deduplicating prompt
//! ledger.
//!
//! The facade wires the provider abstraction ([`vermeer_providers`]) to the
//! prompt ledger ([`vermeer_database`]) through the
//! [`GenerationOrchestrator`], with layered [`Settings`] for configuration.

mod orchestrator;
mod settings;
mod store;

pub use orchestrator::{
    GenerationOrchestrator, GenerationOutcome, GenerationRequest, GenerationRequestBuilder,
};
pub use settings::Settings;
pub use store::PromptStore;

// Convenience re-exports for callers assembling the service.
pub use vermeer_core::{GeneratedImage, ImageSource, ImageUpload};
pub use vermeer_database::{PromptLedger, PromptRow, PromptStats, create_pool, run_migrations};
pub use vermeer_error::{VermeerError, VermeerErrorKind, VermeerResult};
pub use vermeer_providers::{ImageProvider, ProviderFactory, ProviderSettings};
