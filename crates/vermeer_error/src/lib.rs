//! Error types for the Vermeer image generation library.
//!
//! Each domain (providers, ledger, input validation, configuration) has its
//! own error struct with a kind enum and source-location capture. The
//! crate-level [`VermeerError`] aggregates them for the service layer, and
//! carries the HTTP status mapping consumed by the routing boundary.

mod config;
mod factory;
mod input;
mod ledger;
mod provider;

pub use config::ConfigError;
pub use factory::UnsupportedProviderError;
pub use input::InvalidInputError;
pub use ledger::{LedgerError, LedgerErrorKind};
pub use provider::{ProviderError, ProviderErrorKind};

/// Crate-level error variants.
#[derive(Debug, derive_more::From)]
pub enum VermeerErrorKind {
    /// Request validation failure, surfaced before any vendor call
    Input(InvalidInputError),
    /// Unknown provider name
    UnsupportedProvider(UnsupportedProviderError),
    /// Configuration failure
    Config(ConfigError),
    /// Vendor-side generation failure
    Provider(ProviderError),
    /// Prompt ledger failure
    Ledger(LedgerError),
}

impl std::fmt::Display for VermeerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VermeerErrorKind::Input(e) => write!(f, "{}", e),
            VermeerErrorKind::UnsupportedProvider(e) => write!(f, "{}", e),
            VermeerErrorKind::Config(e) => write!(f, "{}", e),
            VermeerErrorKind::Provider(e) => write!(f, "{}", e),
            VermeerErrorKind::Ledger(e) => write!(f, "{}", e),
        }
    }
}

impl VermeerErrorKind {
    /// HTTP status code the routing layer should map this error to.
    pub fn http_status(&self) -> u16 {
        match self {
            VermeerErrorKind::Input(_) => 400,
            VermeerErrorKind::UnsupportedProvider(_) => 400,
            VermeerErrorKind::Config(_) => 500,
            VermeerErrorKind::Provider(e) => match &e.kind {
                ProviderErrorKind::Authentication(_) => 401,
                ProviderErrorKind::RateLimit(_) => 429,
                ProviderErrorKind::InvalidRequest(_) => 400,
                ProviderErrorKind::ContentPolicy { .. } => 400,
                ProviderErrorKind::MissingApiKey { .. }
                | ProviderErrorKind::Upstream(_)
                | ProviderErrorKind::NoImage
                | ProviderErrorKind::Generation(_) => 500,
            },
            VermeerErrorKind::Ledger(e) => match &e.kind {
                LedgerErrorKind::NotFound => 404,
                _ => 500,
            },
        }
    }

    /// User-facing message, sanitized for generic vendor failures.
    pub fn user_message(&self) -> String {
        match self {
            VermeerErrorKind::Input(e) => e.message.clone(),
            VermeerErrorKind::UnsupportedProvider(e) => format!(
                "Unsupported provider: {}. Available providers: {}",
                e.requested,
                e.available.join(", ")
            ),
            VermeerErrorKind::Config(_) => {
                "Service is misconfigured. Please contact the operator.".to_string()
            }
            VermeerErrorKind::Provider(e) => e.kind.user_message(),
            VermeerErrorKind::Ledger(e) => match &e.kind {
                LedgerErrorKind::NotFound => "Prompt not found".to_string(),
                _ => "A storage error occurred. Please try again later.".to_string(),
            },
        }
    }
}

/// Vermeer error with kind discrimination.
#[derive(Debug)]
pub struct VermeerError(Box<VermeerErrorKind>);

impl VermeerError {
    /// Create a new error from a kind.
    pub fn new(kind: VermeerErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &VermeerErrorKind {
        &self.0
    }

    /// HTTP status code for the routing boundary.
    pub fn http_status(&self) -> u16 {
        self.0.http_status()
    }

    /// User-facing message for the routing boundary.
    pub fn user_message(&self) -> String {
        self.0.user_message()
    }
}

impl std::fmt::Display for VermeerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Vermeer Error: {}", self.0)
    }
}

impl std::error::Error for VermeerError {}

// Generic From implementation for any type that converts to VermeerErrorKind
impl<T> From<T> for VermeerError
where
    T: Into<VermeerErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Vermeer operations.
pub type VermeerResult<T> = std::result::Result<T, VermeerError>;
