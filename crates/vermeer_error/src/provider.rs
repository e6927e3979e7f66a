//! Provider-side error types and HTTP status classification.

/// Provider error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// API key not found in argument, environment, or settings
    MissingApiKey {
        /// Provider name
        provider: String,
        /// Environment variable consulted
        env_var: String,
    },
    /// Vendor rejected the credentials
    Authentication(String),
    /// Vendor throttled the request
    RateLimit(String),
    /// Vendor rejected the request payload
    InvalidRequest(String),
    /// Vendor refused to generate on safety/moderation grounds
    ContentPolicy {
        /// Human-readable description of the block
        message: String,
        /// Vendor block reason/category, when reported
        reason: Option<String>,
    },
    /// Vendor unreachable, timed out, or returned a server error
    Upstream(String),
    /// Vendor responded successfully but the response carried no image payload
    NoImage,
    /// Any other generation failure
    Generation(String),
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderErrorKind::MissingApiKey { provider, env_var } => {
                write!(
                    f,
                    "API key is required for {}. Set the {} environment variable",
                    provider, env_var
                )
            }
            ProviderErrorKind::Authentication(msg) => {
                write!(f, "Authentication failed: {}", msg)
            }
            ProviderErrorKind::RateLimit(msg) => write!(f, "Rate limit exceeded: {}", msg),
            ProviderErrorKind::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ProviderErrorKind::ContentPolicy { message, reason } => match reason {
                Some(reason) => {
                    write!(f, "Blocked by content policy ({}): {}", reason, message)
                }
                None => write!(f, "Blocked by content policy: {}", message),
            },
            ProviderErrorKind::Upstream(msg) => write!(f, "Upstream unavailable: {}", msg),
            ProviderErrorKind::NoImage => {
                write!(f, "No image data found in provider response")
            }
            ProviderErrorKind::Generation(msg) => write!(f, "Generation failed: {}", msg),
        }
    }
}

impl ProviderErrorKind {
    /// Classify a vendor HTTP status code into an error kind.
    ///
    /// This is the single mapping table used by every adapter, replacing
    /// substring matching on vendor error text.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ProviderErrorKind::Authentication(message),
            429 => ProviderErrorKind::RateLimit(message),
            400 | 422 => ProviderErrorKind::InvalidRequest(message),
            408 | 500..=599 => ProviderErrorKind::Upstream(message),
            _ => ProviderErrorKind::Generation(message),
        }
    }

    /// User-facing message that never leaks raw vendor error text for
    /// generic failures, while keeping actionable detail for specific ones.
    pub fn user_message(&self) -> String {
        match self {
            ProviderErrorKind::Authentication(_) => {
                "Authentication failed. Please check your API key.".to_string()
            }
            ProviderErrorKind::RateLimit(_) => {
                "Rate limit exceeded. Please try again later.".to_string()
            }
            ProviderErrorKind::InvalidRequest(_) => {
                "Invalid request. Please check your input.".to_string()
            }
            ProviderErrorKind::ContentPolicy { message, reason } => match reason {
                Some(reason) => format!(
                    "The request was blocked by the provider's content policy ({}): {}",
                    reason, message
                ),
                None => format!(
                    "The request was blocked by the provider's content policy: {}",
                    message
                ),
            },
            ProviderErrorKind::MissingApiKey { .. }
            | ProviderErrorKind::Upstream(_)
            | ProviderErrorKind::NoImage
            | ProviderErrorKind::Generation(_) => {
                "Image generation failed. Please try again later.".to_string()
            }
        }
    }
}

/// Provider error with source location tracking.
///
/// # Examples
///
/// ```
/// use vermeer_error::{ProviderError, ProviderErrorKind};
///
/// let err = ProviderError::new(ProviderErrorKind::NoImage);
/// assert!(format!("{}", err).contains("No image data"));
/// ```
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Classify a vendor HTTP status into a located error.
    #[track_caller]
    pub fn from_status(status: u16, message: String) -> Self {
        Self::new(ProviderErrorKind::from_status(status, message))
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Provider Error: {} at line {} in {}",
            self.kind, self.line, self.file
        )
    }
}

impl std::error::Error for ProviderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_table() {
        let kind = |status| ProviderErrorKind::from_status(status, "x".to_string());
        assert!(matches!(kind(401), ProviderErrorKind::Authentication(_)));
        assert!(matches!(kind(403), ProviderErrorKind::Authentication(_)));
        assert!(matches!(kind(429), ProviderErrorKind::RateLimit(_)));
        assert!(matches!(kind(400), ProviderErrorKind::InvalidRequest(_)));
        assert!(matches!(kind(422), ProviderErrorKind::InvalidRequest(_)));
        assert!(matches!(kind(408), ProviderErrorKind::Upstream(_)));
        assert!(matches!(kind(500), ProviderErrorKind::Upstream(_)));
        assert!(matches!(kind(503), ProviderErrorKind::Upstream(_)));
        assert!(matches!(kind(418), ProviderErrorKind::Generation(_)));
    }

    #[test]
    fn generic_failures_do_not_leak_vendor_text() {
        let kind = ProviderErrorKind::Upstream("secret internal detail".to_string());
        assert!(!kind.user_message().contains("secret"));

        let kind = ProviderErrorKind::Generation("stack trace".to_string());
        assert!(!kind.user_message().contains("stack"));
    }

    #[test]
    fn content_policy_preserves_reason() {
        let kind = ProviderErrorKind::ContentPolicy {
            message: "blocked".to_string(),
            reason: Some("SAFETY".to_string()),
        };
        assert!(kind.user_message().contains("SAFETY"));
    }
}
