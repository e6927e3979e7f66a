//! Shared HTTP plumbing for vendor adapters.

use std::time::Duration;
use vermeer_error::{ProviderError, ProviderErrorKind};

/// Builds a reqwest client with the given request timeout.
pub(crate) fn client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
        ProviderError::new(ProviderErrorKind::Generation(format!(
            "Failed to build HTTP client: {}",
            e
        )))
    })
}

/// Maps a reqwest transport failure into the provider error domain.
///
/// Timeouts and connection failures are upstream-availability problems;
/// anything else is a generic generation failure.
pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() {
        ProviderError::new(ProviderErrorKind::Upstream(err.to_string()))
    } else {
        ProviderError::new(ProviderErrorKind::Generation(err.to_string()))
    }
}
