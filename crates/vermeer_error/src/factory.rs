//! Provider factory error types.

/// Requested provider name did not match any registered adapter.
#[derive(Debug, Clone)]
pub struct UnsupportedProviderError {
    /// The name that was requested
    pub requested: String,
    /// The registered provider names
    pub available: Vec<String>,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl UnsupportedProviderError {
    /// Create a new UnsupportedProviderError at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use vermeer_error::UnsupportedProviderError;
    ///
    /// let err = UnsupportedProviderError::new("dall-e", vec!["gemini".to_string()]);
    /// assert!(format!("{}", err).contains("gemini"));
    /// ```
    #[track_caller]
    pub fn new(requested: impl Into<String>, available: Vec<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            requested: requested.into(),
            available,
            line: location.line(),
            file: location.file(),
        }
    }
}

impl std::fmt::Display for UnsupportedProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Unsupported provider: {}. Available providers: {} at line {} in {}",
            self.requested,
            self.available.join(", "),
            self.line,
            self.file
        )
    }
}

impl std::error::Error for UnsupportedProviderError {}
