use std::time::Duration;

/// Provider id reported when no vector backend is configured.
pub const NO_PROVIDER: &str = "none";

/// A recoverable failure on the semantic path: missing configuration,
/// missing credentials, an upstream error or a timeout.
///
/// The orchestrator treats every instance as a signal to fall back to
/// keyword search. The `Display` output is surfaced to clients as
/// `fallbackReason`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct VectorProviderError {
    pub reason: String,
    pub provider: String,
}

impl VectorProviderError {
    pub fn new(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            provider: provider.into(),
        }
    }

    /// No vector backend is configured for this process.
    pub fn unconfigured() -> Self {
        Self::new(NO_PROVIDER, "no provider configured")
    }

    pub fn timeout(provider: impl Into<String>, operation: &str, after: Duration) -> Self {
        Self::new(
            provider,
            format!("{operation} timed out after {}ms", after.as_millis()),
        )
    }
}

/// Error taxonomy of the search engine.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The query text was missing or blank.
    #[error("missing query")]
    MissingQuery,
    /// A request parameter was present but could not be parsed.
    #[error("{0}")]
    InvalidParameter(String),
    #[error(transparent)]
    VectorProvider(#[from] VectorProviderError),
    /// Anything else. Never caught inside the engine.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl SearchError {
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::MissingQuery | Self::InvalidParameter(_))
    }
}
