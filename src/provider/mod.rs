//! Vector provider resolution and query embedding.
//!
//! The provider is resolved exactly once from [`VectorConfig`] when the
//! service starts and handed to the semantic engine as an immutable
//! [`ProviderState`].

pub mod cache;
pub mod embeddings;

use crate::config::VectorConfig;

/// In-process cosine index loaded from the offline job's export.
pub const LOCAL_PROVIDER: &str = "local";
/// REST vector index reached over HTTP.
pub const HTTP_PROVIDER: &str = "http";

const KNOWN_PROVIDERS: [&str; 2] = [LOCAL_PROVIDER, HTTP_PROVIDER];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderState {
    Unconfigured,
    Configured { provider_id: String },
}

impl ProviderState {
    pub fn provider_id(&self) -> Option<&str> {
        match self {
            ProviderState::Unconfigured => None,
            ProviderState::Configured { provider_id } => Some(provider_id),
        }
    }
}

/// Resolve which vector backend is configured. Blank or unrecognised
/// provider ids resolve to [`ProviderState::Unconfigured`].
pub fn resolve_provider(config: &VectorConfig) -> ProviderState {
    let Some(raw) = config.provider.as_deref() else {
        return ProviderState::Unconfigured;
    };
    let id = raw.trim().to_ascii_lowercase();
    if KNOWN_PROVIDERS.contains(&id.as_str()) {
        ProviderState::Configured { provider_id: id }
    } else {
        ProviderState::Unconfigured
    }
}
