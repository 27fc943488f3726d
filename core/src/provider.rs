//! Supported subscription providers and name lookup.

use crate::error::{Result, SubscriptionError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Third-party provider a subscription is held with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provider {
    /// Google.
    Google,
    /// Apple.
    Apple,
}

impl Provider {
    /// Every supported provider.
    pub const ALL: [Self; 2] = [Self::Google, Self::Apple];

    /// Get the provider name as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "GOOGLE",
            Self::Apple => "APPLE",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static REGISTRY: LazyLock<ProviderRegistry> = LazyLock::new(ProviderRegistry::new);

/// Case-insensitive provider lookup.
///
/// The name table is built once; the registry is immutable afterwards and
/// can be shared between threads freely.
///
/// # Example
///
/// ```
/// use subscription_core::provider::{Provider, ProviderRegistry};
///
/// let registry = ProviderRegistry::global();
/// assert_eq!(registry.resolve(Some("google")).ok(), Some(Provider::Google));
/// assert_eq!(registry.try_resolve(Some("bogus")), None);
/// ```
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    by_name: HashMap<String, Provider>,
}

impl ProviderRegistry {
    /// Build a registry covering [`Provider::ALL`].
    #[must_use]
    pub fn new() -> Self {
        let by_name = Provider::ALL
            .iter()
            .map(|provider| (provider.as_str().to_lowercase(), *provider))
            .collect();
        Self { by_name }
    }

    /// The process-wide registry instance.
    #[must_use]
    pub fn global() -> &'static Self {
        &REGISTRY
    }

    /// Resolve a provider name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::ProviderNotFound`] if the name is absent,
    /// empty, or matches no provider.
    pub fn resolve(&self, name: Option<&str>) -> Result<Provider> {
        self.try_resolve(name)
            .ok_or_else(|| SubscriptionError::ProviderNotFound(name.unwrap_or_default().to_string()))
    }

    /// Resolve a provider name, ignoring case, returning `None` on no match.
    #[must_use]
    pub fn try_resolve(&self, name: Option<&str>) -> Option<Provider> {
        let name = name?;
        self.by_name.get(&name.to_lowercase()).copied()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
