//! Conversion from requests to domain subscriptions.

use crate::error::{Result, SubscriptionError};
use crate::provider::ProviderRegistry;
use crate::types::{CreateSubscriptionRequest, Status, Subscription, UserId};
use std::sync::LazyLock;

static MAPPER: LazyLock<SubscriptionMapper> =
    LazyLock::new(|| SubscriptionMapper::new(ProviderRegistry::global()));

/// Maps a [`CreateSubscriptionRequest`] onto a fresh [`Subscription`].
///
/// The mapper does not validate: absent fields stay absent and an unknown
/// provider name maps to no provider. The result is always `ACTIVE`.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionMapper {
    registry: &'static ProviderRegistry,
}

impl SubscriptionMapper {
    /// Create a mapper resolving providers through `registry`.
    #[must_use]
    pub const fn new(registry: &'static ProviderRegistry) -> Self {
        Self { registry }
    }

    /// The process-wide mapper instance.
    #[must_use]
    pub fn global() -> &'static Self {
        &MAPPER
    }

    /// Map a request to an unpersisted, active subscription.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::NullRequest`] if `request` is `None`.
    pub fn map(&self, request: Option<&CreateSubscriptionRequest>) -> Result<Subscription> {
        let request = request.ok_or(SubscriptionError::NullRequest)?;

        Ok(Subscription {
            id: None,
            user_id: request.user_id.map(UserId),
            name: request.name.clone(),
            provider: self.registry.try_resolve(request.provider.as_deref()),
            expiration_date: request.expiration_date,
            status: Status::Active,
        })
    }
}
