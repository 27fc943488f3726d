//! Domain types for subscriptions.
//!
//! - [`Subscription`]: the persisted record
//! - [`CreateSubscriptionRequest`]: the unvalidated input to the engine
//! - [`Status`]: the lifecycle state

use crate::error::SubscriptionError;
use crate::provider::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a persisted subscription, assigned by storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub i64);

impl SubscriptionId {
    /// Parse a raw identifier, rejecting non-positive values.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::InvalidId`] with the given detail when
    /// `raw` is zero or negative.
    pub fn parse(raw: i64, message: Option<String>) -> Result<Self, SubscriptionError> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(SubscriptionError::InvalidId { id: raw, message })
        }
    }

    /// Returns the inner value.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the user that owns a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a subscription.
///
/// ```text
/// ACTIVE ──cancel──► CANCELED ──expire──► EXPIRED
///    │                                       ▲
///    └───────────────expire──────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Subscription is in force.
    Active,
    /// Subscription term has ended.
    Expired,
    /// Subscription was canceled by its owner.
    Canceled,
}

impl Status {
    /// Convert status to its storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Expired => "EXPIRED",
            Self::Canceled => "CANCELED",
        }
    }

    /// Parse status from its storage representation.
    ///
    /// # Errors
    ///
    /// Returns the offending string if it doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "EXPIRED" => Ok(Self::Expired),
            "CANCELED" => Ok(Self::Canceled),
            _ => Err(format!("Invalid subscription status: {s}")),
        }
    }

    /// Returns `true` once a subscription has been canceled or expired.
    ///
    /// Terminal subscriptions are never renamed or canceled; only
    /// `CANCELED → EXPIRED` remains possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Canceled)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's subscription to a third-party provider.
///
/// Fields other than `status` are optional because the mapper copies
/// whatever the request carried; storage requires them to be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Storage-assigned id, absent until first persisted.
    pub id: Option<SubscriptionId>,
    /// Owning user.
    pub user_id: Option<UserId>,
    /// Display name.
    pub name: Option<String>,
    /// Provider the subscription is held with.
    pub provider: Option<Provider>,
    /// End of the subscription term.
    pub expiration_date: Option<DateTime<Utc>>,
    /// Current lifecycle status.
    pub status: Status,
}

impl Subscription {
    /// Create an empty, unpersisted subscription with the given status.
    #[must_use]
    pub const fn new(status: Status) -> Self {
        Self {
            id: None,
            user_id: None,
            name: None,
            provider: None,
            expiration_date: None,
            status,
        }
    }

    /// Set the id.
    #[must_use]
    pub const fn with_id(mut self, id: SubscriptionId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the owning user.
    #[must_use]
    pub const fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the provider.
    #[must_use]
    pub const fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the expiration timestamp.
    #[must_use]
    pub const fn with_expiration_date(mut self, expiration_date: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }

    /// Returns `true` if the subscription is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

/// Incoming request to create or update a user's subscription.
///
/// Nothing is guaranteed about its contents until it has passed
/// [`crate::validation::RequestValidator`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Owning user.
    pub user_id: Option<i64>,
    /// Display name.
    pub name: Option<String>,
    /// Provider name, matched case-insensitively.
    pub provider: Option<String>,
    /// Requested end of the subscription term.
    pub expiration_date: Option<DateTime<Utc>>,
}

impl CreateSubscriptionRequest {
    /// Create an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the owning user.
    #[must_use]
    pub const fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the provider name.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the expiration timestamp.
    #[must_use]
    pub const fn with_expiration_date(mut self, expiration_date: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }
}
