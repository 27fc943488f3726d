//! Error types for subscription lifecycle operations.

use crate::storage::StorageError;
use crate::types::SubscriptionId;
use crate::validation::ValidationError;
use thiserror::Error;

/// Result type alias for subscription operations.
pub type Result<T> = std::result::Result<T, SubscriptionError>;

/// Failure modes of the lifecycle engine and its collaborators.
///
/// "Doesn't exist" ([`SubscriptionError::SubscriptionNotFound`]) and
/// "exists but is in the wrong state" ([`SubscriptionError::IllegalTransition`])
/// are distinct variants so callers can react to each.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubscriptionError {
    // ═══════════════════════════════════════════════════════════
    // Request Errors
    // ═══════════════════════════════════════════════════════════

    /// The request itself was absent.
    #[error("Subscription request is missing")]
    NullRequest,

    /// The request failed validation.
    ///
    /// Always carries every violated rule, never just the first one.
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// The identifier is not a valid positive subscription id.
    #[error("Invalid subscription id {id}")]
    InvalidId {
        /// Raw identifier as supplied by the caller
        id: i64,
        /// Human-readable detail, absent on the expire path
        message: Option<String>,
    },

    // ═══════════════════════════════════════════════════════════
    // Lookup Errors
    // ═══════════════════════════════════════════════════════════

    /// No subscription exists with this id.
    #[error("Subscription {0} not found")]
    SubscriptionNotFound(SubscriptionId),

    /// The provider name matches no known provider.
    #[error("Unknown provider: {0}")]
    ProviderNotFound(String),

    // ═══════════════════════════════════════════════════════════
    // State Machine Errors
    // ═══════════════════════════════════════════════════════════

    /// The subscription's current status forbids the requested transition.
    #[error("{0}")]
    IllegalTransition(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Storage collaborator failure, propagated unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SubscriptionError {
    /// Returns `true` for lookups that found nothing (unknown id or provider).
    ///
    /// # Examples
    ///
    /// ```
    /// # use subscription_core::{SubscriptionError, SubscriptionId};
    /// assert!(SubscriptionError::SubscriptionNotFound(SubscriptionId(7)).is_not_found());
    /// assert!(!SubscriptionError::NullRequest.is_not_found());
    /// ```
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SubscriptionNotFound(_) | Self::ProviderNotFound(_)
        )
    }

    /// Returns `true` if this is a validation failure.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns the validation errors carried by this error, if any.
    #[must_use]
    pub fn validation_errors(&self) -> Option<&[ValidationError]> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Returns the human-readable detail of an [`SubscriptionError::InvalidId`]
    /// or [`SubscriptionError::IllegalTransition`].
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::InvalidId { message, .. } => message.as_deref(),
            Self::IllegalTransition(message) => Some(message),
            _ => None,
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
