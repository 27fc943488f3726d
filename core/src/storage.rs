//! Storage collaborator contract.
//!
//! The engine reads and writes subscriptions only through
//! [`SubscriptionStore`]. Implementations live outside this crate
//! (in-memory for tests, `PostgreSQL` for production).

use crate::types::{Subscription, SubscriptionId, UserId};
use thiserror::Error;

/// Errors raised by storage implementations.
///
/// The engine never inspects or retries these; they reach the caller as
/// [`crate::SubscriptionError::Storage`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// An update was attempted on a record that was never persisted.
    #[error("Subscription has no id")]
    MissingId,

    /// An update targeted a record that does not exist.
    #[error("Subscription {0} does not exist in storage")]
    NotFound(SubscriptionId),

    /// Internal storage failure (lock poisoning, corrupt row).
    #[error("Internal storage error: {0}")]
    Internal(String),
}

/// Persistence for subscriptions.
///
/// # Ordering
///
/// [`SubscriptionStore::find_by_owning_user`] returns records in a stable
/// order; the engine treats the first one as the record to update.
pub trait SubscriptionStore: Send + Sync {
    /// Find every subscription owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails. An unknown user is not an error.
    async fn find_by_owning_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Subscription>, StorageError>;

    /// Find a subscription by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails. An unknown id yields `Ok(None)`.
    async fn find_by_id(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, StorageError>;

    /// Insert `subscription` if it has no id, otherwise update it.
    ///
    /// # Returns
    ///
    /// The persisted record, with its id assigned.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    async fn create_or_update(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, StorageError>;

    /// Update an already-persisted subscription.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The record has no id → `StorageError::MissingId`
    /// - No record has that id → `StorageError::NotFound`
    /// - The write fails
    async fn update(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, StorageError>;
}
