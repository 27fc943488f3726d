//! The subscription lifecycle engine.
//!
//! # State Machine
//!
//! ```text
//!            reconcile (new user)
//!                   │
//!                   ▼
//!               ┌────────┐  cancel   ┌──────────┐
//!               │ ACTIVE │──────────►│ CANCELED │
//!               └────────┘           └──────────┘
//!                   │                     │
//!                   │ expire              │ expire
//!                   ▼                     │
//!               ┌─────────┐               │
//!               │ EXPIRED │◄──────────────┘
//!               └─────────┘
//! ```
//!
//! `CANCELED` and `EXPIRED` are terminal for name/provider changes;
//! `CANCELED → EXPIRED` is the only move out of a terminal status.
//!
//! # Concurrency
//!
//! The engine holds no mutable state. Two concurrent `reconcile` calls for
//! the same user are not serialized here: both may observe "no existing
//! subscription" and create two records. Uniqueness, if required, must be
//! enforced by the store.

use crate::environment::Clock;
use crate::error::{Result, SubscriptionError};
use crate::mapper::SubscriptionMapper;
use crate::storage::{StorageError, SubscriptionStore};
use crate::types::{CreateSubscriptionRequest, Status, Subscription, SubscriptionId, UserId};
use crate::validation::{RequestValidator, ValidationError, codes};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Orchestrates reconcile, cancel and expire against a [`SubscriptionStore`].
///
/// # Example
///
/// ```ignore
/// let engine = LifecycleEngine::new(store, Arc::new(SystemClock));
///
/// let subscription = engine.reconcile(Some(&request)).await?;
/// let id = subscription.id.map_or(0, |id| id.as_i64());
///
/// engine.cancel(id).await?;
/// engine.expire(id).await?;
/// ```
pub struct LifecycleEngine<S> {
    storage: S,
    clock: Arc<dyn Clock>,
    validator: &'static RequestValidator,
    mapper: &'static SubscriptionMapper,
}

impl<S: SubscriptionStore> LifecycleEngine<S> {
    /// Create an engine using the process-wide validator and mapper.
    #[must_use]
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self::with_collaborators(
            storage,
            clock,
            RequestValidator::global(),
            SubscriptionMapper::global(),
        )
    }

    /// Create an engine with explicit validator and mapper instances.
    #[must_use]
    pub fn with_collaborators(
        storage: S,
        clock: Arc<dyn Clock>,
        validator: &'static RequestValidator,
        mapper: &'static SubscriptionMapper,
    ) -> Self {
        Self {
            storage,
            clock,
            validator,
            mapper,
        }
    }

    /// The storage collaborator.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Create the user's subscription, or update the one they already have.
    ///
    /// When the user already owns an active subscription, only its name and
    /// provider are overwritten; id, status and expiration date are kept.
    /// `CANCELED` and `EXPIRED` records are never touched: a user who owns
    /// only terminal subscriptions gets a new `ACTIVE` record.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `request` is `None` → `SubscriptionError::NullRequest`
    /// - Any validation rule fails → `SubscriptionError::Validation` (nothing is persisted)
    /// - Storage fails → `SubscriptionError::Storage`
    pub async fn reconcile(
        &self,
        request: Option<&CreateSubscriptionRequest>,
    ) -> Result<Subscription> {
        let request = request.ok_or(SubscriptionError::NullRequest)?;
        debug!(user_id = ?request.user_id, "Reconciling subscription");

        let validation = self.validator.validate_at(request, self.clock.now());
        if validation.has_errors() {
            warn!(
                user_id = ?request.user_id,
                codes = ?validation.codes(),
                "Subscription request rejected"
            );
            metrics::counter!("subscriptions.reconcile", "outcome" => "rejected").increment(1);
            return Err(SubscriptionError::Validation(validation.into_errors()));
        }

        let user_id = request.user_id.map(UserId).ok_or_else(|| {
            SubscriptionError::Validation(vec![ValidationError::new(
                codes::USER_ID_REQUIRED,
                "user id is required",
            )])
        })?;

        let existing = self
            .storage
            .find_by_owning_user(user_id)
            .await
            .map_err(|e| storage_failure("find_by_owning_user", e))?;
        let mapped = self.mapper.map(Some(request))?;

        match existing.into_iter().find(Subscription::is_active) {
            None => {
                let created = self
                    .storage
                    .create_or_update(mapped)
                    .await
                    .map_err(|e| storage_failure("create_or_update", e))?;

                info!(
                    subscription_id = ?created.id,
                    user_id = %user_id,
                    "Subscription created"
                );
                metrics::counter!("subscriptions.reconcile", "outcome" => "created").increment(1);
                Ok(created)
            },
            Some(mut current) => {
                current.name = mapped.name;
                current.provider = mapped.provider;

                let updated = self
                    .storage
                    .update(&current)
                    .await
                    .map_err(|e| storage_failure("update", e))?;

                info!(
                    subscription_id = ?updated.id,
                    user_id = %user_id,
                    "Subscription updated"
                );
                metrics::counter!("subscriptions.reconcile", "outcome" => "updated").increment(1);
                Ok(updated)
            },
        }
    }

    /// Cancel an active subscription.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `id` is not positive → `SubscriptionError::InvalidId` (storage is not touched)
    /// - No subscription has that id → `SubscriptionError::SubscriptionNotFound`
    /// - The subscription is not `ACTIVE` → `SubscriptionError::IllegalTransition`
    /// - Storage fails → `SubscriptionError::Storage`
    pub async fn cancel(&self, id: i64) -> Result<()> {
        let id = SubscriptionId::parse(
            id,
            Some(format!("Subscription id must be positive, got {id}")),
        )?;
        debug!(subscription_id = %id, "Canceling subscription");

        let mut subscription = self.load(id).await?;
        if subscription.status.is_terminal() {
            warn!(
                subscription_id = %id,
                status = %subscription.status,
                "Refusing to cancel inactive subscription"
            );
            return Err(SubscriptionError::IllegalTransition(format!(
                "Only active subscription {id} can be canceled"
            )));
        }

        subscription.status = Status::Canceled;
        self.persist_transition(&subscription).await
    }

    /// Expire a subscription that has not expired yet.
    ///
    /// Both `ACTIVE` and `CANCELED` subscriptions may expire. The expiration
    /// date is stamped with the engine clock's current time.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `id` is not positive → `SubscriptionError::InvalidId` without detail
    /// - No subscription has that id → `SubscriptionError::SubscriptionNotFound`
    /// - The subscription already expired → `SubscriptionError::IllegalTransition`
    /// - Storage fails → `SubscriptionError::Storage`
    pub async fn expire(&self, id: i64) -> Result<()> {
        let id = SubscriptionId::parse(id, None)?;
        debug!(subscription_id = %id, "Expiring subscription");

        let mut subscription = self.load(id).await?;
        if subscription.status == Status::Expired {
            warn!(subscription_id = %id, "Subscription already expired");
            return Err(SubscriptionError::IllegalTransition(format!(
                "Subscription {id} has already expired"
            )));
        }

        subscription.status = Status::Expired;
        subscription.expiration_date = Some(self.clock.now());
        self.persist_transition(&subscription).await
    }

    async fn load(&self, id: SubscriptionId) -> Result<Subscription> {
        self.storage
            .find_by_id(id)
            .await
            .map_err(|e| storage_failure("find_by_id", e))?
            .ok_or_else(|| {
                debug!(subscription_id = %id, "Subscription not found");
                SubscriptionError::SubscriptionNotFound(id)
            })
    }

    async fn persist_transition(&self, subscription: &Subscription) -> Result<()> {
        self.storage
            .update(subscription)
            .await
            .map_err(|e| storage_failure("update", e))?;

        info!(
            subscription_id = ?subscription.id,
            status = %subscription.status,
            "Subscription status changed"
        );
        metrics::counter!("subscriptions.transition", "to" => subscription.status.as_str())
            .increment(1);
        Ok(())
    }
}

fn storage_failure(operation: &'static str, err: StorageError) -> SubscriptionError {
    error!(operation, error = %err, "Subscription storage failed");
    SubscriptionError::Storage(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Clock;
    use crate::provider::Provider;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Mutex;

    struct Fixed(DateTime<Utc>);

    impl Clock for Fixed {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default()
    }

    /// Minimal store recording writes; richer doubles live in `subscription-testing`.
    #[derive(Default)]
    struct VecStore {
        rows: Mutex<Vec<Subscription>>,
        writes: Mutex<Vec<&'static str>>,
    }

    impl VecStore {
        fn with(rows: Vec<Subscription>) -> Self {
            Self {
                rows: Mutex::new(rows),
                writes: Mutex::default(),
            }
        }

        fn writes(&self) -> Vec<&'static str> {
            self.writes.lock().map(|w| w.clone()).unwrap_or_default()
        }

        fn record(&self, op: &'static str) -> std::result::Result<(), StorageError> {
            self.writes
                .lock()
                .map_err(|_| StorageError::Internal("poisoned".to_string()))?
                .push(op);
            Ok(())
        }
    }

    impl SubscriptionStore for VecStore {
        async fn find_by_owning_user(
            &self,
            user_id: UserId,
        ) -> std::result::Result<Vec<Subscription>, StorageError> {
            let rows = self.rows.lock().map_err(|_| StorageError::Internal("poisoned".to_string()))?;
            Ok(rows.iter().filter(|s| s.user_id == Some(user_id)).cloned().collect())
        }

        async fn find_by_id(
            &self,
            id: SubscriptionId,
        ) -> std::result::Result<Option<Subscription>, StorageError> {
            let rows = self.rows.lock().map_err(|_| StorageError::Internal("poisoned".to_string()))?;
            Ok(rows.iter().find(|s| s.id == Some(id)).cloned())
        }

        async fn create_or_update(
            &self,
            mut subscription: Subscription,
        ) -> std::result::Result<Subscription, StorageError> {
            self.record("create_or_update")?;
            let mut rows = self.rows.lock().map_err(|_| StorageError::Internal("poisoned".to_string()))?;
            let next = i64::try_from(rows.len()).unwrap_or_default() + 1;
            subscription.id.get_or_insert(SubscriptionId(next));
            rows.push(subscription.clone());
            Ok(subscription)
        }

        async fn update(
            &self,
            subscription: &Subscription,
        ) -> std::result::Result<Subscription, StorageError> {
            self.record("update")?;
            let mut rows = self.rows.lock().map_err(|_| StorageError::Internal("poisoned".to_string()))?;
            let row = rows
                .iter_mut()
                .find(|s| s.id == subscription.id)
                .ok_or(StorageError::MissingId)?;
            *row = subscription.clone();
            Ok(subscription.clone())
        }
    }

    fn engine(store: VecStore) -> LifecycleEngine<VecStore> {
        LifecycleEngine::new(store, Arc::new(Fixed(now())))
    }

    fn stored(id: i64, status: Status) -> Subscription {
        Subscription::new(status)
            .with_id(SubscriptionId(id))
            .with_user_id(UserId(1))
            .with_name("Google Drive")
            .with_provider(Provider::Google)
            .with_expiration_date(now() + Duration::days(30))
    }

    fn request() -> CreateSubscriptionRequest {
        CreateSubscriptionRequest::new()
            .with_user_id(1)
            .with_name("YouTube Premium")
            .with_provider("apple")
            .with_expiration_date(now() + Duration::days(60))
    }

    #[tokio::test]
    async fn reconcile_creates_when_user_has_nothing() {
        let engine = engine(VecStore::default());

        let created = engine.reconcile(Some(&request())).await;

        assert_eq!(
            created,
            Ok(Subscription::new(Status::Active)
                .with_id(SubscriptionId(1))
                .with_user_id(UserId(1))
                .with_name("YouTube Premium")
                .with_provider(Provider::Apple)
                .with_expiration_date(now() + Duration::days(60)))
        );
        assert_eq!(engine.storage().writes(), vec!["create_or_update"]);
    }

    #[tokio::test]
    async fn reconcile_updates_name_and_provider_only() {
        let engine = engine(VecStore::with(vec![stored(4, Status::Active)]));

        let updated = engine.reconcile(Some(&request())).await;

        assert_eq!(
            updated,
            Ok(Subscription {
                name: Some("YouTube Premium".to_string()),
                provider: Some(Provider::Apple),
                ..stored(4, Status::Active)
            })
        );
        assert_eq!(engine.storage().writes(), vec!["update"]);
    }

    #[tokio::test]
    async fn cancel_then_expire() {
        let engine = engine(VecStore::with(vec![stored(2, Status::Active)]));

        assert_eq!(engine.cancel(2).await, Ok(()));
        assert_eq!(
            engine.cancel(2).await,
            Err(SubscriptionError::IllegalTransition(
                "Only active subscription 2 can be canceled".to_string()
            ))
        );
        assert_eq!(engine.expire(2).await, Ok(()));

        let row = engine.storage().find_by_id(SubscriptionId(2)).await;
        let row = row.ok().flatten();
        assert_eq!(row.as_ref().map(|s| s.status), Some(Status::Expired));
        assert_eq!(row.and_then(|s| s.expiration_date), Some(now()));
    }

    #[tokio::test]
    async fn invalid_ids_never_reach_storage() {
        let engine = engine(VecStore::default());

        let cancel = engine.cancel(0).await;
        let expire = engine.expire(-3).await;

        assert!(matches!(cancel, Err(SubscriptionError::InvalidId { id: 0, message: Some(_) })));
        assert_eq!(expire, Err(SubscriptionError::InvalidId { id: -3, message: None }));
        assert!(engine.storage().writes().is_empty());
    }
}
