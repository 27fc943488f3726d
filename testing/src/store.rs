//! In-memory subscription storage for tests
//!
//! Provides fast, deterministic storage doubles for the lifecycle engine:
//! - [`InMemorySubscriptionStore`]: `Vec`-backed storage that records every call
//! - [`StoreCall`]: one recorded call, for "was this persisted?" assertions

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use std::future::Future;
use std::sync::{Arc, RwLock};
use subscription_core::{StorageError, Subscription, SubscriptionId, SubscriptionStore, UserId};

/// A call made against [`InMemorySubscriptionStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `find_by_owning_user(user_id)`
    FindByOwningUser(UserId),
    /// `find_by_id(id)`
    FindById(SubscriptionId),
    /// `create_or_update(..)` with the id the record carried on entry
    CreateOrUpdate(Option<SubscriptionId>),
    /// `update(..)` with the id the record carried
    Update(Option<SubscriptionId>),
}

impl StoreCall {
    /// Returns `true` for calls that write.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::CreateOrUpdate(_) | Self::Update(_))
    }
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<Subscription>,
    next_id: i64,
    calls: Vec<StoreCall>,
    write_failure: Option<StorageError>,
}

impl Inner {
    fn assign_id(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    fn overwrite(&mut self, subscription: &Subscription) -> Result<Subscription, StorageError> {
        if let Some(err) = &self.write_failure {
            return Err(err.clone());
        }
        let id = subscription.id.ok_or(StorageError::MissingId)?;
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.id == Some(id))
            .ok_or(StorageError::NotFound(id))?;
        *row = subscription.clone();
        Ok(subscription.clone())
    }
}

/// In-memory subscription store for fast, deterministic testing.
///
/// Records are kept in insertion order, so `find_by_owning_user` returns
/// the oldest record first. Clones share the same underlying data.
///
/// # Example
///
/// ```
/// use subscription_testing::{InMemorySubscriptionStore, StoreCall};
/// use subscription_core::{Status, Subscription, SubscriptionStore, UserId};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemorySubscriptionStore::new();
///
/// let saved = store
///     .create_or_update(Subscription::new(Status::Active).with_user_id(UserId(1)))
///     .await?;
/// assert!(saved.id.is_some());
///
/// assert_eq!(store.calls(), vec![StoreCall::CreateOrUpdate(None)]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemorySubscriptionStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemorySubscriptionStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `rows`.
    ///
    /// Rows without an id are assigned one; seeding is not recorded as a call.
    #[must_use]
    pub fn with_rows(rows: impl IntoIterator<Item = Subscription>) -> Self {
        let store = Self::new();
        for row in rows {
            store.insert(row);
        }
        store
    }

    /// Make every subsequent write fail with `err`.
    ///
    /// Reads keep working, so the engine gets as far as persisting.
    pub fn fail_writes_with(&self, err: StorageError) {
        self.inner.write().unwrap().write_failure = Some(err);
    }

    /// Insert a record, assigning a fresh id if it has none.
    pub fn insert(&self, mut subscription: Subscription) -> Subscription {
        let mut inner = self.inner.write().unwrap();
        if subscription.id.is_none() {
            subscription.id = Some(inner.assign_id());
        } else if let Some(SubscriptionId(id)) = subscription.id {
            inner.next_id = inner.next_id.max(id);
        }
        inner.rows.push(subscription.clone());
        subscription
    }

    /// All stored records, oldest first.
    #[must_use]
    pub fn find_all(&self) -> Vec<Subscription> {
        self.inner.read().unwrap().rows.clone()
    }

    /// Remove a record. Returns `true` if it existed.
    pub fn delete(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.write().unwrap();
        let before = inner.rows.len();
        inner.rows.retain(|row| row.id != Some(id));
        inner.rows.len() != before
    }

    /// Fetch a record without recording a call.
    #[must_use]
    pub fn get(&self, id: SubscriptionId) -> Option<Subscription> {
        self.inner
            .read()
            .unwrap()
            .rows
            .iter()
            .find(|row| row.id == Some(id))
            .cloned()
    }

    /// Every call made through [`SubscriptionStore`], in order.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.read().unwrap().calls.clone()
    }

    /// Only the write calls.
    #[must_use]
    pub fn writes(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_write).collect()
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().rows.len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().rows.is_empty()
    }

    fn record(&self, call: StoreCall) {
        self.inner.write().unwrap().calls.push(call);
    }
}

impl SubscriptionStore for InMemorySubscriptionStore {
    fn find_by_owning_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<Subscription>, StorageError>> + Send {
        self.record(StoreCall::FindByOwningUser(user_id));
        let inner = Arc::clone(&self.inner);

        async move {
            Ok(inner
                .read()
                .unwrap()
                .rows
                .iter()
                .filter(|row| row.user_id == Some(user_id))
                .cloned()
                .collect())
        }
    }

    fn find_by_id(
        &self,
        id: SubscriptionId,
    ) -> impl Future<Output = Result<Option<Subscription>, StorageError>> + Send {
        self.record(StoreCall::FindById(id));
        let found = self.get(id);

        async move { Ok(found) }
    }

    fn create_or_update(
        &self,
        subscription: Subscription,
    ) -> impl Future<Output = Result<Subscription, StorageError>> + Send {
        self.record(StoreCall::CreateOrUpdate(subscription.id));
        let inner = Arc::clone(&self.inner);

        async move {
            let mut inner = inner.write().unwrap();
            if subscription.id.is_some() {
                return inner.overwrite(&subscription);
            }
            if let Some(err) = &inner.write_failure {
                return Err(err.clone());
            }
            let mut subscription = subscription;
            subscription.id = Some(inner.assign_id());
            inner.rows.push(subscription.clone());
            Ok(subscription)
        }
    }

    fn update(
        &self,
        subscription: &Subscription,
    ) -> impl Future<Output = Result<Subscription, StorageError>> + Send {
        self.record(StoreCall::Update(subscription.id));
        let inner = Arc::clone(&self.inner);
        let subscription = subscription.clone();

        async move { inner.write().unwrap().overwrite(&subscription) }
    }
}
