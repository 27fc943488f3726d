//! # Subscription Testing
//!
//! Testing utilities and helpers for the subscription lifecycle engine.
//!
//! This crate provides:
//! - A deterministic [`FixedClock`]
//! - An in-memory, call-recording [`InMemorySubscriptionStore`]
//! - Request and record fixtures
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```ignore
//! use subscription_testing::{fixtures, test_clock, InMemorySubscriptionStore};
//! use subscription_core::LifecycleEngine;
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_reconcile() {
//!     let store = InMemorySubscriptionStore::new();
//!     let engine = LifecycleEngine::new(store.clone(), Arc::new(test_clock()));
//!
//!     engine.reconcile(Some(&fixtures::valid_request())).await.unwrap();
//!
//!     assert_eq!(store.len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use subscription_core::environment::Clock;

pub mod store;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use subscription_testing::mocks::FixedClock;
    /// use subscription_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// The instant returned by [`test_clock`]: 2025-01-01 00:00:00 UTC.
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_now())
    }
}

/// Request and record fixtures
///
/// All timestamps are relative to [`mocks::test_now`].
pub mod fixtures {
    use super::mocks::test_now;
    use chrono::Duration;
    use subscription_core::{
        CreateSubscriptionRequest, Provider, Status, Subscription, SubscriptionId, UserId,
    };

    /// User id used by the fixtures.
    pub const USER_ID: i64 = 1;

    /// Subscription name used by the fixtures.
    pub const SUBSCRIPTION_NAME: &str = "Google Drive";

    /// A request that passes every validation rule.
    #[must_use]
    pub fn valid_request() -> CreateSubscriptionRequest {
        CreateSubscriptionRequest::new()
            .with_user_id(USER_ID)
            .with_name(SUBSCRIPTION_NAME)
            .with_provider("GOOGLE")
            .with_expiration_date(test_now() + Duration::days(30))
    }

    /// A persisted subscription owned by [`USER_ID`].
    #[must_use]
    pub fn stored_subscription(id: i64, status: Status) -> Subscription {
        Subscription::new(status)
            .with_id(SubscriptionId(id))
            .with_user_id(UserId(USER_ID))
            .with_name(SUBSCRIPTION_NAME)
            .with_provider(Provider::Google)
            .with_expiration_date(test_now() + Duration::days(7))
    }

    /// An unpersisted subscription ready for insertion.
    #[must_use]
    pub fn new_subscription(user_id: i64, name: &str) -> Subscription {
        Subscription::new(Status::Active)
            .with_user_id(UserId(user_id))
            .with_name(name)
            .with_provider(Provider::Apple)
            .with_expiration_date(test_now() + Duration::hours(1))
    }
}

/// Install a `tracing` subscriber for tests.
///
/// Honours `RUST_LOG`, defaulting to `subscription_core=debug`. Safe to
/// call from every test; only the first call installs the subscriber.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "subscription_core=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock, test_now};
pub use store::{InMemorySubscriptionStore, StoreCall};
