//! # Subscription Core
//!
//! Lifecycle engine for user subscriptions to third-party providers.
//!
//! This crate decides *what* happens to a subscription; storage is an
//! injected collaborator behind the [`SubscriptionStore`] trait.
//!
//! ## Core Concepts
//!
//! - **Request**: unvalidated input ([`CreateSubscriptionRequest`])
//! - **Validator**: reports every violated rule at once ([`RequestValidator`])
//! - **Mapper**: request → fresh `ACTIVE` subscription ([`SubscriptionMapper`])
//! - **Engine**: reconcile / cancel / expire ([`LifecycleEngine`])
//! - **Environment**: injected clock ([`environment::Clock`])
//!
//! ## Architecture Principles
//!
//! - Stateless services, shared by reference
//! - All persistence through one narrow trait
//! - Storage failures surface unchanged
//!
//! ## Example
//!
//! ```ignore
//! use subscription_core::*;
//! use std::sync::Arc;
//!
//! let engine = LifecycleEngine::new(store, Arc::new(environment::SystemClock));
//!
//! let request = CreateSubscriptionRequest::new()
//!     .with_user_id(1)
//!     .with_name("Google Drive")
//!     .with_provider("google")
//!     .with_expiration_date(Utc::now() + chrono::Duration::days(30));
//!
//! let subscription = engine.reconcile(Some(&request)).await?;
//! assert_eq!(subscription.status, Status::Active);
//! ```

pub mod error;
pub mod lifecycle;
pub mod mapper;
pub mod provider;
pub mod storage;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{Result, SubscriptionError};
pub use lifecycle::LifecycleEngine;
pub use mapper::SubscriptionMapper;
pub use provider::{Provider, ProviderRegistry};
pub use storage::{StorageError, SubscriptionStore};
pub use types::{CreateSubscriptionRequest, Status, Subscription, SubscriptionId, UserId};
pub use validation::{RequestValidator, ValidationError, ValidationResult};

/// Environment module - Dependency injection traits
///
/// External dependencies other than storage are abstracted behind traits
/// and handed to the engine at construction.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
