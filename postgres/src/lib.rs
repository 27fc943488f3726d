//! `PostgreSQL` subscription storage for the subscription lifecycle engine.
//!
//! This crate provides a PostgreSQL-backed implementation of the
//! `SubscriptionStore` trait from `subscription-core`. It uses sqlx and
//! supports:
//!
//! - Connection pooling configured from the environment
//! - Embedded schema migrations
//! - Record management beyond what the engine needs (insert, list, delete)
//!
//! # Example
//!
//! ```ignore
//! use subscription_postgres::{PostgresConfig, PostgresSubscriptionStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresSubscriptionStore::connect(&PostgresConfig::from_env()).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod store;

pub use config::PostgresConfig;
pub use store::PostgresSubscriptionStore;
