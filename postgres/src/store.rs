//! `PostgreSQL` subscription store.
//!
//! Persists subscriptions to a single `subscription` table. Besides the
//! [`SubscriptionStore`] operations the engine needs, the store exposes
//! record management (`insert`, `find_all`, `delete`) for administrative
//! callers.

use crate::config::PostgresConfig;
use sqlx::{PgPool, Row};
use subscription_core::{
    ProviderRegistry, Status, StorageError, Subscription, SubscriptionId, SubscriptionStore,
    UserId,
};

/// `PostgreSQL`-backed subscription storage.
///
/// # Example
///
/// ```no_run
/// use subscription_postgres::PostgresSubscriptionStore;
/// use subscription_core::{SubscriptionStore, UserId};
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgresSubscriptionStore::new(pool);
/// store.migrate().await?;
///
/// let owned = store.find_by_owning_user(UserId(1)).await?;
/// println!("User 1 has {} subscriptions", owned.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    /// Create a new store with the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using `config` and create a store over the resulting pool.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DatabaseError`] if the pool cannot connect.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StorageError> {
        Ok(Self::new(config.connect().await?))
    }

    /// Access the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `subscription` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DatabaseError`] if the migration fails.
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Insert a new subscription and return it with its assigned id.
    ///
    /// Any id already on `subscription` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DatabaseError`] if the insert fails, including
    /// when a required column (user, name, provider, expiration) is absent.
    pub async fn insert(&self, subscription: &Subscription) -> Result<Subscription, StorageError> {
        let (id,): (i64,) = sqlx::query_as(
            r"
            INSERT INTO subscription (user_id, name, provider, expiration_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(subscription.user_id.map(|u| u.0))
        .bind(subscription.name.as_deref())
        .bind(subscription.provider.map(|p| p.as_str()))
        .bind(subscription.expiration_date)
        .bind(subscription.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| database_error("insert", &e))?;

        tracing::debug!(subscription_id = id, "Subscription inserted");
        record_query("insert");

        Ok(Subscription {
            id: Some(SubscriptionId(id)),
            ..subscription.clone()
        })
    }

    /// List every subscription, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DatabaseError`] if the query fails.
    pub async fn find_all(&self) -> Result<Vec<Subscription>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, name, provider, expiration_date, status
            FROM subscription
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("find_all", &e))?;

        record_query("find_all");
        rows.iter().map(Self::row_to_subscription).collect()
    }

    /// Delete a subscription.
    ///
    /// # Returns
    ///
    /// `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DatabaseError`] if the delete fails.
    pub async fn delete(&self, id: SubscriptionId) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM subscription WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("delete", &e))?;

        record_query("delete");
        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(subscription_id = id.0, "Subscription deleted");
        }
        Ok(deleted)
    }

    fn row_to_subscription(row: &sqlx::postgres::PgRow) -> Result<Subscription, StorageError> {
        let provider: String = row.try_get("provider").map_err(|e| corrupt_row(&e))?;
        let provider = ProviderRegistry::global()
            .try_resolve(Some(&provider))
            .ok_or_else(|| StorageError::Internal(format!("Invalid provider: {provider}")))?;

        let status: String = row.try_get("status").map_err(|e| corrupt_row(&e))?;
        let status = Status::parse(&status).map_err(StorageError::Internal)?;

        Ok(Subscription {
            id: Some(SubscriptionId(row.try_get("id").map_err(|e| corrupt_row(&e))?)),
            user_id: Some(UserId(row.try_get("user_id").map_err(|e| corrupt_row(&e))?)),
            name: Some(row.try_get("name").map_err(|e| corrupt_row(&e))?),
            provider: Some(provider),
            expiration_date: Some(row.try_get("expiration_date").map_err(|e| corrupt_row(&e))?),
            status,
        })
    }
}

impl SubscriptionStore for PostgresSubscriptionStore {
    async fn find_by_owning_user(&self, user_id: UserId) -> Result<Vec<Subscription>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, name, provider, expiration_date, status
            FROM subscription
            WHERE user_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error("find_by_owning_user", &e))?;

        record_query("find_by_owning_user");
        rows.iter().map(Self::row_to_subscription).collect()
    }

    async fn find_by_id(&self, id: SubscriptionId) -> Result<Option<Subscription>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, name, provider, expiration_date, status
            FROM subscription
            WHERE id = $1
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("find_by_id", &e))?;

        record_query("find_by_id");
        row.as_ref().map(Self::row_to_subscription).transpose()
    }

    async fn create_or_update(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, StorageError> {
        if subscription.id.is_some() {
            self.update(&subscription).await
        } else {
            self.insert(&subscription).await
        }
    }

    async fn update(&self, subscription: &Subscription) -> Result<Subscription, StorageError> {
        let id = subscription.id.ok_or(StorageError::MissingId)?;

        let result = sqlx::query(
            r"
            UPDATE subscription
            SET user_id = $2,
                name = $3,
                provider = $4,
                expiration_date = $5,
                status = $6
            WHERE id = $1
            ",
        )
        .bind(id.0)
        .bind(subscription.user_id.map(|u| u.0))
        .bind(subscription.name.as_deref())
        .bind(subscription.provider.map(|p| p.as_str()))
        .bind(subscription.expiration_date)
        .bind(subscription.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("update", &e))?;

        record_query("update");
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id));
        }

        tracing::debug!(
            subscription_id = id.0,
            status = subscription.status.as_str(),
            "Subscription updated"
        );
        Ok(subscription.clone())
    }
}

fn database_error(operation: &'static str, err: &sqlx::Error) -> StorageError {
    tracing::error!(operation, error = %err, "Subscription query failed");
    metrics::counter!("subscriptions.store.errors", "operation" => operation).increment(1);
    StorageError::DatabaseError(err.to_string())
}

fn corrupt_row(err: &sqlx::Error) -> StorageError {
    StorageError::Internal(format!("Malformed subscription row: {err}"))
}

fn record_query(operation: &'static str) {
    metrics::counter!("subscriptions.store.queries", "operation" => operation).increment(1);
}
