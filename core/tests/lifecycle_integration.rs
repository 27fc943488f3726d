//! Integration tests for the lifecycle engine against the in-memory store.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use chrono::Duration;
use std::collections::HashSet;
use std::sync::Arc;
use subscription_core::{
    CreateSubscriptionRequest, LifecycleEngine, Provider, Status, StorageError, Subscription,
    SubscriptionError, SubscriptionId, UserId,
};
use subscription_testing::fixtures::{self, SUBSCRIPTION_NAME, USER_ID};
use subscription_testing::{InMemorySubscriptionStore, StoreCall, init_test_tracing, test_clock, test_now};

const SUBSCRIPTION_ID: i64 = 1;

/// Create an engine over `store` with the fixed test clock.
fn create_engine(store: &InMemorySubscriptionStore) -> LifecycleEngine<InMemorySubscriptionStore> {
    init_test_tracing();
    LifecycleEngine::new(store.clone(), Arc::new(test_clock()))
}

// ═══════════════════════════════════════════════════════════════════════
// reconcile
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_reconcile_new_user_creates_active_subscription() {
    let store = InMemorySubscriptionStore::new();
    let engine = create_engine(&store);
    let request = fixtures::valid_request();

    let created = engine.reconcile(Some(&request)).await.unwrap();

    assert_eq!(created.id, Some(SubscriptionId(1)));
    assert_eq!(created.status, Status::Active);
    assert_eq!(created.user_id, Some(UserId(USER_ID)));
    assert_eq!(created.name.as_deref(), Some(SUBSCRIPTION_NAME));
    assert_eq!(created.provider, Some(Provider::Google));
    assert_eq!(created.expiration_date, request.expiration_date);

    assert_eq!(store.len(), 1);
    assert_eq!(
        store.calls(),
        vec![
            StoreCall::FindByOwningUser(UserId(USER_ID)),
            StoreCall::CreateOrUpdate(None),
        ]
    );
}

#[tokio::test]
async fn test_reconcile_existing_subscription_updates_in_place() {
    let existing = fixtures::stored_subscription(SUBSCRIPTION_ID, Status::Active);
    let store = InMemorySubscriptionStore::with_rows([existing.clone()]);
    let engine = create_engine(&store);
    let request = CreateSubscriptionRequest::new()
        .with_user_id(USER_ID)
        .with_name("iCloud+")
        .with_provider("apple")
        .with_expiration_date(test_now() + Duration::days(365));

    let updated = engine.reconcile(Some(&request)).await.unwrap();

    assert_eq!(updated.id, existing.id);
    assert_eq!(updated.status, Status::Active);
    assert_eq!(updated.name.as_deref(), Some("iCloud+"));
    assert_eq!(updated.provider, Some(Provider::Apple));
    // The incoming expiration date is not applied on the update path.
    assert_eq!(updated.expiration_date, existing.expiration_date);

    assert_eq!(store.len(), 1);
    assert_eq!(store.writes(), vec![StoreCall::Update(existing.id)]);
    assert_eq!(store.get(SubscriptionId(SUBSCRIPTION_ID)), Some(updated));
}

#[tokio::test]
async fn test_reconcile_picks_first_active_subscription() {
    let store = InMemorySubscriptionStore::with_rows([
        fixtures::stored_subscription(1, Status::Active),
        fixtures::stored_subscription(2, Status::Active),
    ]);
    let engine = create_engine(&store);

    let updated = engine.reconcile(Some(&fixtures::valid_request())).await.unwrap();

    assert_eq!(updated.id, Some(SubscriptionId(1)));
    assert_eq!(store.writes(), vec![StoreCall::Update(Some(SubscriptionId(1)))]);
}

#[tokio::test]
async fn test_reconcile_leaves_terminal_subscriptions_alone() {
    let canceled = fixtures::stored_subscription(1, Status::Canceled);
    let store = InMemorySubscriptionStore::with_rows([canceled.clone()]);
    let engine = create_engine(&store);

    let created = engine.reconcile(Some(&fixtures::valid_request())).await.unwrap();

    assert_eq!(created.id, Some(SubscriptionId(2)));
    assert_eq!(created.status, Status::Active);
    assert_eq!(store.get(SubscriptionId(1)), Some(canceled));
    assert_eq!(store.writes(), vec![StoreCall::CreateOrUpdate(None)]);
}

#[tokio::test]
async fn test_reconcile_validation_failure_persists_nothing() {
    let store = InMemorySubscriptionStore::new();
    let engine = create_engine(&store);
    let request = CreateSubscriptionRequest {
        provider: Some("NETFLIX".to_string()),
        ..fixtures::valid_request()
    };

    let err = engine.reconcile(Some(&request)).await.unwrap_err();

    assert!(err.is_validation());
    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, 102);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_reconcile_reports_every_violation() {
    let store = InMemorySubscriptionStore::new();
    let engine = create_engine(&store);
    let request = CreateSubscriptionRequest::new().with_expiration_date(test_now() - Duration::hours(1));

    let err = engine.reconcile(Some(&request)).await.unwrap_err();

    let codes: HashSet<u16> = err
        .validation_errors()
        .unwrap()
        .iter()
        .map(|e| e.code)
        .collect();
    assert_eq!(codes, HashSet::from([100, 101, 102, 103]));
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_reconcile_expiration_is_judged_against_engine_clock() {
    let store = InMemorySubscriptionStore::new();
    let engine = create_engine(&store);
    let request = fixtures::valid_request().with_expiration_date(test_now());

    let err = engine.reconcile(Some(&request)).await.unwrap_err();

    assert_eq!(err.validation_errors().map(|e| e[0].code), Some(103));
}

#[tokio::test]
async fn test_reconcile_null_request() {
    let store = InMemorySubscriptionStore::new();
    let engine = create_engine(&store);

    let result = engine.reconcile(None).await;

    assert_eq!(result, Err(SubscriptionError::NullRequest));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_reconcile_propagates_storage_failure() {
    let store = InMemorySubscriptionStore::new();
    store.fail_writes_with(StorageError::DatabaseError("Database error".to_string()));
    let engine = create_engine(&store);

    let result = engine.reconcile(Some(&fixtures::valid_request())).await;

    assert_eq!(
        result,
        Err(SubscriptionError::Storage(StorageError::DatabaseError(
            "Database error".to_string()
        )))
    );
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_reconcile_update_propagates_storage_failure() {
    let active = fixtures::stored_subscription(SUBSCRIPTION_ID, Status::Active);
    let store = InMemorySubscriptionStore::with_rows([active.clone()]);
    store.fail_writes_with(StorageError::DatabaseError("connection reset".to_string()));
    let engine = create_engine(&store);
    let request = fixtures::valid_request()
        .with_name("Google One")
        .with_provider("APPLE");

    let result = engine.reconcile(Some(&request)).await;

    assert_eq!(
        result,
        Err(SubscriptionError::Storage(StorageError::DatabaseError(
            "connection reset".to_string()
        )))
    );
    assert_eq!(store.get(SubscriptionId(SUBSCRIPTION_ID)), Some(active));
    assert_eq!(store.writes(), vec![StoreCall::Update(Some(SubscriptionId(SUBSCRIPTION_ID)))]);
}

#[tokio::test]
async fn test_reconcile_user_with_only_expired_subscription_gets_new_one() {
    let expired = fixtures::stored_subscription(1, Status::Expired);
    let store = InMemorySubscriptionStore::with_rows([expired.clone()]);
    let engine = create_engine(&store);

    let created = engine.reconcile(Some(&fixtures::valid_request())).await.unwrap();

    assert_eq!(created.id, Some(SubscriptionId(2)));
    assert_eq!(created.status, Status::Active);
    assert_eq!(store.get(SubscriptionId(1)), Some(expired));
    assert_eq!(store.len(), 2);
}

// ═══════════════════════════════════════════════════════════════════════
// cancel
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_cancel_active_subscription() {
    let store = InMemorySubscriptionStore::with_rows([fixtures::stored_subscription(
        SUBSCRIPTION_ID,
        Status::Active,
    )]);
    let engine = create_engine(&store);

    engine.cancel(SUBSCRIPTION_ID).await.unwrap();

    let stored = store.get(SubscriptionId(SUBSCRIPTION_ID)).unwrap();
    assert_eq!(stored.status, Status::Canceled);
    assert_eq!(
        store.writes(),
        vec![StoreCall::Update(Some(SubscriptionId(SUBSCRIPTION_ID)))]
    );
}

#[tokio::test]
async fn test_cancel_non_active_subscription_is_illegal() {
    for status in [Status::Expired, Status::Canceled] {
        let store = InMemorySubscriptionStore::with_rows([fixtures::stored_subscription(
            SUBSCRIPTION_ID,
            status,
        )]);
        let engine = create_engine(&store);

        let err = engine.cancel(SUBSCRIPTION_ID).await.unwrap_err();

        assert_eq!(
            err,
            SubscriptionError::IllegalTransition(format!(
                "Only active subscription {SUBSCRIPTION_ID} can be canceled"
            ))
        );
        assert_eq!(store.get(SubscriptionId(SUBSCRIPTION_ID)).map(|s| s.status), Some(status));
        assert_eq!(
            store.calls(),
            vec![StoreCall::FindById(SubscriptionId(SUBSCRIPTION_ID))]
        );
    }
}

#[tokio::test]
async fn test_cancel_unknown_subscription() {
    let store = InMemorySubscriptionStore::new();
    let engine = create_engine(&store);

    let err = engine.cancel(SUBSCRIPTION_ID).await.unwrap_err();

    assert_eq!(
        err,
        SubscriptionError::SubscriptionNotFound(SubscriptionId(SUBSCRIPTION_ID))
    );
    assert!(err.is_not_found());
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_cancel_invalid_id() {
    let store = InMemorySubscriptionStore::new();
    let engine = create_engine(&store);

    let err = engine.cancel(-1).await.unwrap_err();

    assert!(matches!(err, SubscriptionError::InvalidId { id: -1, .. }));
    assert!(err.detail().is_some());
    assert!(store.calls().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
// expire
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_expire_active_or_canceled_subscription() {
    for status in [Status::Active, Status::Canceled] {
        let store = InMemorySubscriptionStore::with_rows([fixtures::stored_subscription(
            SUBSCRIPTION_ID,
            status,
        )]);
        let engine = create_engine(&store);

        engine.expire(SUBSCRIPTION_ID).await.unwrap();

        let stored = store.get(SubscriptionId(SUBSCRIPTION_ID)).unwrap();
        assert_eq!(stored.status, Status::Expired);
        assert_eq!(stored.expiration_date, Some(test_now()));
        assert_eq!(
            store.writes(),
            vec![StoreCall::Update(Some(SubscriptionId(SUBSCRIPTION_ID)))]
        );
    }
}

#[tokio::test]
async fn test_expire_already_expired_subscription_is_illegal() {
    let expired = fixtures::stored_subscription(SUBSCRIPTION_ID, Status::Expired);
    let store = InMemorySubscriptionStore::with_rows([expired.clone()]);
    let engine = create_engine(&store);

    let err = engine.expire(SUBSCRIPTION_ID).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        format!("Subscription {SUBSCRIPTION_ID} has already expired")
    );
    assert!(matches!(err, SubscriptionError::IllegalTransition(_)));
    assert_eq!(store.get(SubscriptionId(SUBSCRIPTION_ID)), Some(expired));
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_expire_unknown_subscription() {
    let store = InMemorySubscriptionStore::new();
    let engine = create_engine(&store);

    let err = engine.expire(SUBSCRIPTION_ID).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(
        store.calls(),
        vec![StoreCall::FindById(SubscriptionId(SUBSCRIPTION_ID))]
    );
}

#[tokio::test]
async fn test_expire_invalid_id_has_no_detail() {
    let store = InMemorySubscriptionStore::new();
    let engine = create_engine(&store);

    let err = engine.expire(0).await.unwrap_err();

    assert_eq!(err, SubscriptionError::InvalidId { id: 0, message: None });
    assert_eq!(err.detail(), None);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_expire_propagates_storage_failure() {
    let store = InMemorySubscriptionStore::with_rows([fixtures::stored_subscription(
        SUBSCRIPTION_ID,
        Status::Active,
    )]);
    store.fail_writes_with(StorageError::DatabaseError("disk full".to_string()));
    let engine = create_engine(&store);

    let err = engine.expire(SUBSCRIPTION_ID).await.unwrap_err();

    assert!(matches!(err, SubscriptionError::Storage(StorageError::DatabaseError(_))));
    assert_eq!(
        store.get(SubscriptionId(SUBSCRIPTION_ID)).map(|s| s.status),
        Some(Status::Active)
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Full lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_full_lifecycle() {
    let store = InMemorySubscriptionStore::new();
    let engine = create_engine(&store);

    let created: Subscription = engine.reconcile(Some(&fixtures::valid_request())).await.unwrap();
    let id = created.id.map(|id| id.as_i64()).unwrap();

    engine.cancel(id).await.unwrap();
    engine.expire(id).await.unwrap();
    assert!(matches!(
        engine.expire(id).await,
        Err(SubscriptionError::IllegalTransition(_))
    ));
    assert!(matches!(
        engine.cancel(id).await,
        Err(SubscriptionError::IllegalTransition(_))
    ));

    // A new request after the old subscription ended starts a fresh one.
    let renewed = engine.reconcile(Some(&fixtures::valid_request())).await.unwrap();
    assert_ne!(renewed.id, created.id);
    assert_eq!(store.len(), 2);
}
