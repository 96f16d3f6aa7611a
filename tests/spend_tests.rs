mod common;

use common::{amount, engine};
use paylode::domain::request::{CollectionMethod, RequestStatus};
use paylode::error::PaymentError;

#[tokio::test]
async fn test_non_retryable_decline_leaves_balance_unchanged() {
    let test = engine().await;
    let orchestrator = &test.orchestrator;
    orchestrator
        .fund(1, amount(5_000), CollectionMethod::Card, "ada@example.com")
        .await
        .unwrap();

    // Recipients ending in 0000 are declined outright by the sandbox.
    let err = orchestrator
        .spend(1, "airtime-duomo", None, amount(1_000), "08010000000")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PaymentError::Provider {
            retryable: false,
            ..
        }
    ));

    // Exactly one attempt: declines are not retried.
    let requests = orchestrator.requests_for(1).await;
    let failed = requests
        .iter()
        .find(|r| matches!(r.status, RequestStatus::Failed { .. }))
        .unwrap();
    assert_eq!(test.aggregator.attempts_for(&failed.idempotency_key).await, 1);

    // No debit was posted for the failed spend.
    assert_eq!(orchestrator.wallet().balance(1).await.unwrap(), 5_000);
    assert_eq!(orchestrator.history(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_verification_failure_stops_before_payment() {
    let test = engine().await;
    let orchestrator = &test.orchestrator;
    orchestrator
        .fund(1, amount(5_000), CollectionMethod::Card, "ada@example.com")
        .await
        .unwrap();

    let err = orchestrator
        .spend(1, "power-gridco", None, amount(2_000), "4512340000")
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::VerificationFailed(_)));

    // The aggregator was never asked to pay.
    let requests = orchestrator.requests_for(1).await;
    let failed = requests
        .iter()
        .find(|r| matches!(r.status, RequestStatus::Failed { .. }))
        .unwrap();
    assert_eq!(test.aggregator.attempts_for(&failed.idempotency_key).await, 0);
    assert_eq!(orchestrator.wallet().balance(1).await.unwrap(), 5_000);
}

#[tokio::test]
async fn test_fixed_price_variation_spend() {
    let test = engine().await;
    let orchestrator = &test.orchestrator;
    orchestrator
        .fund(1, amount(500_000), CollectionMethod::Card, "ada@example.com")
        .await
        .unwrap();

    let request = orchestrator
        .spend(
            1,
            "data-duomo",
            Some("duomo-1gb"),
            amount(100_000),
            "08012345678",
        )
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Succeeded);
    assert_eq!(request.variation_code.as_deref(), Some("duomo-1gb"));
    assert_eq!(orchestrator.wallet().balance(1).await.unwrap(), 400_000);
}

#[tokio::test]
async fn test_every_request_reaches_one_terminal_state_and_entries_match() {
    let test = engine().await;
    let orchestrator = &test.orchestrator;

    // A mixed batch: successful funding, declined funding, successful spend,
    // declined spend, insufficient-funds spend.
    let _ = orchestrator
        .fund(1, amount(5_000), CollectionMethod::Card, "ada@example.com")
        .await;
    let _ = orchestrator
        .fund(
            1,
            amount(9_000),
            CollectionMethod::Card,
            "blocked0000@example.com",
        )
        .await;
    let _ = orchestrator
        .spend(1, "airtime-duomo", None, amount(2_000), "08012345678")
        .await;
    let _ = orchestrator
        .spend(1, "airtime-duomo", None, amount(1_000), "08010000000")
        .await;
    let _ = orchestrator
        .spend(1, "airtime-duomo", None, amount(50_000), "08012345678")
        .await;

    let requests = orchestrator.requests_for(1).await;
    assert_eq!(requests.len(), 5);

    let history = orchestrator.history(1).await.unwrap();
    for request in &requests {
        assert!(request.status.is_terminal());
        let committed = history
            .iter()
            .filter(|e| e.idempotency_key == request.idempotency_key)
            .count();
        // A ledger entry exists iff the request succeeded.
        if request.status == RequestStatus::Succeeded {
            assert_eq!(committed, 1);
        } else {
            assert_eq!(committed, 0);
        }
    }

    assert_eq!(orchestrator.wallet().balance(1).await.unwrap(), 3_000);
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let test = engine().await;
    let orchestrator = &test.orchestrator;
    orchestrator
        .fund(1, amount(5_000), CollectionMethod::Card, "ada@example.com")
        .await
        .unwrap();
    orchestrator
        .spend(1, "airtime-duomo", None, amount(2_000), "08012345678")
        .await
        .unwrap();

    let history = orchestrator.history(1).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].id > history[1].id);
    assert_eq!(history[0].amount, -2_000);
    assert_eq!(history[1].amount, 5_000);
}
