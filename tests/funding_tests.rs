mod common;

use common::{amount, engine};
use paylode::domain::ledger::EntryKind;
use paylode::domain::request::{CollectionMethod, RequestStatus};
use paylode::error::PaymentError;

#[tokio::test]
async fn test_fund_then_spend_then_insufficient() {
    let test = engine().await;
    let orchestrator = &test.orchestrator;

    // Balance starts at zero.
    assert_eq!(orchestrator.wallet().balance(1).await.unwrap(), 0);

    // A confirmed 5000-unit collection credits the wallet.
    let funding = orchestrator
        .fund(1, amount(5_000), CollectionMethod::Card, "ada@example.com")
        .await
        .unwrap();
    assert_eq!(funding.status, RequestStatus::Succeeded);
    assert_eq!(orchestrator.wallet().balance(1).await.unwrap(), 5_000);

    // A 3000-unit spend on a verified biller brings it to 2000.
    let spend = orchestrator
        .spend(1, "tv-starview", None, amount(3_000), "1212121212")
        .await
        .unwrap();
    assert_eq!(spend.status, RequestStatus::Succeeded);
    assert_eq!(orchestrator.wallet().balance(1).await.unwrap(), 2_000);

    // A further 3000-unit spend fails fast and leaves the balance alone.
    let err = orchestrator
        .spend(1, "tv-starview", None, amount(3_000), "1212121212")
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::InsufficientFunds { .. }));
    assert_eq!(orchestrator.wallet().balance(1).await.unwrap(), 2_000);
}

#[tokio::test]
async fn test_failed_collection_leaves_no_ledger_entry() {
    let test = engine().await;
    let orchestrator = &test.orchestrator;

    // The sandbox declines payer emails with a local part ending in 0000.
    let err = orchestrator
        .fund(
            1,
            amount(5_000),
            CollectionMethod::Card,
            "blocked0000@example.com",
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PaymentError::Collection {
            retryable: false,
            ..
        }
    ));

    assert_eq!(orchestrator.wallet().balance(1).await.unwrap(), 0);
    assert!(orchestrator.history(1).await.unwrap().is_empty());

    let requests = orchestrator.requests_for(1).await;
    assert_eq!(requests.len(), 1);
    assert!(matches!(requests[0].status, RequestStatus::Failed { .. }));
}

#[tokio::test]
async fn test_funding_routes_by_collection_method() {
    let test = engine().await;
    let orchestrator = &test.orchestrator;

    orchestrator
        .fund(1, amount(1_000), CollectionMethod::Card, "ada@example.com")
        .await
        .unwrap();
    orchestrator
        .fund(
            1,
            amount(2_000),
            CollectionMethod::Transfer,
            "ada@example.com",
        )
        .await
        .unwrap();

    let history = orchestrator.history(1).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|e| e.kind == EntryKind::Funding));

    let refs: Vec<_> = history
        .iter()
        .filter_map(|e| e.external_ref.as_deref())
        .collect();
    assert!(refs.iter().any(|r| r.starts_with("cardline-")));
    assert!(refs.iter().any(|r| r.starts_with("bankbridge-")));
}

#[tokio::test]
async fn test_funding_requires_payer_email() {
    let test = engine().await;
    let err = test
        .orchestrator
        .fund(1, amount(1_000), CollectionMethod::Card, "not-an-email")
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));

    // Rejected before any request state was created.
    assert!(test.orchestrator.requests_for(1).await.is_empty());
}
