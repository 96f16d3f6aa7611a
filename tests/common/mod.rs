use paylode::application::orchestrator::PaymentOrchestrator;
use paylode::config::{EngineConfig, RetryPolicy};
use paylode::domain::account::{Account, Amount};
use paylode::domain::ports::AccountStore;
use paylode::gateway::ProviderGateway;
use paylode::infrastructure::in_memory::{InMemoryAccountStore, InMemoryLedgerStore};
use paylode::infrastructure::sandbox::{SandboxAggregator, SandboxCollector};
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct TestEngine {
    pub orchestrator: PaymentOrchestrator,
    pub aggregator: Arc<SandboxAggregator>,
    pub accounts: Arc<InMemoryAccountStore>,
}

/// The default config with millisecond backoff so retry paths do not slow
/// the suite down.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            factor: 2,
        },
        ..EngineConfig::default()
    }
}

pub fn amount(minor: i64) -> Amount {
    Amount::new(minor).unwrap()
}

/// An engine over in-memory stores and the sandbox providers, with account 1
/// provisioned.
pub async fn engine() -> TestEngine {
    let aggregator = Arc::new(SandboxAggregator::new());
    let config = fast_config();
    let gateway = Arc::new(ProviderGateway::new(
        aggregator.clone(),
        Arc::new(SandboxCollector::primary()),
        Arc::new(SandboxCollector::secondary()),
        &config,
    ));
    let accounts = Arc::new(InMemoryAccountStore::new());
    accounts
        .store(Account::new(1, "Ada Obi", "ada@example.com", "08012345678"))
        .await
        .unwrap();
    let orchestrator = PaymentOrchestrator::new(
        Arc::new(InMemoryLedgerStore::new()),
        accounts.clone(),
        gateway,
        &config,
    );
    TestEngine {
        orchestrator,
        aggregator,
        accounts,
    }
}

/// An engine over in-memory stores with a caller-supplied billing provider,
/// sandbox collectors and account 1 provisioned. Used by suites that need
/// scripted aggregator behavior (timeouts, gates).
pub async fn engine_with_billing(
    billing: paylode::domain::ports::BillingProviderRef,
    config: EngineConfig,
) -> PaymentOrchestrator {
    let gateway = Arc::new(ProviderGateway::new(
        billing,
        Arc::new(SandboxCollector::primary()),
        Arc::new(SandboxCollector::secondary()),
        &config,
    ));
    let accounts = Arc::new(InMemoryAccountStore::new());
    accounts
        .store(Account::new(1, "Ada Obi", "ada@example.com", "08012345678"))
        .await
        .unwrap();
    PaymentOrchestrator::new(
        Arc::new(InMemoryLedgerStore::new()),
        accounts,
        gateway,
        &config,
    )
}

/// Writes an operations CSV of `rows` one-unit fundings for account 1.
pub fn generate_funding_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record([
        "op", "account", "amount", "service", "variation", "recipient", "method", "email",
    ])?;

    for _ in 0..rows {
        wtr.write_record([
            "fund",
            "1",
            "1.00",
            "",
            "",
            "",
            "card",
            "ada@example.com",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
