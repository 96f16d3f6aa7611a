use clap::Parser;
use miette::{IntoDiagnostic, Result};
use paylode::application::orchestrator::PaymentOrchestrator;
use paylode::config::EngineConfig;
use paylode::domain::account::{Account, AccountId};
use paylode::domain::ports::{AccountStore, AccountStoreRef, LedgerStoreRef};
use paylode::domain::request::CollectionMethod;
use paylode::error::PaymentError;
use paylode::gateway::ProviderGateway;
use paylode::infrastructure::in_memory::{InMemoryAccountStore, InMemoryLedgerStore};
use paylode::infrastructure::sandbox::{SandboxAggregator, SandboxCollector};
use paylode::interfaces::csv::operation_reader::{Operation, OperationKind, OperationReader};
use paylode::interfaces::csv::report_writer::{
    BalanceRow, HistoryWriter, ReportWriter, to_major,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Also print the settled ledger history after the balance summary
    #[arg(long)]
    history: bool,
}

#[derive(Default)]
struct Outcome {
    succeeded: u32,
    failed: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env();

    let (ledger, accounts) = open_stores(cli.db_path)?;

    let gateway = Arc::new(ProviderGateway::new(
        Arc::new(SandboxAggregator::new()),
        Arc::new(SandboxCollector::primary()),
        Arc::new(SandboxCollector::secondary()),
        &config,
    ));
    // Catalog refresh runs on its own schedule, independent of the batch;
    // the task dies with the process.
    let _catalog_refresh = gateway.clone().spawn_catalog_refresh(config.catalog_ttl);
    let orchestrator = PaymentOrchestrator::new(ledger, accounts.clone(), gateway, &config);

    // Process operations
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = OperationReader::new(file);
    let mut outcomes: BTreeMap<AccountId, Outcome> = BTreeMap::new();
    for op_result in reader.operations() {
        match op_result {
            Ok(operation) => {
                let account = operation.account;
                let outcome = outcomes.entry(account).or_default();
                match run_operation(&orchestrator, &accounts, &operation).await {
                    Ok(()) => outcome.succeeded += 1,
                    Err(e) => {
                        eprintln!("Error processing operation: {}", e);
                        outcome.failed += 1;
                    }
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {}", e);
            }
        }
    }

    // Output final state for every known account, including ones recovered
    // from a persistent ledger but untouched by this batch.
    let mut known = accounts.get_all().await.into_diagnostic()?;
    known.sort_by_key(|a| a.id);

    let mut rows = Vec::with_capacity(known.len());
    for account in &known {
        let balance = orchestrator
            .wallet()
            .balance(account.id)
            .await
            .into_diagnostic()?;
        let outcome = outcomes.get(&account.id);
        rows.push(BalanceRow {
            account: account.id,
            balance: to_major(balance),
            succeeded: outcome.map_or(0, |o| o.succeeded),
            failed: outcome.map_or(0, |o| o.failed),
        });
    }

    {
        let stdout = io::stdout();
        let mut writer = ReportWriter::new(stdout.lock());
        writer.write_balances(&rows).into_diagnostic()?;
    }

    if cli.history {
        let stdout = io::stdout();
        let mut writer = HistoryWriter::new(stdout.lock());
        for account in &known {
            let entries = orchestrator.history(account.id).await.into_diagnostic()?;
            writer.write_entries(&entries).into_diagnostic()?;
        }
    }

    Ok(())
}

async fn run_operation(
    orchestrator: &PaymentOrchestrator,
    accounts: &AccountStoreRef,
    operation: &Operation,
) -> std::result::Result<(), PaymentError> {
    // Batch runs provision accounts on first use.
    if accounts.get(operation.account).await?.is_none() {
        let email = operation.email.clone().unwrap_or_default();
        accounts
            .store(Account::new(
                operation.account,
                format!("account-{}", operation.account),
                email,
                String::new(),
            ))
            .await?;
    }

    let amount = operation.amount_minor()?;
    match operation.op {
        OperationKind::Fund => {
            let method = operation.method.unwrap_or(CollectionMethod::Card);
            let email = operation.email.as_deref().unwrap_or_default();
            orchestrator
                .fund(operation.account, amount, method, email)
                .await?;
        }
        OperationKind::Spend => {
            let service = operation.service.as_deref().ok_or_else(|| {
                PaymentError::Validation("spend operations require a service".to_string())
            })?;
            let recipient = operation.recipient.as_deref().unwrap_or_default();
            orchestrator
                .spend(
                    operation.account,
                    service,
                    operation.variation.as_deref(),
                    amount,
                    recipient,
                )
                .await?;
        }
    }
    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<(LedgerStoreRef, AccountStoreRef)> {
    use paylode::infrastructure::rocksdb::RocksDbStore;

    if let Some(db_path) = db_path {
        let store = RocksDbStore::open(db_path).into_diagnostic()?;
        Ok((Arc::new(store.clone()), Arc::new(store)))
    } else {
        Ok(in_memory_stores())
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<(LedgerStoreRef, AccountStoreRef)> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

fn in_memory_stores() -> (LedgerStoreRef, AccountStoreRef) {
    (
        Arc::new(InMemoryLedgerStore::new()),
        Arc::new(InMemoryAccountStore::new()),
    )
}
