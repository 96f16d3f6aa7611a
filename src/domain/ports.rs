use super::account::{Account, AccountId, Amount};
use super::catalog::ServiceCatalogEntry;
use super::ledger::{EntryId, LedgerEntry, NewEntry};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Durable, append-only record of balance-affecting events.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Appends a new entry, assigning its monotonic id and commit timestamps.
    /// Atomic and durable before returning. Fails with `Conflict` when the
    /// idempotency key was already committed, so callers can detect replay.
    async fn append(&self, entry: NewEntry) -> Result<LedgerEntry>;

    /// All entries for an account, oldest first.
    async fn entries_for(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>>;

    async fn get(&self, entry_id: EntryId) -> Result<Option<LedgerEntry>>;

    /// Flags a committed entry as reversed. Status-only: the financial
    /// content of the entry is immutable.
    async fn mark_reversed(&self, entry_id: EntryId) -> Result<()>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn store(&self, account: Account) -> Result<()>;
    async fn get(&self, account_id: AccountId) -> Result<Option<Account>>;
    async fn get_all(&self) -> Result<Vec<Account>>;
}

/// Customer details returned by the aggregator's verification endpoint.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CustomerInfo {
    pub name: String,
    pub address: String,
}

/// Confirmation of a successful provider call.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Receipt {
    pub provider_ref: String,
}

/// The bill-payment aggregator boundary.
///
/// Adapters normalize the aggregator's wire protocol into these calls; the
/// gateway adds retries, timeouts and caching on top.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Resolves a biller reference (smartcard, meter number) to the customer
    /// it belongs to, or fails with `VerificationFailed`.
    async fn verify(&self, service_code: &str, biller_ref: &str) -> Result<CustomerInfo>;

    /// The full service catalog this aggregator fans out to.
    async fn services(&self) -> Result<Vec<ServiceCatalogEntry>>;

    /// Executes a bill payment. `request_id` doubles as the provider-side
    /// idempotency key, so resending after a timeout is safe.
    async fn pay(
        &self,
        service_code: &str,
        variation_code: Option<&str>,
        amount: Amount,
        biller_ref: &str,
        request_id: &str,
    ) -> Result<Receipt>;
}

/// A payment-collection provider boundary (moves money from the payer's
/// card or bank into the wallet).
#[async_trait]
pub trait CollectionProvider: Send + Sync {
    /// Collects `amount` from the payer. `request_id` is the provider-side
    /// idempotency key.
    async fn collect(
        &self,
        amount: Amount,
        payer_email: &str,
        request_id: &str,
    ) -> Result<Receipt>;
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type AccountStoreRef = Arc<dyn AccountStore>;
pub type BillingProviderRef = Arc<dyn BillingProvider>;
pub type CollectionProviderRef = Arc<dyn CollectionProvider>;
