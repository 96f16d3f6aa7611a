use crate::domain::account::{Account, AccountId};
use crate::domain::ledger::{EntryId, EntryStatus, LedgerEntry, NewEntry};
use crate::domain::ports::{AccountStore, LedgerStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerInner {
    entries: Vec<LedgerEntry>,
    by_key: HashMap<String, EntryId>,
    next_id: EntryId,
}

/// A thread-safe in-memory ledger store.
///
/// The write lock covers the duplicate-key check, id assignment and insert
/// in one critical section, so concurrent appends are serialized and
/// idempotency keys cannot race past each other. Ideal for tests and CLI
/// runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    inner: Arc<RwLock<LedgerInner>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory ledger store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn append(&self, new: NewEntry) -> Result<LedgerEntry> {
        let mut inner = self.inner.write().await;
        if inner.by_key.contains_key(&new.idempotency_key) {
            return Err(PaymentError::Conflict(new.idempotency_key));
        }
        inner.next_id += 1;
        let now = Utc::now();
        let entry = LedgerEntry {
            id: inner.next_id,
            account_id: new.account_id,
            amount: new.amount,
            kind: new.kind,
            external_ref: new.external_ref,
            status: EntryStatus::Committed,
            idempotency_key: new.idempotency_key,
            created_at: now,
            settled_at: Some(now),
        };
        inner.by_key.insert(entry.idempotency_key.clone(), entry.id);
        inner.entries.push(entry.clone());
        Ok(entry)
    }

    async fn entries_for(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>> {
        let inner = self.inner.read().await;
        // Entries are pushed in id order, so this is already oldest first.
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn get(&self, entry_id: EntryId) -> Result<Option<LedgerEntry>> {
        let inner = self.inner.read().await;
        Ok(inner.entries.iter().find(|e| e.id == entry_id).cloned())
    }

    async fn mark_reversed(&self, entry_id: EntryId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| {
                PaymentError::Validation(format!("unknown ledger entry {entry_id}"))
            })?;
        entry.status = EntryStatus::Reversed;
        Ok(())
    }
}

/// A thread-safe in-memory store for accounts.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
}

impl InMemoryAccountStore {
    /// Creates a new, empty in-memory account store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn store(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id, account);
        Ok(())
    }

    async fn get(&self, account_id: AccountId) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&account_id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().cloned().collect())
    }
}
