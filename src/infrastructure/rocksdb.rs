use crate::domain::account::{Account, AccountId};
use crate::domain::ledger::{EntryId, EntryStatus, LedgerEntry, NewEntry};
use crate::domain::ports::{AccountStore, LedgerStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Column family for ledger entries, keyed by big-endian entry id.
pub const CF_LEDGER: &str = "ledger";
/// Column family mapping idempotency keys to the entry id they committed.
pub const CF_IDEMPOTENCY: &str = "idempotency";
/// Column family for account records.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column family for store bookkeeping (the entry id counter).
pub const CF_META: &str = "meta";

const NEXT_ENTRY_ID_KEY: &[u8] = b"next_entry_id";

/// A persistent store implementation using RocksDB.
///
/// Ledger entries, the idempotency index and accounts live in separate
/// column families; each append writes entry, index and counter in a single
/// batch so the ledger is atomic and durable before `append` returns.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    /// Serializes id assignment and the duplicate-key check across tasks.
    append_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_LEDGER, CF_IDEMPOTENCY, CF_ACCOUNTS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            append_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::internal(format!("column family {name} not found")))
    }

    fn next_entry_id(&self, meta: &ColumnFamily) -> Result<EntryId> {
        match self.db.get_cf(meta, NEXT_ENTRY_ID_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| PaymentError::internal("corrupt entry id counter"))?;
                Ok(EntryId::from_be_bytes(raw))
            }
            None => Ok(1),
        }
    }

    fn decode_entry(bytes: &[u8]) -> Result<LedgerEntry> {
        serde_json::from_slice(bytes)
            .map_err(|e| PaymentError::internal(format!("failed to deserialize ledger entry: {e}")))
    }
}

#[async_trait]
impl LedgerStore for RocksDbStore {
    async fn append(&self, new: NewEntry) -> Result<LedgerEntry> {
        let ledger = self.cf(CF_LEDGER)?;
        let idempotency = self.cf(CF_IDEMPOTENCY)?;
        let meta = self.cf(CF_META)?;

        let _guard = self
            .append_lock
            .lock()
            .map_err(|_| PaymentError::internal("append lock poisoned"))?;

        if self
            .db
            .get_pinned_cf(idempotency, new.idempotency_key.as_bytes())?
            .is_some()
        {
            return Err(PaymentError::Conflict(new.idempotency_key));
        }

        let id = self.next_entry_id(meta)?;
        let now = Utc::now();
        let entry = LedgerEntry {
            id,
            account_id: new.account_id,
            amount: new.amount,
            kind: new.kind,
            external_ref: new.external_ref,
            status: EntryStatus::Committed,
            idempotency_key: new.idempotency_key,
            created_at: now,
            settled_at: Some(now),
        };

        let value = serde_json::to_vec(&entry)
            .map_err(|e| PaymentError::internal(format!("serialization error: {e}")))?;

        // One batch: entry, idempotency index and counter land together.
        let mut batch = WriteBatch::default();
        batch.put_cf(ledger, id.to_be_bytes(), value);
        batch.put_cf(idempotency, entry.idempotency_key.as_bytes(), id.to_be_bytes());
        batch.put_cf(meta, NEXT_ENTRY_ID_KEY, (id + 1).to_be_bytes());
        self.db.write(batch)?;

        Ok(entry)
    }

    async fn entries_for(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>> {
        let ledger = self.cf(CF_LEDGER)?;
        let mut entries = Vec::new();
        // Keys are big-endian ids, so iteration order is oldest first.
        for item in self.db.iterator_cf(ledger, IteratorMode::Start) {
            let (_key, value) = item?;
            let entry = Self::decode_entry(&value)?;
            if entry.account_id == account_id {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn get(&self, entry_id: EntryId) -> Result<Option<LedgerEntry>> {
        let ledger = self.cf(CF_LEDGER)?;
        match self.db.get_cf(ledger, entry_id.to_be_bytes())? {
            Some(bytes) => Ok(Some(Self::decode_entry(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn mark_reversed(&self, entry_id: EntryId) -> Result<()> {
        let ledger = self.cf(CF_LEDGER)?;
        let mut entry = match self.db.get_cf(ledger, entry_id.to_be_bytes())? {
            Some(bytes) => Self::decode_entry(&bytes)?,
            None => {
                return Err(PaymentError::Validation(format!(
                    "unknown ledger entry {entry_id}"
                )));
            }
        };
        // Status-only rewrite; the financial content stays as committed.
        entry.status = EntryStatus::Reversed;
        let value = serde_json::to_vec(&entry)
            .map_err(|e| PaymentError::internal(format!("serialization error: {e}")))?;
        self.db.put_cf(ledger, entry_id.to_be_bytes(), value)?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for RocksDbStore {
    async fn store(&self, account: Account) -> Result<()> {
        let accounts = self.cf(CF_ACCOUNTS)?;
        let value = serde_json::to_vec(&account)
            .map_err(|e| PaymentError::internal(format!("serialization error: {e}")))?;
        self.db.put_cf(accounts, account.id.to_be_bytes(), value)?;
        Ok(())
    }

    async fn get(&self, account_id: AccountId) -> Result<Option<Account>> {
        let accounts = self.cf(CF_ACCOUNTS)?;
        match self.db.get_cf(accounts, account_id.to_be_bytes())? {
            Some(bytes) => {
                let account = serde_json::from_slice(&bytes).map_err(|e| {
                    PaymentError::internal(format!("failed to deserialize account: {e}"))
                })?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<Account>> {
        let accounts = self.cf(CF_ACCOUNTS)?;
        let mut all = Vec::new();
        for item in self.db.iterator_cf(accounts, IteratorMode::Start) {
            let (_key, value) = item?;
            let account = serde_json::from_slice(&value).map_err(|e| {
                PaymentError::internal(format!("failed to deserialize account: {e}"))
            })?;
            all.push(account);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Amount;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_creates_column_families() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).expect("failed to open RocksDB");

        assert!(store.db.cf_handle(CF_LEDGER).is_some());
        assert!(store.db.cf_handle(CF_IDEMPOTENCY).is_some());
        assert!(store.db.cf_handle(CF_ACCOUNTS).is_some());
        assert!(store.db.cf_handle(CF_META).is_some());
    }

    #[tokio::test]
    async fn test_append_and_conflict() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        let amount = Amount::new(5_000).unwrap();

        let entry = store
            .append(NewEntry::funding(1, amount, Some("col-1".to_string()), "k1"))
            .await
            .unwrap();
        assert_eq!(entry.id, 1);

        let err = store
            .append(NewEntry::funding(1, amount, None, "k1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Conflict(_)));

        let entries = store.entries_for(1).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_entry_ids_survive_reopen() {
        let dir = tempdir().unwrap();
        let amount = Amount::new(5_000).unwrap();

        {
            let store = RocksDbStore::open(dir.path()).unwrap();
            store
                .append(NewEntry::funding(1, amount, None, "k1"))
                .await
                .unwrap();
        }

        let store = RocksDbStore::open(dir.path()).unwrap();
        let entry = store
            .append(NewEntry::funding(1, amount, None, "k2"))
            .await
            .unwrap();
        // The counter picked up where the previous process left off.
        assert_eq!(entry.id, 2);

        let entries = store.entries_for(1).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].id < entries[1].id);
    }

    #[tokio::test]
    async fn test_mark_reversed_persists() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        let entry = store
            .append(NewEntry::funding(1, Amount::new(5_000).unwrap(), None, "k1"))
            .await
            .unwrap();
        store.mark_reversed(entry.id).await.unwrap();

        let reloaded = LedgerStore::get(&store, entry.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, EntryStatus::Reversed);
        assert_eq!(reloaded.amount, entry.amount);
    }

    #[tokio::test]
    async fn test_account_round_trip() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        let account = Account::new(1, "Ada Obi", "ada@example.com", "08012345678");
        AccountStore::store(&store, account.clone()).await.unwrap();

        let retrieved = AccountStore::get(&store, 1).await.unwrap().unwrap();
        assert_eq!(retrieved, account);
        assert_eq!(AccountStore::get_all(&store).await.unwrap().len(), 1);
    }
}
