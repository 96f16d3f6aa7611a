use super::account::{AccountId, Amount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type EntryId = u64;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Funding,
    Spend,
    Reversal,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Committed,
    Failed,
    /// Still settled money-wise; the flag only records that a reversal entry
    /// exists for it.
    Reversed,
}

impl EntryStatus {
    /// Whether the entry counts towards the derived balance.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Committed | Self::Reversed)
    }
}

/// A balance-affecting event. Immutable once committed: corrections are new
/// `Reversal` entries, never in-place edits.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LedgerEntry {
    /// Unique, monotonically increasing id assigned by the store.
    pub id: EntryId,
    pub account_id: AccountId,
    /// Signed minor currency units: credits positive, debits negative.
    pub amount: i64,
    pub kind: EntryKind,
    /// Provider-side transaction reference, when one exists.
    pub external_ref: Option<String>,
    pub status: EntryStatus,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

/// What callers hand to the ledger store. The id and timestamps are assigned
/// at append time.
#[derive(Debug, PartialEq, Clone)]
pub struct NewEntry {
    pub account_id: AccountId,
    pub amount: i64,
    pub kind: EntryKind,
    pub external_ref: Option<String>,
    pub idempotency_key: String,
}

impl NewEntry {
    /// A credit posted after a collection provider confirmed the funding.
    pub fn funding(
        account_id: AccountId,
        amount: Amount,
        external_ref: Option<String>,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            amount: amount.value(),
            kind: EntryKind::Funding,
            external_ref,
            idempotency_key: idempotency_key.into(),
        }
    }

    /// A debit posted after the aggregator confirmed the bill payment.
    pub fn spend(
        account_id: AccountId,
        amount: Amount,
        external_ref: Option<String>,
        idempotency_key: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            amount: -amount.value(),
            kind: EntryKind::Spend,
            external_ref,
            idempotency_key: idempotency_key.into(),
        }
    }

    /// The correcting entry for a committed original: same magnitude,
    /// opposite sign, keyed so a second reversal replays as a conflict.
    pub fn reversal(original: &LedgerEntry) -> Self {
        Self {
            account_id: original.account_id,
            amount: -original.amount,
            kind: EntryKind::Reversal,
            external_ref: Some(original.id.to_string()),
            idempotency_key: format!("rev-{}", original.idempotency_key),
        }
    }
}
