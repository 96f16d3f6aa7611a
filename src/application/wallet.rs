use super::reservations::ReservationTable;
use crate::domain::account::{AccountId, Amount};
use crate::domain::ledger::LedgerEntry;
use crate::domain::ports::LedgerStoreRef;
use crate::error::Result;
use std::sync::Arc;

/// Read-only view over the ledger plus the orchestrator's in-flight holds.
///
/// The balance is always computed by folding settled entries; nothing here
/// mutates state.
pub struct WalletAccessor {
    ledger: LedgerStoreRef,
    reservations: Arc<ReservationTable>,
}

impl WalletAccessor {
    pub fn new(ledger: LedgerStoreRef, reservations: Arc<ReservationTable>) -> Self {
        Self {
            ledger,
            reservations,
        }
    }

    /// The settled balance in minor units.
    pub async fn balance(&self, account_id: AccountId) -> Result<i64> {
        let entries = self.ledger.entries_for(account_id).await?;
        Ok(entries
            .iter()
            .filter(|e| e.status.is_settled())
            .map(|e| e.amount)
            .sum())
    }

    /// Balance minus the amounts reserved by in-flight spends.
    pub async fn available(&self, account_id: AccountId) -> Result<i64> {
        let balance = self.balance(account_id).await?;
        let reserved = self.reservations.reserved(account_id).await;
        Ok(balance - reserved)
    }

    /// Whether a debit of `amount` would keep the balance non-negative,
    /// accounting for reservations already held against it.
    pub async fn can_debit(&self, account_id: AccountId, amount: Amount) -> Result<bool> {
        Ok(self.available(account_id).await? >= amount.value())
    }

    /// Settled entries, newest first, for display.
    pub async fn history(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>> {
        let mut entries = self.ledger.entries_for(account_id).await?;
        entries.retain(|e| e.status.is_settled());
        entries.reverse();
        Ok(entries)
    }
}
