use crate::domain::account::AccountId;
use crate::domain::request::RequestId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Hold {
    request_id: RequestId,
    amount: i64,
    placed_at: Instant,
}

/// Process-local holds against wallet balances while spends are in flight.
///
/// A hold keeps `can_debit` honest between the balance check and the ledger
/// commit. Holds carry a TTL so a hold abandoned by a crashed task cannot
/// wedge the account forever; expired holds are purged lazily.
pub struct ReservationTable {
    holds: Mutex<HashMap<AccountId, Vec<Hold>>>,
    locks: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
    ttl: Duration,
}

impl ReservationTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            holds: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// The per-account critical section. Callers lock the returned mutex
    /// around check-and-hold so concurrent spends against one account
    /// serialize, while different accounts proceed independently.
    pub async fn account_lock(&self, account_id: AccountId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(account_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Sum of unexpired holds for the account.
    pub async fn reserved(&self, account_id: AccountId) -> i64 {
        let mut holds = self.holds.lock().await;
        Self::purge(&mut holds, account_id, self.ttl);
        holds
            .get(&account_id)
            .map(|hs| hs.iter().map(|h| h.amount).sum())
            .unwrap_or(0)
    }

    pub async fn hold(&self, account_id: AccountId, request_id: RequestId, amount: i64) {
        let mut holds = self.holds.lock().await;
        Self::purge(&mut holds, account_id, self.ttl);
        holds.entry(account_id).or_default().push(Hold {
            request_id,
            amount,
            placed_at: Instant::now(),
        });
    }

    pub async fn release(&self, account_id: AccountId, request_id: RequestId) {
        let mut holds = self.holds.lock().await;
        if let Some(hs) = holds.get_mut(&account_id) {
            hs.retain(|h| h.request_id != request_id);
            if hs.is_empty() {
                holds.remove(&account_id);
            }
        }
    }

    fn purge(holds: &mut HashMap<AccountId, Vec<Hold>>, account_id: AccountId, ttl: Duration) {
        if let Some(hs) = holds.get_mut(&account_id) {
            hs.retain(|h| h.placed_at.elapsed() < ttl);
            if hs.is_empty() {
                holds.remove(&account_id);
            }
        }
    }
}
