use super::reservations::ReservationTable;
use super::wallet::WalletAccessor;
use crate::config::EngineConfig;
use crate::domain::account::{Account, AccountId, Amount};
use crate::domain::catalog::ServiceCatalogEntry;
use crate::domain::ledger::{EntryId, EntryKind, EntryStatus, LedgerEntry, NewEntry};
use crate::domain::ports::{AccountStoreRef, LedgerStoreRef};
use crate::domain::request::{CollectionMethod, PaymentRequest, RequestId, RequestStatus};
use crate::error::{PaymentError, Result};
use crate::gateway::ProviderGateway;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The single owner of every `PaymentRequest` lifecycle.
///
/// Each funding or spend operation runs as one atomic business transaction
/// spanning the gateway and the ledger: the provider confirms first, the
/// ledger commits second, and a failed request never leaves partial ledger
/// state behind.
pub struct PaymentOrchestrator {
    ledger: LedgerStoreRef,
    accounts: AccountStoreRef,
    gateway: Arc<ProviderGateway>,
    reservations: Arc<ReservationTable>,
    wallet: WalletAccessor,
    requests: RwLock<HashMap<RequestId, PaymentRequest>>,
}

impl PaymentOrchestrator {
    pub fn new(
        ledger: LedgerStoreRef,
        accounts: AccountStoreRef,
        gateway: Arc<ProviderGateway>,
        config: &EngineConfig,
    ) -> Self {
        let reservations = Arc::new(ReservationTable::new(config.reservation_ttl));
        let wallet = WalletAccessor::new(ledger.clone(), reservations.clone());
        Self {
            ledger,
            accounts,
            gateway,
            reservations,
            wallet,
            requests: RwLock::new(HashMap::new()),
        }
    }

    pub fn wallet(&self) -> &WalletAccessor {
        &self.wallet
    }

    pub async fn request(&self, id: RequestId) -> Option<PaymentRequest> {
        self.requests.read().await.get(&id).cloned()
    }

    /// Every tracked request for the account, newest first. In-flight
    /// requests appear alongside settled ones.
    pub async fn requests_for(&self, account_id: AccountId) -> Vec<PaymentRequest> {
        let requests = self.requests.read().await;
        let mut found: Vec<_> = requests
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    /// Settled entries for the account, newest first.
    pub async fn history(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>> {
        self.wallet.history(account_id).await
    }

    /// Funds the wallet through a collection provider.
    ///
    /// The credit reaches the ledger only after the provider confirms; a
    /// failed or cancelled collection leaves no ledger entry.
    pub async fn fund(
        &self,
        account_id: AccountId,
        amount: Amount,
        method: CollectionMethod,
        payer_email: &str,
    ) -> Result<PaymentRequest> {
        self.active_account(account_id).await?;
        if payer_email.trim().is_empty() || !payer_email.contains('@') {
            return Err(PaymentError::Validation(
                "a payer email is required for funding".to_string(),
            ));
        }

        let request = PaymentRequest::new_funding(account_id, amount, method, payer_email);
        let request_id = request.id;
        self.track(request).await;
        tracing::info!(
            request = %request_id,
            account = account_id,
            amount = amount.value(),
            ?method,
            "funding initiated"
        );

        let request = match self.advance(request_id, RequestStatus::Paying).await? {
            Some(request) => request,
            // Cancelled before the collect call was dispatched.
            None => return self.tracked(request_id).await,
        };

        match self
            .gateway
            .collect(amount, payer_email, method, &request.idempotency_key)
            .await
        {
            Ok(receipt) => {
                self.commit(
                    request_id,
                    NewEntry::funding(
                        account_id,
                        amount,
                        Some(receipt.provider_ref),
                        &request.idempotency_key,
                    ),
                )
                .await
            }
            Err(err) => {
                self.fail(request_id, err.to_string()).await?;
                Err(err)
            }
        }
    }

    /// Spends wallet balance on a bill payment through the aggregator.
    ///
    /// The amount is reserved before any gateway call and the debit is
    /// appended only after the aggregator confirms; on any failure the
    /// reservation is released with the ledger untouched.
    pub async fn spend(
        &self,
        account_id: AccountId,
        service_code: &str,
        variation_code: Option<&str>,
        amount: Amount,
        recipient_ref: &str,
    ) -> Result<PaymentRequest> {
        self.active_account(account_id).await?;
        // Local validation happens before any request state exists.
        if recipient_ref.trim().is_empty() {
            return Err(PaymentError::Validation(
                "a recipient reference is required".to_string(),
            ));
        }
        let service = self.gateway.service(service_code).await?;
        if let Some(code) = variation_code {
            let variation = service.variation(code).ok_or_else(|| {
                PaymentError::Validation(format!(
                    "unknown variation {code} for service {service_code}"
                ))
            })?;
            if let Some(price) = variation.price
                && price != amount
            {
                return Err(PaymentError::Validation(format!(
                    "amount {} does not match the price {} of variation {code}",
                    amount.value(),
                    price.value()
                )));
            }
        }

        let request = PaymentRequest::new_spend(
            account_id,
            service_code,
            variation_code.map(str::to_string),
            amount,
            recipient_ref,
        );
        let request_id = request.id;
        self.track(request.clone()).await;
        tracing::info!(
            request = %request_id,
            account = account_id,
            service = service_code,
            amount = amount.value(),
            "spend initiated"
        );

        // Check-and-hold runs inside the per-account critical section so two
        // concurrent spends cannot both pass against the same balance.
        let lock = self.reservations.account_lock(account_id).await;
        {
            let _guard = lock.lock().await;
            let available = self.wallet.available(account_id).await?;
            if available < amount.value() {
                self.fail(request_id, "insufficient funds").await?;
                tracing::info!(request = %request_id, account = account_id, "spend rejected: insufficient funds");
                return Err(PaymentError::InsufficientFunds {
                    account: account_id,
                    requested: amount.value(),
                    available,
                });
            }
            self.reservations
                .hold(account_id, request_id, amount.value())
                .await;
        }

        // Every path out of here releases the hold: after the ledger commit
        // on success, without a ledger touch on failure.
        let outcome = self.execute_spend(&request, &service).await;
        self.reservations.release(account_id, request_id).await;
        outcome
    }

    async fn execute_spend(
        &self,
        request: &PaymentRequest,
        service: &ServiceCatalogEntry,
    ) -> Result<PaymentRequest> {
        if service.category.requires_verification() {
            match self.advance(request.id, RequestStatus::Verifying).await? {
                Some(_) => {}
                None => return self.tracked(request.id).await,
            }
            match self
                .gateway
                .verify(&request.service_code, &request.recipient_ref)
                .await
            {
                Ok(customer) => {
                    tracing::debug!(request = %request.id, customer = %customer.name, "biller reference verified");
                }
                Err(err) => {
                    self.fail(request.id, err.to_string()).await?;
                    return Err(err);
                }
            }
        }

        match self.advance(request.id, RequestStatus::Paying).await? {
            Some(_) => {}
            // Cancelled while verifying; the provider was never charged.
            None => return self.tracked(request.id).await,
        }

        match self
            .gateway
            .pay(
                &request.service_code,
                request.variation_code.as_deref(),
                request.amount,
                &request.recipient_ref,
                &request.idempotency_key,
            )
            .await
        {
            Ok(receipt) => {
                self.commit(
                    request.id,
                    NewEntry::spend(
                        request.account_id,
                        request.amount,
                        Some(receipt.provider_ref),
                        &request.idempotency_key,
                    ),
                )
                .await
            }
            Err(err) => {
                self.fail(request.id, err.to_string()).await?;
                Err(err)
            }
        }
    }

    /// Appends the confirmed entry and moves the request to its terminal
    /// success state.
    async fn commit(&self, request_id: RequestId, entry: NewEntry) -> Result<PaymentRequest> {
        match self.ledger.append(entry).await {
            Ok(entry) => {
                tracing::info!(request = %request_id, entry = entry.id, amount = entry.amount, "ledger entry committed");
            }
            Err(err) => {
                // The provider confirmed but the ledger did not; surface the
                // failure without partial state. Reconciliation against the
                // provider reference happens out of band.
                tracing::error!(request = %request_id, %err, "provider confirmed but ledger append failed");
                self.fail(request_id, err.to_string()).await?;
                return Err(err);
            }
        }
        match self.advance(request_id, RequestStatus::Succeeded).await? {
            Some(request) => Ok(request),
            None => self.tracked(request_id).await,
        }
    }

    /// Cancels a request that has not yet dispatched its provider call.
    /// Once pay/collect is in flight, cancellation is refused: the remote
    /// charge can no longer be aborted.
    pub async fn cancel(&self, request_id: RequestId) -> Result<PaymentRequest> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&request_id)
            .ok_or_else(|| PaymentError::Validation(format!("unknown request {request_id}")))?;
        if !request.can_cancel() {
            return Err(PaymentError::NotCancellable(request_id));
        }
        request.status = RequestStatus::Failed {
            cause: "cancelled".to_string(),
        };
        tracing::info!(request = %request_id, "request cancelled");
        Ok(request.clone())
    }

    /// Posts the correcting entry for a committed original. A second
    /// reversal of the same entry replays as `Conflict`.
    pub async fn reverse(&self, entry_id: EntryId) -> Result<LedgerEntry> {
        let original = self
            .ledger
            .get(entry_id)
            .await?
            .ok_or_else(|| PaymentError::Validation(format!("unknown ledger entry {entry_id}")))?;
        if original.kind == EntryKind::Reversal {
            return Err(PaymentError::Validation(
                "reversal entries cannot be reversed".to_string(),
            ));
        }
        if original.status != EntryStatus::Committed {
            return Err(PaymentError::Validation(format!(
                "entry {entry_id} is not in a reversible state"
            )));
        }

        let account_id = original.account_id;
        // Reversing a funding debits the wallet, so it runs through the same
        // per-account critical section as a spend.
        let lock = self.reservations.account_lock(account_id).await;
        let _guard = lock.lock().await;
        if original.amount > 0 {
            let available = self.wallet.available(account_id).await?;
            if available < original.amount {
                return Err(PaymentError::InsufficientFunds {
                    account: account_id,
                    requested: original.amount,
                    available,
                });
            }
        }

        let reversal = self.ledger.append(NewEntry::reversal(&original)).await?;
        self.ledger.mark_reversed(entry_id).await?;
        tracing::info!(entry = entry_id, reversal = reversal.id, "ledger entry reversed");
        Ok(reversal)
    }

    async fn active_account(&self, account_id: AccountId) -> Result<Account> {
        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or(PaymentError::UnknownAccount(account_id))?;
        if !account.is_active() {
            return Err(PaymentError::AccountClosed(account_id));
        }
        Ok(account)
    }

    async fn track(&self, request: PaymentRequest) {
        self.requests.write().await.insert(request.id, request);
    }

    async fn tracked(&self, request_id: RequestId) -> Result<PaymentRequest> {
        self.requests
            .read()
            .await
            .get(&request_id)
            .cloned()
            .ok_or_else(|| PaymentError::internal(format!("untracked request {request_id}")))
    }

    /// Advances a tracked request, returning the updated copy. `Ok(None)`
    /// means the request was cancelled in the meantime and the flow should
    /// stop without touching the provider or the ledger.
    async fn advance(
        &self,
        request_id: RequestId,
        next: RequestStatus,
    ) -> Result<Option<PaymentRequest>> {
        let mut requests = self.requests.write().await;
        let request = requests
            .get_mut(&request_id)
            .ok_or_else(|| PaymentError::internal(format!("untracked request {request_id}")))?;
        if request.is_cancelled() {
            return Ok(None);
        }
        if !request.status.can_transition_to(&next) {
            return Err(PaymentError::internal(format!(
                "illegal transition {:?} -> {:?} for request {request_id}",
                request.status, next
            )));
        }
        request.status = next;
        Ok(Some(request.clone()))
    }

    async fn fail(&self, request_id: RequestId, cause: impl Into<String>) -> Result<()> {
        self.advance(
            request_id,
            RequestStatus::Failed {
                cause: cause.into(),
            },
        )
        .await?;
        Ok(())
    }
}
