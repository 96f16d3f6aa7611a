use super::account::{AccountId, Amount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RequestId = Uuid;

/// How a funding operation moves money into the wallet.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CollectionMethod {
    Card,
    Transfer,
}

/// Which external party a request is routed to.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ProviderRoute {
    /// Bill-payment aggregator (spend flows).
    Aggregator,
    /// Primary collection provider (card funding).
    CardCollector,
    /// Secondary collection provider (bank-transfer funding).
    BankCollector,
}

impl From<CollectionMethod> for ProviderRoute {
    fn from(method: CollectionMethod) -> Self {
        match method {
            CollectionMethod::Card => Self::CardCollector,
            CollectionMethod::Transfer => Self::BankCollector,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Initiated,
    Verifying,
    Paying,
    Succeeded,
    Failed { cause: String },
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }

    /// Legal lifecycle moves. Transitions are driven only by gateway
    /// responses (or a cancellation while still cancellable).
    pub fn can_transition_to(&self, next: &RequestStatus) -> bool {
        match (self, next) {
            (Self::Initiated, Self::Verifying)
            | (Self::Initiated, Self::Paying)
            | (Self::Initiated, Self::Failed { .. })
            | (Self::Verifying, Self::Paying)
            | (Self::Verifying, Self::Failed { .. })
            | (Self::Paying, Self::Succeeded)
            | (Self::Paying, Self::Failed { .. }) => true,
            _ => false,
        }
    }
}

/// One funding or spend operation, from initiation to its single terminal
/// state. Owned exclusively by the orchestrator.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentRequest {
    pub id: RequestId,
    pub account_id: AccountId,
    pub provider: ProviderRoute,
    pub service_code: String,
    pub variation_code: Option<String>,
    pub amount: Amount,
    /// Phone, meter or account number the biller credits; the payer email
    /// for funding requests.
    pub recipient_ref: String,
    pub status: RequestStatus,
    /// Shared between ledger append and provider calls so a replay is
    /// detectable end to end.
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentRequest {
    pub fn new_spend(
        account_id: AccountId,
        service_code: impl Into<String>,
        variation_code: Option<String>,
        amount: Amount,
        recipient_ref: impl Into<String>,
    ) -> Self {
        Self::new(
            account_id,
            ProviderRoute::Aggregator,
            service_code.into(),
            variation_code,
            amount,
            recipient_ref.into(),
        )
    }

    pub fn new_funding(
        account_id: AccountId,
        amount: Amount,
        method: CollectionMethod,
        payer_email: impl Into<String>,
    ) -> Self {
        Self::new(
            account_id,
            method.into(),
            "wallet-funding".to_string(),
            None,
            amount,
            payer_email.into(),
        )
    }

    fn new(
        account_id: AccountId,
        provider: ProviderRoute,
        service_code: String,
        variation_code: Option<String>,
        amount: Amount,
        recipient_ref: String,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            account_id,
            provider,
            service_code,
            variation_code,
            amount,
            recipient_ref,
            status: RequestStatus::Initiated,
            idempotency_key: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Cancellation is only permitted before the external pay/collect call
    /// is dispatched.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self.status,
            RequestStatus::Initiated | RequestStatus::Verifying
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(&self.status, RequestStatus::Failed { cause } if cause == "cancelled")
    }
}
