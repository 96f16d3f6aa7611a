use crate::error::PaymentError;
use serde::{Deserialize, Serialize};

pub type AccountId = u64;

/// A positive monetary amount in minor currency units (kobo, cents).
///
/// This is a wrapper around `i64` to enforce domain-specific rules: ledger
/// math never goes through floating point, and zero or negative amounts are
/// rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(i64);

impl Amount {
    pub fn new(value: i64) -> Result<Self, PaymentError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(PaymentError::Validation(
                "amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = PaymentError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    /// Soft-closed: the account and its ledger history remain, but new
    /// operations are rejected.
    Closed,
}

/// A wallet holder.
///
/// The balance is intentionally absent: it is always derived by folding the
/// account's committed ledger entries, never stored as a mutable field.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub id: AccountId,
    pub display_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub status: AccountStatus,
}

impl Account {
    pub fn new(
        id: AccountId,
        display_name: impl Into<String>,
        contact_email: impl Into<String>,
        contact_phone: impl Into<String>,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            contact_email: contact_email.into(),
            contact_phone: contact_phone.into(),
            status: AccountStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn close(&mut self) {
        self.status = AccountStatus::Closed;
    }
}
