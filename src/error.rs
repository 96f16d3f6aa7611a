use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug)]
pub enum PaymentError {
    /// The wallet cannot cover the requested debit. Raised locally, before
    /// any provider call is made.
    #[error("insufficient funds: account {account} has {available} available, requested {requested}")]
    InsufficientFunds {
        account: u64,
        requested: i64,
        available: i64,
    },
    #[error("verification failed: {0}")]
    VerificationFailed(String),
    /// Bill-payment aggregator failure. Retryable failures (timeouts,
    /// transient upstream errors) are retried by the gateway; declines are not.
    #[error("provider error: {message} (retryable: {retryable})")]
    Provider { retryable: bool, message: String },
    /// Payment-collection failure on the funding side.
    #[error("collection error: {message} (retryable: {retryable})")]
    Collection { retryable: bool, message: String },
    /// An idempotency key was replayed against the ledger.
    #[error("idempotency conflict: key {0} is already committed")]
    Conflict(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unknown account: {0}")]
    UnknownAccount(u64),
    #[error("account {0} is closed")]
    AccountClosed(u64),
    #[error("request {0} can no longer be cancelled")]
    NotCancellable(uuid::Uuid),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl PaymentError {
    /// Whether the gateway may transparently resend the failed call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Provider {
                retryable: true,
                ..
            } | Self::Collection {
                retryable: true,
                ..
            }
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let timeout = PaymentError::Provider {
            retryable: true,
            message: "request timed out".to_string(),
        };
        assert!(timeout.is_retryable());

        let decline = PaymentError::Provider {
            retryable: false,
            message: "declined by biller".to_string(),
        };
        assert!(!decline.is_retryable());

        assert!(!PaymentError::Validation("bad amount".to_string()).is_retryable());
        assert!(!PaymentError::Conflict("key".to_string()).is_retryable());
    }
}
