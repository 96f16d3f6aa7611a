use crate::domain::account::Amount;
use crate::domain::catalog::{ServiceCatalogEntry, ServiceCategory, Variation};
use crate::domain::ports::{BillingProvider, CollectionProvider, CustomerInfo, Receipt};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Suffix of a recipient reference or payer email that the sandbox declines
/// outright (non-retryable).
const DECLINE_SUFFIX: &str = "0000";
/// Suffix that fails with a retryable error on every attempt, so callers
/// exhaust their retry budget.
const UNAVAILABLE_SUFFIX: &str = "9999";
/// Suffix that fails with a retryable error twice per request id and then
/// succeeds, exercising the backoff path end to end.
const FLAKY_SUFFIX: &str = "5555";

const FLAKY_FAILURES: u32 = 2;

fn amount_of(value: i64) -> Amount {
    // Catalog prices are compile-time constants, all positive.
    Amount::new(value).unwrap_or_else(|_| unreachable!("catalog prices are positive"))
}

fn builtin_catalog() -> Vec<ServiceCatalogEntry> {
    vec![
        ServiceCatalogEntry {
            service_id: "airtime-duomo".to_string(),
            provider_id: "duomo".to_string(),
            display_name: "Duomo Airtime".to_string(),
            category: ServiceCategory::Airtime,
            variations: Vec::new(),
        },
        ServiceCatalogEntry {
            service_id: "data-duomo".to_string(),
            provider_id: "duomo".to_string(),
            display_name: "Duomo Data".to_string(),
            category: ServiceCategory::Data,
            variations: vec![
                Variation {
                    code: "duomo-1gb".to_string(),
                    name: "1GB monthly".to_string(),
                    price: Some(amount_of(100_000)),
                    validity: Some("30 days".to_string()),
                },
                Variation {
                    code: "duomo-5gb".to_string(),
                    name: "5GB monthly".to_string(),
                    price: Some(amount_of(350_000)),
                    validity: Some("30 days".to_string()),
                },
            ],
        },
        ServiceCatalogEntry {
            service_id: "tv-starview".to_string(),
            provider_id: "starview".to_string(),
            display_name: "Starview TV".to_string(),
            category: ServiceCategory::Tv,
            variations: vec![
                Variation {
                    code: "sv-basic".to_string(),
                    name: "Basic bouquet".to_string(),
                    price: Some(amount_of(250_000)),
                    validity: Some("1 month".to_string()),
                },
                Variation {
                    code: "sv-premium".to_string(),
                    name: "Premium bouquet".to_string(),
                    price: Some(amount_of(600_000)),
                    validity: Some("1 month".to_string()),
                },
            ],
        },
        ServiceCatalogEntry {
            service_id: "power-gridco".to_string(),
            provider_id: "gridco".to_string(),
            display_name: "GridCo Prepaid".to_string(),
            category: ServiceCategory::Electricity,
            variations: vec![Variation {
                code: "prepaid".to_string(),
                name: "Prepaid token".to_string(),
                price: None,
                validity: None,
            }],
        },
        ServiceCatalogEntry {
            service_id: "giftcard-lumo".to_string(),
            provider_id: "lumo".to_string(),
            display_name: "Lumo Gift Cards".to_string(),
            category: ServiceCategory::GiftCard,
            variations: vec![Variation {
                code: "lumo-50".to_string(),
                name: "50 USD card".to_string(),
                price: Some(amount_of(8_250_000)),
                validity: None,
            }],
        },
    ]
}

/// Classifies a reference against the sandbox trigger suffixes. `None`
/// means the call should succeed.
fn triggered_failure(reference: &str, attempt: u32) -> Option<(bool, &'static str)> {
    if reference.ends_with(DECLINE_SUFFIX) {
        Some((false, "declined by provider"))
    } else if reference.ends_with(UNAVAILABLE_SUFFIX) {
        Some((true, "upstream unavailable"))
    } else if reference.ends_with(FLAKY_SUFFIX) && attempt <= FLAKY_FAILURES {
        Some((true, "transient upstream error"))
    } else {
        None
    }
}

/// Deterministic stand-in for the bill-payment aggregator.
///
/// Behavior is keyed off the request payload so failure paths are
/// reproducible without wall-clock randomness: references ending in `0000`
/// decline, `9999` fail retryably on every attempt, `5555` fail retryably
/// twice per request id and then succeed. Attempts are counted per request
/// id, mirroring how a real aggregator dedupes resent requests.
pub struct SandboxAggregator {
    catalog: Vec<ServiceCatalogEntry>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl Default for SandboxAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxAggregator {
    pub fn new() -> Self {
        Self {
            catalog: builtin_catalog(),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    async fn record_attempt(&self, request_id: &str) -> u32 {
        let mut attempts = self.attempts.lock().await;
        let count = attempts.entry(request_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// How many pay attempts were made under the given request id.
    pub async fn attempts_for(&self, request_id: &str) -> u32 {
        self.attempts
            .lock()
            .await
            .get(request_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl BillingProvider for SandboxAggregator {
    async fn verify(&self, service_code: &str, biller_ref: &str) -> Result<CustomerInfo> {
        if biller_ref.ends_with(DECLINE_SUFFIX) {
            return Err(PaymentError::VerificationFailed(format!(
                "no customer found for {biller_ref} on {service_code}"
            )));
        }
        Ok(CustomerInfo {
            name: "ADA OBI".to_string(),
            address: "12 Marina Road, Lagos".to_string(),
        })
    }

    async fn services(&self) -> Result<Vec<ServiceCatalogEntry>> {
        Ok(self.catalog.clone())
    }

    async fn pay(
        &self,
        _service_code: &str,
        _variation_code: Option<&str>,
        _amount: Amount,
        biller_ref: &str,
        request_id: &str,
    ) -> Result<Receipt> {
        let attempt = self.record_attempt(request_id).await;
        if let Some((retryable, message)) = triggered_failure(biller_ref, attempt) {
            return Err(PaymentError::Provider {
                retryable,
                message: message.to_string(),
            });
        }
        Ok(Receipt {
            provider_ref: format!("agg-{request_id}"),
        })
    }
}

/// Deterministic stand-in for a payment-collection provider, with the same
/// trigger suffixes as the aggregator applied to the payer email.
pub struct SandboxCollector {
    label: &'static str,
    attempts: Mutex<HashMap<String, u32>>,
}

impl SandboxCollector {
    /// The card collector.
    pub fn primary() -> Self {
        Self::labelled("cardline")
    }

    /// The bank-transfer collector.
    pub fn secondary() -> Self {
        Self::labelled("bankbridge")
    }

    fn labelled(label: &'static str) -> Self {
        Self {
            label,
            attempts: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CollectionProvider for SandboxCollector {
    async fn collect(
        &self,
        _amount: Amount,
        payer_email: &str,
        request_id: &str,
    ) -> Result<Receipt> {
        let attempt = {
            let mut attempts = self.attempts.lock().await;
            let count = attempts.entry(request_id.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        // The local part carries the trigger suffix ("down9999@example.com").
        let local_part = payer_email.split('@').next().unwrap_or(payer_email);
        if let Some((retryable, message)) = triggered_failure(local_part, attempt) {
            return Err(PaymentError::Collection {
                retryable,
                message: message.to_string(),
            });
        }
        Ok(Receipt {
            provider_ref: format!("{}-{request_id}", self.label),
        })
    }
}
