//! Uniform interface over the bill-payment aggregator and the two
//! payment-collection providers.
//!
//! The gateway owns the cross-cutting call policy: every outbound call
//! carries the request's idempotency key as the provider-side request id,
//! timeouts classify as retryable, and retryable failures are resent with
//! bounded exponential backoff. Provider declines pass through untouched.

pub mod catalog;

use crate::config::{EngineConfig, RetryPolicy};
use crate::domain::account::Amount;
use crate::domain::catalog::{ServiceCatalogEntry, Variation};
use crate::domain::ports::{
    BillingProviderRef, CollectionProviderRef, CustomerInfo, Receipt,
};
use crate::domain::request::CollectionMethod;
use crate::error::{PaymentError, Result};
use self::catalog::CatalogCache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct ProviderGateway {
    aggregator: BillingProviderRef,
    card_collector: CollectionProviderRef,
    bank_collector: CollectionProviderRef,
    catalog: CatalogCache,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl ProviderGateway {
    pub fn new(
        aggregator: BillingProviderRef,
        card_collector: CollectionProviderRef,
        bank_collector: CollectionProviderRef,
        config: &EngineConfig,
    ) -> Self {
        Self {
            aggregator,
            card_collector,
            bank_collector,
            catalog: CatalogCache::new(config.catalog_ttl),
            retry: config.retry,
            call_timeout: config.call_timeout,
        }
    }

    /// Resolves a service from the cached catalog, refreshing it when the
    /// TTL has passed. A failed refresh serves the stale entry instead.
    pub async fn service(&self, service_code: &str) -> Result<ServiceCatalogEntry> {
        if let Some(entry) = self.catalog.fresh(service_code).await {
            return Ok(entry);
        }
        match self.fetch_catalog().await {
            Ok(services) => {
                self.catalog.put_all(services).await;
                self.catalog.any(service_code).await.ok_or_else(|| {
                    PaymentError::Validation(format!("unknown service code {service_code}"))
                })
            }
            Err(err) => match self.catalog.any(service_code).await {
                Some(stale) => {
                    tracing::warn!(service = service_code, %err, "catalog refresh failed, serving stale entry");
                    Ok(stale)
                }
                None => Err(err),
            },
        }
    }

    /// The purchasable variations of a service.
    pub async fn variations(&self, service_code: &str) -> Result<Vec<Variation>> {
        Ok(self.service(service_code).await?.variations)
    }

    /// Verifies a biller reference with the aggregator.
    pub async fn verify(&self, service_code: &str, biller_ref: &str) -> Result<CustomerInfo> {
        self.with_retry("verify", || async move {
            self.aggregator_call(self.aggregator.verify(service_code, biller_ref))
                .await
        })
        .await
    }

    /// Executes a bill payment, resending on retryable failures with the
    /// same request id.
    pub async fn pay(
        &self,
        service_code: &str,
        variation_code: Option<&str>,
        amount: Amount,
        biller_ref: &str,
        request_id: &str,
    ) -> Result<Receipt> {
        self.with_retry("pay", || async move {
            self.aggregator_call(self.aggregator.pay(
                service_code,
                variation_code,
                amount,
                biller_ref,
                request_id,
            ))
            .await
        })
        .await
    }

    /// Collects funds from the payer through the provider the method routes
    /// to: card payments go to the primary collector, bank transfers to the
    /// secondary one.
    pub async fn collect(
        &self,
        amount: Amount,
        payer_email: &str,
        method: CollectionMethod,
        request_id: &str,
    ) -> Result<Receipt> {
        let collector = match method {
            CollectionMethod::Card => &self.card_collector,
            CollectionMethod::Transfer => &self.bank_collector,
        };
        self.with_retry("collect", || async move {
            self.collector_call(collector.collect(amount, payer_email, request_id))
                .await
        })
        .await
    }

    /// Periodically re-fetches the catalog on its own schedule, independent
    /// of in-flight transactions.
    pub fn spawn_catalog_refresh(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let gateway = self;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it so the task only
            // refreshes after a full interval has passed.
            tick.tick().await;
            loop {
                tick.tick().await;
                match gateway.fetch_catalog().await {
                    Ok(services) => {
                        tracing::debug!(services = services.len(), "service catalog refreshed");
                        gateway.catalog.put_all(services).await;
                    }
                    Err(err) => {
                        tracing::warn!(%err, "catalog refresh failed, stale entries remain served");
                    }
                }
            }
        })
    }

    async fn fetch_catalog(&self) -> Result<Vec<ServiceCatalogEntry>> {
        self.with_retry("services", || async move {
            self.aggregator_call(self.aggregator.services()).await
        })
        .await
    }

    /// Bounds an aggregator call; an elapsed timeout is a retryable
    /// provider failure.
    async fn aggregator_call<T, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PaymentError::Provider {
                retryable: true,
                message: format!("call timed out after {:?}", self.call_timeout),
            }),
        }
    }

    /// Bounds a collection call; an elapsed timeout is a retryable
    /// collection failure.
    async fn collector_call<T, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PaymentError::Collection {
                retryable: true,
                message: format!("call timed out after {:?}", self.call_timeout),
            }),
        }
    }

    async fn with_retry<T, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(op, attempt, ?delay, %err, "retryable failure, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_retryable() {
                        tracing::warn!(op, attempts = attempt + 1, %err, "retries exhausted");
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sandbox::{SandboxAggregator, SandboxCollector};

    fn gateway() -> ProviderGateway {
        let config = EngineConfig {
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                factor: 2,
            },
            ..EngineConfig::default()
        };
        ProviderGateway::new(
            Arc::new(SandboxAggregator::new()),
            Arc::new(SandboxCollector::primary()),
            Arc::new(SandboxCollector::secondary()),
            &config,
        )
    }

    #[tokio::test]
    async fn test_service_lookup_populates_cache() {
        let gateway = gateway();
        let service = gateway.service("data-duomo").await.unwrap();
        assert!(!service.variations.is_empty());

        let variations = gateway.variations("data-duomo").await.unwrap();
        assert_eq!(variations, service.variations);
    }

    #[tokio::test]
    async fn test_unknown_service_is_a_validation_error() {
        let gateway = gateway();
        let err = gateway.service("cable-nowhere").await.unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_pay_retries_transient_failures() {
        let gateway = gateway();
        // The sandbox fails a "5555" recipient twice before succeeding; with
        // three attempts the payment lands.
        let receipt = gateway
            .pay(
                "airtime-duomo",
                None,
                Amount::new(50_000).unwrap(),
                "08015555555",
                "req-flaky-1",
            )
            .await
            .unwrap();
        assert!(!receipt.provider_ref.is_empty());
    }

    #[tokio::test]
    async fn test_pay_does_not_retry_declines() {
        let gateway = gateway();
        let err = gateway
            .pay(
                "airtime-duomo",
                None,
                Amount::new(50_000).unwrap(),
                "08010000000",
                "req-declined-1",
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaymentError::Provider {
                retryable: false,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_collect_exhausts_retries_on_persistent_failure() {
        let gateway = gateway();
        let err = gateway
            .collect(
                Amount::new(500_000).unwrap(),
                "down9999@example.com",
                CollectionMethod::Card,
                "req-down-1",
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaymentError::Collection {
                retryable: true,
                ..
            }
        ));
    }
}
