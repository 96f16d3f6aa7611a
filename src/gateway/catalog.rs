use crate::domain::catalog::ServiceCatalogEntry;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct CachedEntry {
    fetched_at: Instant,
    entry: ServiceCatalogEntry,
}

/// TTL cache over the aggregator's service catalog.
///
/// Entries older than the TTL are refreshed on access; when the refresh
/// fails, the stale copy keeps being served so catalog browsing survives
/// aggregator downtime.
pub struct CatalogCache {
    entries: RwLock<HashMap<String, CachedEntry>>,
    ttl: Duration,
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// A cache hit younger than the TTL.
    pub async fn fresh(&self, service_code: &str) -> Option<ServiceCatalogEntry> {
        let entries = self.entries.read().await;
        entries
            .get(service_code)
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.entry.clone())
    }

    /// A cache hit of any age. Used only on the stale-if-error path.
    pub async fn any(&self, service_code: &str) -> Option<ServiceCatalogEntry> {
        let entries = self.entries.read().await;
        entries.get(service_code).map(|cached| cached.entry.clone())
    }

    /// Replaces the cached catalog with a freshly fetched one.
    pub async fn put_all(&self, services: Vec<ServiceCatalogEntry>) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.clear();
        for entry in services {
            entries.insert(
                entry.service_id.clone(),
                CachedEntry {
                    fetched_at: now,
                    entry,
                },
            );
        }
    }
}
