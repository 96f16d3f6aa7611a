use super::account::Amount;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Airtime,
    Data,
    Tv,
    Electricity,
    GiftCard,
}

impl ServiceCategory {
    /// Whether the biller reference must be verified with the aggregator
    /// before paying (smartcard and meter numbers; airtime and data go
    /// straight through).
    pub fn requires_verification(&self) -> bool {
        matches!(self, Self::Tv | Self::Electricity)
    }
}

/// A purchasable plan within a service (a data bundle, a TV bouquet).
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Variation {
    pub code: String,
    pub name: String,
    /// Fixed price in minor units; `None` for variable-amount services.
    pub price: Option<Amount>,
    pub validity: Option<String>,
}

/// One biller as exposed by the aggregator. Read-mostly: refreshed on an
/// interval, never mutated mid-transaction.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ServiceCatalogEntry {
    pub service_id: String,
    pub provider_id: String,
    pub display_name: String,
    pub category: ServiceCategory,
    pub variations: Vec<Variation>,
}

impl ServiceCatalogEntry {
    pub fn variation(&self, code: &str) -> Option<&Variation> {
        self.variations.iter().find(|v| v.code == code)
    }
}
