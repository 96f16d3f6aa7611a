use crate::domain::account::{AccountId, Amount};
use crate::domain::request::CollectionMethod;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Fund,
    Spend,
}

/// One wallet operation as it appears in the input file. Amounts are major
/// currency units at this edge; the core works in minor units.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Operation {
    pub op: OperationKind,
    pub account: AccountId,
    pub amount: Decimal,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub variation: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub method: Option<CollectionMethod>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Operation {
    /// Converts the major-unit amount to minor units, rejecting values with
    /// more precision than the currency carries.
    pub fn amount_minor(&self) -> Result<Amount> {
        let scaled = self.amount * Decimal::from(100);
        if !scaled.is_integer() {
            return Err(PaymentError::Validation(format!(
                "amount {} has sub-minor-unit precision",
                self.amount
            )));
        }
        let minor = scaled
            .to_i64()
            .ok_or_else(|| PaymentError::Validation("amount out of range".to_string()))?;
        Amount::new(minor)
    }
}

/// Reads wallet operations from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<Operation>`. It handles whitespace trimming and flexible record
/// lengths automatically, so funding rows can omit the spend-only columns.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    /// Creates a new `OperationReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes operations,
    /// allowing large files to be processed in a streaming fashion.
    pub fn operations(self) -> impl Iterator<Item = Result<Operation>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
