use crate::domain::account::AccountId;
use crate::domain::ledger::{EntryKind, EntryStatus, LedgerEntry};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Final state of one account after a batch run.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct BalanceRow {
    pub account: AccountId,
    /// Major units, trailing zeros trimmed.
    pub balance: Decimal,
    pub succeeded: u32,
    pub failed: u32,
}

#[derive(Debug, Serialize)]
struct HistoryRow {
    account: AccountId,
    entry: u64,
    kind: EntryKind,
    amount: Decimal,
    status: EntryStatus,
    reference: String,
}

/// Formats minor units as major units for display.
pub fn to_major(minor: i64) -> Decimal {
    Decimal::new(minor, 2).normalize()
}

/// Writes batch reports as CSV.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes the per-account balance summary, headers included.
    pub fn write_balances(&mut self, rows: &[BalanceRow]) -> Result<()> {
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes the settled history (newest first) for display.
pub struct HistoryWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> HistoryWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_entries(&mut self, entries: &[LedgerEntry]) -> Result<()> {
        for entry in entries {
            self.writer.serialize(HistoryRow {
                account: entry.account_id,
                entry: entry.id,
                kind: entry.kind,
                amount: to_major(entry.amount),
                status: entry.status,
                reference: entry.external_ref.clone().unwrap_or_default(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
