use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single posted transaction as delivered by a statement source.
///
/// Records are immutable once built; later stages borrow them rather than
/// cloning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRecord {
    date: NaiveDate,
    /// Signed amount. The sign convention belongs to the source.
    amount: f64,
    description: String,
}

impl StatementRecord {
    pub fn new(date: NaiveDate, amount: f64, description: impl Into<String>) -> Self {
        Self {
            date,
            amount,
            description: description.into(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Grouping key for this record, see [`normalize_description`].
    pub fn normalized_description(&self) -> String {
        normalize_description(&self.description)
    }
}

impl AsRef<StatementRecord> for StatementRecord {
    fn as_ref(&self) -> &StatementRecord {
        self
    }
}

/// Uppercases `description`, strips every run of ASCII digits and collapses
/// whitespace to single spaces.
///
/// Two postings of the same payment that differ only in reference numbers
/// share a key: `"PAYROLL 001"` and `"Payroll 002"` both become `"PAYROLL"`.
pub fn normalize_description(description: &str) -> String {
    let without_digits: String = description
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .collect();

    without_digits.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapses same-day records into one record per date.
///
/// Amounts landing on the same date are summed. The description of the first
/// record is carried onto every aggregate. Output is in ascending date order.
pub fn aggregate_daily<R: AsRef<StatementRecord>>(records: &[R]) -> Vec<StatementRecord> {
    let Some(first) = records.first() else {
        return Vec::new();
    };
    let first: &StatementRecord = first.as_ref();
    let description = first.description();

    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        let record: &StatementRecord = record.as_ref();
        *totals.entry(record.date()).or_insert(0.0) += record.amount();
    }

    totals
        .into_iter()
        .map(|(date, amount)| StatementRecord::new(date, amount, description))
        .collect()
}
