//! Statement sources: adapters that turn a bank export into [`StatementRecord`]s.
//!
//! The core never parses bank formats itself. Anything that can produce a
//! list of dated, signed, described amounts can feed a ledger.

use crate::error::{CashFlowError, Result};
use crate::statement::StatementRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

/// How a source signs its amounts.
///
/// Exactly one of [`is_withdrawal`](Self::is_withdrawal) and
/// [`is_deposit`](Self::is_deposit) holds for any record. A zero amount is
/// always a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignConvention {
    /// Checking-account style: money out is negative.
    #[default]
    NegativeIsWithdrawal,
    /// Card style: charges are positive, refunds negative.
    PositiveIsWithdrawal,
}

impl SignConvention {
    pub fn is_withdrawal(&self, record: &StatementRecord) -> bool {
        match self {
            Self::NegativeIsWithdrawal => record.amount() < 0.0,
            Self::PositiveIsWithdrawal => record.amount() > 0.0,
        }
    }

    pub fn is_deposit(&self, record: &StatementRecord) -> bool {
        !self.is_withdrawal(record)
    }
}

pub trait StatementSource {
    fn load(&self) -> Result<Vec<StatementRecord>>;

    fn sign_convention(&self) -> SignConvention {
        SignConvention::default()
    }
}

/// Records that are already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<StatementRecord>,
    convention: SignConvention,
}

impl InMemorySource {
    pub fn new(records: Vec<StatementRecord>) -> Self {
        Self {
            records,
            convention: SignConvention::default(),
        }
    }

    pub fn with_convention(mut self, convention: SignConvention) -> Self {
        self.convention = convention;
        self
    }
}

impl StatementSource for InMemorySource {
    fn load(&self) -> Result<Vec<StatementRecord>> {
        Ok(self.records.clone())
    }

    fn sign_convention(&self) -> SignConvention {
        self.convention
    }
}

const WF_DATE_COLUMN: usize = 0;
const WF_AMOUNT_COLUMN: usize = 1;
const WF_DESCRIPTION_COLUMN: usize = 4;

/// Wells Fargo checking export.
///
/// Headerless CSV with five columns: `date, amount, *, *, description`.
/// Dates are `MM/DD/YYYY`; amounts may carry `$` and thousands separators.
#[derive(Debug, Clone)]
pub struct WellsFargoCsv {
    path: PathBuf,
}

impl WellsFargoCsv {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn parse_reader<R: Read>(reader: R) -> Result<Vec<StatementRecord>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = Vec::new();

        for (idx, result) in rdr.records().enumerate() {
            let row = result?;
            let line = row
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 1);

            if row.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let date_str = row.get(WF_DATE_COLUMN).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(date_str, "%m/%d/%Y").map_err(|_| {
                CashFlowError::InvalidRecord {
                    line,
                    details: format!("Invalid date '{}'. Expected MM/DD/YYYY", date_str),
                }
            })?;

            let amount_str = row.get(WF_AMOUNT_COLUMN).unwrap_or("");
            let amount = parse_amount(amount_str).ok_or_else(|| CashFlowError::InvalidRecord {
                line,
                details: format!("Invalid amount '{}'", amount_str),
            })?;

            let description = row.get(WF_DESCRIPTION_COLUMN).unwrap_or("").trim();
            if description.is_empty() {
                return Err(CashFlowError::InvalidRecord {
                    line,
                    details: "Missing description".to_string(),
                });
            }

            records.push(StatementRecord::new(date, amount, description));
        }

        Ok(records)
    }
}

impl StatementSource for WellsFargoCsv {
    fn load(&self) -> Result<Vec<StatementRecord>> {
        let file = std::fs::File::open(&self.path)?;
        Self::parse_reader(file)
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
