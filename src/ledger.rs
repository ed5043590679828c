use crate::error::{CashFlowError, Result};
use crate::source::{SignConvention, StatementSource};
use crate::statement::StatementRecord;
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Date-keyed view over statement records, ascending by date.
pub type DailyStatements<'a> = BTreeMap<NaiveDate, Vec<&'a StatementRecord>>;

/// Every record of one analysis run, grouped by posting date.
///
/// Built once and read-only afterwards. Withdrawal and deposit views are
/// derived on demand from the source's sign convention.
#[derive(Debug, Clone, Default)]
pub struct StatementLedger {
    statements: BTreeMap<NaiveDate, Vec<StatementRecord>>,
    convention: SignConvention,
}

impl StatementLedger {
    pub fn new(records: Vec<StatementRecord>, convention: SignConvention) -> Self {
        let mut statements: BTreeMap<NaiveDate, Vec<StatementRecord>> = BTreeMap::new();
        for record in records {
            statements.entry(record.date()).or_default().push(record);
        }

        debug!(
            "Ledger built with {} statements over {} days",
            statements.values().map(Vec::len).sum::<usize>(),
            statements.len()
        );

        Self {
            statements,
            convention,
        }
    }

    pub fn from_source<S: StatementSource + ?Sized>(source: &S) -> Result<Self> {
        let records = source.load()?;
        Ok(Self::new(records, source.sign_convention()))
    }

    pub fn daily_statements(&self) -> &BTreeMap<NaiveDate, Vec<StatementRecord>> {
        &self.statements
    }

    pub fn sign_convention(&self) -> SignConvention {
        self.convention
    }

    pub fn len(&self) -> usize {
        self.statements.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// All records in date order; same-day records keep insertion order.
    pub fn records(&self) -> impl Iterator<Item = &StatementRecord> {
        self.statements.values().flatten()
    }

    /// Records satisfying `predicate`, keyed by date. Days with no matching
    /// record are absent.
    pub fn view<F>(&self, predicate: F) -> DailyStatements<'_>
    where
        F: Fn(&StatementRecord) -> bool,
    {
        let mut view: DailyStatements<'_> = BTreeMap::new();
        for (day, records) in &self.statements {
            let matching: Vec<&StatementRecord> =
                records.iter().filter(|r| predicate(r)).collect();
            if !matching.is_empty() {
                view.insert(*day, matching);
            }
        }
        view
    }

    pub fn withdrawals_view(&self) -> DailyStatements<'_> {
        self.view(|r| self.is_withdrawal(r))
    }

    pub fn deposits_view(&self) -> DailyStatements<'_> {
        self.view(|r| self.is_deposit(r))
    }

    pub fn is_withdrawal(&self, record: &StatementRecord) -> bool {
        self.convention.is_withdrawal(record)
    }

    pub fn is_deposit(&self, record: &StatementRecord) -> bool {
        self.convention.is_deposit(record)
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.statements.keys().next().copied()
    }

    /// The latest posting date in the ledger: the horizon every signal is
    /// amortized up to.
    pub fn analysis_end_date(&self) -> Result<NaiveDate> {
        self.statements
            .keys()
            .next_back()
            .copied()
            .ok_or(CashFlowError::EmptyLedger)
    }
}
