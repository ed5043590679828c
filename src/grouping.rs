use crate::ledger::StatementLedger;
use crate::statement::{normalize_description, StatementRecord};
use chrono::NaiveDate;
use log::debug;
use std::collections::{BTreeMap, HashSet};

/// Normalized description key -> records sharing it, in first-seen order.
pub type CandidateSeries<'a> = BTreeMap<String, Vec<&'a StatementRecord>>;

/// Candidate series confirmed as recurring. Same shape as [`CandidateSeries`].
pub type Signals<'a> = BTreeMap<String, Vec<&'a StatementRecord>>;

/// Groups every record matching `predicate` by its normalized description.
pub fn discover_candidates<'a, I, F>(records: I, predicate: F) -> CandidateSeries<'a>
where
    I: IntoIterator<Item = &'a StatementRecord>,
    F: Fn(&StatementRecord) -> bool,
{
    let mut candidates: CandidateSeries<'a> = BTreeMap::new();
    for record in records {
        if predicate(record) {
            candidates
                .entry(normalize_description(record.description()))
                .or_default()
                .push(record);
        }
    }
    candidates
}

pub fn withdrawal_candidates(ledger: &StatementLedger) -> CandidateSeries<'_> {
    discover_candidates(ledger.records(), |r| ledger.is_withdrawal(r))
}

pub fn deposit_candidates(ledger: &StatementLedger) -> CandidateSeries<'_> {
    discover_candidates(ledger.records(), |r| ledger.is_deposit(r))
}

/// Keeps the candidate series for which `detector` holds.
pub fn discover_signals<'a, F>(candidates: &CandidateSeries<'a>, detector: F) -> Signals<'a>
where
    F: Fn(&[&'a StatementRecord]) -> bool,
{
    candidates
        .iter()
        .filter(|(key, series)| {
            let keep = detector(series);
            if keep {
                debug!("Signal accepted: '{}' ({} statements)", key, series.len());
            }
            keep
        })
        .map(|(key, series)| (key.clone(), series.clone()))
        .collect()
}

/// `(date, normalized description)` of every statement belonging to a signal.
///
/// A statement is recurring when its pair is in this set.
pub fn recurring_occurrences(signals: &Signals<'_>) -> HashSet<(NaiveDate, String)> {
    signals
        .values()
        .flatten()
        .map(|r| (r.date(), r.normalized_description()))
        .collect()
}
