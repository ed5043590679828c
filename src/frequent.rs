use crate::calendar::StatementView;
use crate::grouping::{
    deposit_candidates, recurring_occurrences, withdrawal_candidates, CandidateSeries, Signals,
};
use crate::ledger::StatementLedger;
use crate::statement::StatementRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A description group that recurs often enough to be worth listing, even if
/// it falls short of the amortization threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentTransaction {
    pub key: String,
    pub recurrence_score: f64,
    pub statements: Vec<StatementView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequentTransactionsView {
    pub withdrawals: Vec<FrequentTransaction>,
    pub deposits: Vec<FrequentTransaction>,
}

/// Lists withdrawal and deposit groups for which `score` is at least
/// `threshold`, highest score first.
///
/// Statements that belong to one of `signals` are flagged as recurring.
pub fn build_frequent_transactions<F>(
    ledger: &StatementLedger,
    signals: &Signals<'_>,
    threshold: f64,
    score: F,
) -> FrequentTransactionsView
where
    F: Fn(&[&StatementRecord]) -> f64,
{
    let recurring = recurring_occurrences(signals);
    FrequentTransactionsView {
        withdrawals: frequent_from_candidates(
            &withdrawal_candidates(ledger),
            &recurring,
            threshold,
            &score,
        ),
        deposits: frequent_from_candidates(&deposit_candidates(ledger), &recurring, threshold, &score),
    }
}

fn frequent_from_candidates<F>(
    candidates: &CandidateSeries<'_>,
    recurring: &HashSet<(NaiveDate, String)>,
    threshold: f64,
    score: &F,
) -> Vec<FrequentTransaction>
where
    F: Fn(&[&StatementRecord]) -> f64,
{
    let mut frequent: Vec<FrequentTransaction> = candidates
        .iter()
        .filter_map(|(key, series)| {
            let total = score(series.as_slice());
            if total < threshold {
                return None;
            }

            let mut statements: Vec<StatementView> = series
                .iter()
                .map(|r| {
                    let is_recurring = recurring.contains(&(r.date(), key.clone()));
                    StatementView::from_record(r, is_recurring)
                })
                .collect();
            statements.sort_by_key(|s| s.date);

            Some(FrequentTransaction {
                key: key.clone(),
                recurrence_score: total,
                statements,
            })
        })
        .collect();

    order_by_recurrence(&mut frequent);
    frequent
}

/// Highest score first; ties fall back to the key so output is stable.
pub fn order_by_recurrence(transactions: &mut [FrequentTransaction]) {
    transactions.sort_by(|a, b| {
        b.recurrence_score
            .total_cmp(&a.recurrence_score)
            .then_with(|| a.key.cmp(&b.key))
    });
}
