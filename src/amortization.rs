//! Spreads the lump sums of one recurring signal into per-day contributions.
//!
//! Each occurrence is divided evenly over the days until the next occurrence
//! (half-open, so the next occurrence starts its own span). The final
//! occurrence is spread evenly over every date up to and including the
//! analysis end date. Every unit of every lump sum lands on exactly one day,
//! so the sum of the returned map equals the sum of the signal's amounts
//! whenever the end date lies after the last occurrence.

use crate::error::{CashFlowError, Result};
use crate::statement::StatementRecord;
use crate::utils::{days_between, half_open_range, inclusive_range, weekend_forward_target};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Date -> accumulated amortized contribution.
pub type DailyAmortization = BTreeMap<NaiveDate, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amortizer {
    end_date: NaiveDate,
    forward_weekends: bool,
}

impl Amortizer {
    pub fn new(end_date: NaiveDate, forward_weekends: bool) -> Self {
        Self {
            end_date,
            forward_weekends,
        }
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn amortize<R: AsRef<StatementRecord>>(&self, records: &[R]) -> Result<DailyAmortization> {
        let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for record in records {
            let record: &StatementRecord = record.as_ref();
            *by_day.entry(record.date()).or_insert(0.0) += record.amount();
        }

        let days: Vec<NaiveDate> = by_day.keys().copied().collect();
        let Some(&last) = days.last() else {
            return Err(CashFlowError::EmptySignal);
        };

        let mut daily = DailyAmortization::new();

        for pair in days.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let span = days_between(start, end);
            if span <= 0 {
                debug!("Skipping non-positive amortization span {} -> {}", start, end);
                continue;
            }

            let rate = by_day[&start] / span as f64;
            for day in half_open_range(start, end) {
                self.accumulate(&mut daily, day, rate);
            }
        }

        let final_span = days_between(last, self.end_date);
        if final_span > 0 {
            // Both ends are included, so the span covers final_span + 1 dates.
            let rate = by_day[&last] / (final_span + 1) as f64;
            for day in inclusive_range(last, self.end_date) {
                self.accumulate(&mut daily, day, rate);
            }
        } else {
            debug!(
                "Final occurrence on {} has no span before {}; not amortized",
                last, self.end_date
            );
        }

        Ok(daily)
    }

    fn accumulate(&self, daily: &mut DailyAmortization, day: NaiveDate, amount: f64) {
        let target = if self.forward_weekends {
            weekend_forward_target(day)
        } else {
            day
        };
        *daily.entry(target).or_insert(0.0) += amount;
    }
}

/// Amortizes one signal's records up to `end_date`.
pub fn amortize_signal<R: AsRef<StatementRecord>>(
    records: &[R],
    end_date: NaiveDate,
    forward_weekends: bool,
) -> Result<DailyAmortization> {
    Amortizer::new(end_date, forward_weekends).amortize(records)
}
