//! Recurrence scoring.
//!
//! A series is scored on three independent axes and the results are blended
//! with configurable weights:
//!
//! - **Cadence**: how close the median gap between occurrences sits to a
//!   reference cadence (weekly, biweekly, monthly), and how much the gaps
//!   jitter around that median.
//! - **Amount**: coefficient of variation of the absolute amounts.
//! - **Count**: how many occurrences back the pattern, saturating at
//!   `min_sample_count`.

use crate::config::RecurrenceConfig;
use crate::error::Result;
use crate::statement::StatementRecord;
use crate::utils::days_between;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Series shorter than this carry no evidence and score 0.
pub const MIN_SCORABLE_RECORDS: usize = 3;

/// Guards the coefficient of variation against all-zero series.
const AMOUNT_EPSILON: f64 = 1e-6;

/// Per-axis breakdown of a recurrence score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RecurrenceScore {
    pub cadence: f64,
    pub amount: f64,
    pub count: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RecurrenceScorer {
    config: RecurrenceConfig,
}

impl RecurrenceScorer {
    pub fn new(config: RecurrenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RecurrenceConfig {
        &self.config
    }

    pub fn score<R: AsRef<StatementRecord>>(&self, records: &[R]) -> f64 {
        self.breakdown(records).total
    }

    pub fn is_recurring<R: AsRef<StatementRecord>>(&self, records: &[R], threshold: f64) -> bool {
        self.score(records) >= threshold
    }

    pub fn breakdown<R: AsRef<StatementRecord>>(&self, records: &[R]) -> RecurrenceScore {
        if records.len() < MIN_SCORABLE_RECORDS {
            return RecurrenceScore::default();
        }

        let mut points: Vec<(NaiveDate, f64)> = records
            .iter()
            .map(|r| {
                let r: &StatementRecord = r.as_ref();
                (r.date(), r.amount())
            })
            .collect();
        points.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let cadence = self.cadence_score(&points);
        let amount = self.amount_score(&points);
        let count = self.count_score(points.len());

        let total = self.config.cadence_weight * cadence
            + self.config.amount_weight * amount
            + self.config.count_weight * count;

        RecurrenceScore {
            cadence,
            amount,
            count,
            total,
        }
    }

    fn cadence_score(&self, points: &[(NaiveDate, f64)]) -> f64 {
        let gaps: Vec<f64> = points
            .windows(2)
            .map(|w| days_between(w[0].0, w[1].0) as f64)
            .collect();

        let median_gap = median(&gaps);
        let gap_variance = population_variance(&gaps);

        let cadence_error = self
            .config
            .cadences
            .iter()
            .map(|&c| (median_gap - c as f64).abs())
            .fold(f64::INFINITY, f64::min);

        (-cadence_error / self.config.cadence_tolerance).exp()
            * (-gap_variance / self.config.cadence_delta_tolerance).exp()
    }

    fn amount_score(&self, points: &[(NaiveDate, f64)]) -> f64 {
        let amounts: Vec<f64> = points.iter().map(|(_, amount)| amount.abs()).collect();
        let cv = population_std_dev(&amounts) / (mean(&amounts) + AMOUNT_EPSILON);
        (-cv / self.config.amount_variance_tolerance).exp()
    }

    fn count_score(&self, count: usize) -> f64 {
        (count as f64 / self.config.min_sample_count as f64).min(1.0)
    }
}

/// Score under the default configuration.
pub fn recurrence_score<R: AsRef<StatementRecord>>(records: &[R]) -> f64 {
    RecurrenceScorer::default().score(records)
}

/// `recurrence_score(records) >= threshold` under the default configuration.
pub fn is_recurring<R: AsRef<StatementRecord>>(records: &[R], threshold: f64) -> bool {
    RecurrenceScorer::default().is_recurring(records, threshold)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

fn population_std_dev(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn series(start: NaiveDate, gaps: &[u64], amounts: &[f64]) -> Vec<StatementRecord> {
        let mut date = start;
        let mut records = vec![StatementRecord::new(date, amounts[0], "SERIES")];
        for (gap, amount) in gaps.iter().zip(&amounts[1..]) {
            date = date.checked_add_days(Days::new(*gap)).unwrap();
            records.push(StatementRecord::new(date, *amount, "SERIES"));
        }
        records
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 6).unwrap()
    }

    #[test]
    fn test_fewer_than_three_records_score_zero() {
        let scorer = RecurrenceScorer::default();
        let empty: Vec<StatementRecord> = Vec::new();
        assert_eq!(scorer.score(&empty), 0.0);

        let one = series(start(), &[], &[100.0]);
        assert_eq!(scorer.score(&one), 0.0);

        let two = series(start(), &[14], &[100.0, 100.0]);
        assert_eq!(scorer.score(&two), 0.0);
        assert_eq!(scorer.breakdown(&two), RecurrenceScore::default());
    }

    #[test]
    fn test_regular_biweekly_series_scores_high() {
        let records = series(start(), &[14; 5], &[1250.0; 6]);
        let breakdown = RecurrenceScorer::default().breakdown(&records);

        assert!((breakdown.cadence - 1.0).abs() < 1e-9);
        assert!((breakdown.amount - 1.0).abs() < 1e-6);
        assert!((breakdown.count - 1.0).abs() < 1e-12);
        assert!(breakdown.total > 0.9, "got {}", breakdown.total);
    }

    #[test]
    fn test_irregular_series_scores_low() {
        let records = series(
            start(),
            &[3, 45, 9, 60],
            &[-4.5, -820.0, -19.99, -1400.0, -63.0],
        );
        let breakdown = RecurrenceScorer::default().breakdown(&records);

        assert!(breakdown.cadence < 1e-6, "cadence {}", breakdown.cadence);
        assert!(breakdown.amount < 1e-3, "amount {}", breakdown.amount);
        // Only the count term survives; it is capped at count_weight.
        assert!(breakdown.total < 0.31, "total {}", breakdown.total);
        assert!(!is_recurring(&records, 0.75));
    }

    #[test]
    fn test_score_is_order_invariant() {
        let records = series(
            start(),
            &[30, 31, 29, 33, 30],
            &[-15.49, -15.49, -17.99, -15.49, -15.49, -15.49],
        );
        let mut reversed = records.clone();
        reversed.reverse();
        let mut shuffled = records.clone();
        shuffled.swap(0, 3);
        shuffled.swap(1, 5);

        let baseline = recurrence_score(&records);
        assert!(baseline > 0.0);
        assert_eq!(recurrence_score(&reversed), baseline);
        assert_eq!(recurrence_score(&shuffled), baseline);
    }

    #[test]
    fn test_monthly_paycheck_is_recurring() {
        let records: Vec<StatementRecord> = (1..=6)
            .map(|m| {
                StatementRecord::new(
                    NaiveDate::from_ymd_opt(2023, m, 1).unwrap(),
                    1000.0,
                    "PAYROLL",
                )
            })
            .collect();

        let breakdown = RecurrenceScorer::default().breakdown(&records);
        // Gaps 31, 28, 31, 30, 31: median 31, variance 1.36.
        let expected_cadence = (-1.0_f64 / 4.0).exp() * (-1.36_f64 / 12.0).exp();
        assert!((breakdown.cadence - expected_cadence).abs() < 1e-9);
        assert!(is_recurring(&records, 0.75));
    }

    #[test]
    fn test_all_zero_amounts_do_not_produce_nan() {
        let records = series(start(), &[7, 7, 7], &[0.0; 4]);
        let score = recurrence_score(&records);
        assert!(score.is_finite());
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_count_confidence_saturates() {
        let scorer = RecurrenceScorer::default();
        let three = series(start(), &[7, 7], &[10.0; 3]);
        let eight = series(start(), &[7; 7], &[10.0; 8]);
        assert!((scorer.breakdown(&three).count - 0.75).abs() < 1e-12);
        assert!((scorer.breakdown(&eight).count - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_custom_weights_change_total() {
        let config = RecurrenceConfig {
            cadence_weight: 0.0,
            amount_weight: 0.0,
            count_weight: 1.0,
            ..Default::default()
        };
        let scorer = RecurrenceScorer::new(config).unwrap();
        let records = series(start(), &[3, 45, 9, 60], &[1.0, 900.0, 3.0, 50.0, 7.0]);
        assert!((scorer.score(&records) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RecurrenceConfig {
            cadence_weight: 0.9,
            ..Default::default()
        };
        assert!(RecurrenceScorer::new(config).is_err());
    }

    #[test]
    fn test_median_and_variance() {
        assert_eq!(median(&[3.0, 45.0, 9.0, 60.0]), 27.0);
        assert_eq!(median(&[5.0, 1.0, 3.0]), 3.0);
        assert!((population_variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 4.0).abs() < 1e-12);
        assert_eq!(population_std_dev(&[1.0, 1.0, 1.0]), 0.0);
    }
}
