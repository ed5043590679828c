//! # Recurring Cash Flow
//!
//! A library that reads a personal bank-account history, detects recurring
//! cash flows (paychecks, subscriptions, bills) and builds a smoothed,
//! day-by-day net cash-flow calendar.
//!
//! ## Core Concepts
//!
//! - **Ledger**: every statement of a run, grouped by posting date
//! - **Candidate series**: statements sharing a normalized description
//!   (uppercased, digits stripped, whitespace collapsed)
//! - **Recurrence score**: blend of cadence regularity, amount stability and
//!   sample count, in `[0, 1]`
//! - **Signal**: a candidate series scoring above the recurring threshold
//! - **Amortization**: each lump sum of a signal is spread evenly over the
//!   days until its next occurrence, so a paycheck shows up as a steady daily
//!   inflow instead of a single spike
//!
//! ## Example
//!
//! ```rust,ignore
//! use recurring_cashflow::*;
//!
//! let ledger = StatementLedger::from_source(&WellsFargoCsv::new("data/checking.csv"))?;
//! let analyzer = CashFlowAnalyzer::new(AnalysisConfig::default())?;
//! let report = analyzer.analyze(&ledger)?;
//!
//! for day in report.calendar.days().take(7) {
//!     println!("{} {:>10.2} {:?}", day.date, day.net_daily_avg, day.status_color);
//! }
//! report.calendar.write_json("calendar.json")?;
//! ```

pub mod amortization;
pub mod calendar;
pub mod config;
pub mod error;
pub mod frequent;
pub mod grouping;
pub mod ledger;
pub mod scoring;
pub mod source;
pub mod statement;
pub mod utils;

pub use amortization::{amortize_signal, Amortizer, DailyAmortization};
pub use calendar::{
    build_calendar, CalendarBuilder, CalendarDayView, CashFlowCalendar, DayStatus, StatementView,
    AMORTIZED_PREFIX,
};
pub use config::{AnalysisConfig, RecurrenceConfig, SignalDirection};
pub use error::{CashFlowError, Result};
pub use frequent::{build_frequent_transactions, FrequentTransaction, FrequentTransactionsView};
pub use grouping::{
    deposit_candidates, discover_candidates, discover_signals, recurring_occurrences,
    withdrawal_candidates, CandidateSeries, Signals,
};
pub use ledger::{DailyStatements, StatementLedger};
pub use scoring::{is_recurring, recurrence_score, RecurrenceScore, RecurrenceScorer};
pub use source::{InMemorySource, SignConvention, StatementSource, WellsFargoCsv};
pub use statement::{aggregate_daily, normalize_description, StatementRecord};

use log::{debug, info};
use serde::Serialize;

/// Which ledger partition a series was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    Deposit,
    Withdrawal,
}

/// A candidate series together with its score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredSeries {
    pub key: String,
    pub direction: FlowDirection,
    pub score: RecurrenceScore,
    pub occurrences: usize,
}

/// Everything one analysis run produces.
#[derive(Debug, Clone, Serialize)]
pub struct CashFlowReport {
    /// All candidate series, highest score first.
    pub candidates: Vec<ScoredSeries>,
    /// The subset of `candidates` that was amortized.
    pub signals: Vec<ScoredSeries>,
    pub calendar: CashFlowCalendar,
    pub frequent: FrequentTransactionsView,
}

impl CashFlowReport {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone)]
pub struct CashFlowAnalyzer {
    config: AnalysisConfig,
    scorer: RecurrenceScorer,
}

impl CashFlowAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let scorer = RecurrenceScorer::new(config.recurrence.clone())?;
        Ok(Self { config, scorer })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn scorer(&self) -> &RecurrenceScorer {
        &self.scorer
    }

    /// Score a series the way the analyzer does when selecting signals.
    pub fn score_series(&self, series: &[&StatementRecord]) -> RecurrenceScore {
        if self.config.aggregate_daily_before_scoring {
            self.scorer.breakdown(&aggregate_daily(series))
        } else {
            self.scorer.breakdown(series)
        }
    }

    pub fn analyze(&self, ledger: &StatementLedger) -> Result<CashFlowReport> {
        info!(
            "Analyzing {} statements from {:?} to {:?}",
            ledger.len(),
            ledger.start_date(),
            ledger.analysis_end_date().ok()
        );

        let threshold = self.config.recurring_threshold;
        let mut candidates: Vec<ScoredSeries> = Vec::new();
        let mut signals = Signals::new();

        for (direction, series_map) in self.candidate_partitions(ledger) {
            for (key, series) in &series_map {
                let score = self.score_series(series);
                debug!(
                    "Candidate '{}' ({:?}, {} statements): score {:.3} (cadence {:.3}, amount {:.3}, count {:.3})",
                    key,
                    direction,
                    series.len(),
                    score.total,
                    score.cadence,
                    score.amount,
                    score.count
                );

                candidates.push(ScoredSeries {
                    key: key.clone(),
                    direction,
                    score,
                    occurrences: series.len(),
                });
            }

            let accepted =
                discover_signals(&series_map, |series| self.score_series(series).total >= threshold);

            // A description seen on both sides keeps both partitions under one
            // signal key.
            for (key, series) in accepted {
                signals.entry(key).or_default().extend(series);
            }
        }

        candidates.sort_by(|a, b| {
            b.score
                .total
                .total_cmp(&a.score.total)
                .then_with(|| a.key.cmp(&b.key))
        });

        let accepted: Vec<ScoredSeries> = candidates
            .iter()
            .filter(|c| c.score.total >= threshold)
            .cloned()
            .collect();

        let calendar =
            CalendarBuilder::new(self.config.forward_weekends).build(ledger, &signals)?;
        let frequent = build_frequent_transactions(
            ledger,
            &signals,
            self.config.frequent_threshold,
            |series| self.score_series(series).total,
        );

        info!(
            "Found {} recurring signals among {} candidates; calendar covers {} days",
            accepted.len(),
            candidates.len(),
            calendar.len()
        );

        Ok(CashFlowReport {
            candidates,
            signals: accepted,
            calendar,
            frequent,
        })
    }

    fn candidate_partitions<'a>(
        &self,
        ledger: &'a StatementLedger,
    ) -> Vec<(FlowDirection, CandidateSeries<'a>)> {
        match self.config.signal_direction {
            SignalDirection::Deposits => {
                vec![(FlowDirection::Deposit, deposit_candidates(ledger))]
            }
            SignalDirection::Withdrawals => {
                vec![(FlowDirection::Withdrawal, withdrawal_candidates(ledger))]
            }
            SignalDirection::Both => vec![
                (FlowDirection::Deposit, deposit_candidates(ledger)),
                (FlowDirection::Withdrawal, withdrawal_candidates(ledger)),
            ],
        }
    }
}

/// Runs the full pipeline with the default configuration.
pub fn analyze_statements(ledger: &StatementLedger) -> Result<CashFlowReport> {
    CashFlowAnalyzer::new(AnalysisConfig::default())?.analyze(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn subscription_ledger() -> StatementLedger {
        let mut records: Vec<StatementRecord> = (0..6)
            .map(|i| {
                StatementRecord::new(
                    date(2023, 1, 9) + Days::new(7 * i),
                    -11.99,
                    format!("MUSIC SVC {}", 4000 + i),
                )
            })
            .collect();
        records.extend((1..=4).map(|m| StatementRecord::new(date(2023, m, 1), 2000.0, "ACME PAYROLL")));
        records.push(StatementRecord::new(date(2023, 2, 14), -80.0, "FLOWERS"));
        StatementLedger::new(records, SignConvention::NegativeIsWithdrawal)
    }

    #[test]
    fn test_default_analysis_uses_deposits_only() {
        let report = analyze_statements(&subscription_ledger()).unwrap();

        assert!(report
            .candidates
            .iter()
            .all(|c| c.direction == FlowDirection::Deposit));
        assert_eq!(report.signals.len(), 1);
        assert_eq!(report.signals[0].key, "ACME PAYROLL");

        // Withdrawals still show up in the frequent view.
        assert_eq!(report.frequent.withdrawals[0].key, "MUSIC SVC");
    }

    #[test]
    fn test_both_directions() {
        let config = AnalysisConfig {
            signal_direction: SignalDirection::Both,
            ..Default::default()
        };
        let analyzer = CashFlowAnalyzer::new(config).unwrap();
        let report = analyzer.analyze(&subscription_ledger()).unwrap();

        let keys: Vec<&str> = report.signals.iter().map(|s| s.key.as_str()).collect();
        assert!(keys.contains(&"ACME PAYROLL"));
        assert!(keys.contains(&"MUSIC SVC"));
        assert!(!keys.contains(&"FLOWERS"));

        // Candidates are sorted by score, highest first.
        for pair in report.candidates.windows(2) {
            assert!(pair[0].score.total >= pair[1].score.total);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig {
            recurring_threshold: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            CashFlowAnalyzer::new(config),
            Err(CashFlowError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_same_day_postings_aggregated_before_scoring() {
        let mut records: Vec<StatementRecord> = (0..4)
            .map(|i| StatementRecord::new(date(2023, 3, 6) + Days::new(14 * i), 600.0, "SPLIT PAY"))
            .collect();
        records.extend(
            (0..4).map(|i| StatementRecord::new(date(2023, 3, 6) + Days::new(14 * i), 400.0, "SPLIT PAY")),
        );
        let ledger = StatementLedger::new(records, SignConvention::NegativeIsWithdrawal);
        let candidates = deposit_candidates(&ledger);
        let series = &candidates["SPLIT PAY"];

        let aggregated = CashFlowAnalyzer::new(AnalysisConfig::default()).unwrap();
        let raw = CashFlowAnalyzer::new(AnalysisConfig {
            aggregate_daily_before_scoring: false,
            ..Default::default()
        })
        .unwrap();

        assert!((aggregated.score_series(series).total - 1.0).abs() < 1e-9);
        assert!(raw.score_series(series).total < aggregated.score_series(series).total);
    }

    #[test]
    fn test_frequent_view_shares_candidate_scores() {
        let mut records = Vec::new();
        for i in 0..4 {
            let day = date(2023, 3, 6) + Days::new(14 * i);
            records.push(StatementRecord::new(day, -600.0, "SPLIT BILL"));
            records.push(StatementRecord::new(day, -400.0, "SPLIT BILL"));
        }
        records.push(StatementRecord::new(date(2023, 4, 20), -9.0, "SNACK"));
        let ledger = StatementLedger::new(records, SignConvention::NegativeIsWithdrawal);

        let config = AnalysisConfig {
            signal_direction: SignalDirection::Both,
            ..Default::default()
        };
        let report = CashFlowAnalyzer::new(config).unwrap().analyze(&ledger).unwrap();

        let candidate = report
            .candidates
            .iter()
            .find(|c| c.key == "SPLIT BILL")
            .unwrap();
        let frequent = report
            .frequent
            .withdrawals
            .iter()
            .find(|t| t.key == "SPLIT BILL")
            .unwrap();

        assert_eq!(candidate.score.total, frequent.recurrence_score);
        assert_eq!(report.signals.len(), 1);
        assert_eq!(frequent.statements.len(), 8);
        assert!(frequent.statements.iter().all(|s| s.is_recurring));
    }

    #[test]
    fn test_report_serializes() {
        let report = analyze_statements(&subscription_ledger()).unwrap();
        let json = report.to_json_pretty().unwrap();
        assert!(json.contains("\"candidates\""));
        assert!(json.contains("(amortized) ACME PAYROLL"));
    }
}
