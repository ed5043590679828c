use crate::error::{CashFlowError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const WEEKLY: u32 = 7;
pub const BIWEEKLY: u32 = 14;
pub const MONTHLY: u32 = 30;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Tuning constants for the recurrence scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RecurrenceConfig {
    #[schemars(
        description = "Reference cadences in days. The median gap of a series is compared against the closest one."
    )]
    pub cadences: Vec<u32>,

    #[schemars(
        description = "Number of occurrences at which the count confidence saturates at 1.0."
    )]
    pub min_sample_count: usize,

    #[schemars(
        description = "Days of distance from the nearest reference cadence that reduce the cadence score by a factor of e."
    )]
    pub cadence_tolerance: f64,

    #[schemars(
        description = "Population variance of the gaps (days squared) that reduces the cadence score by a factor of e."
    )]
    pub cadence_delta_tolerance: f64,

    #[schemars(
        description = "Coefficient of variation of the absolute amounts that reduces the amount score by a factor of e."
    )]
    pub amount_variance_tolerance: f64,

    pub cadence_weight: f64,
    pub amount_weight: f64,
    pub count_weight: f64,
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            cadences: vec![WEEKLY, BIWEEKLY, MONTHLY],
            min_sample_count: 4,
            cadence_tolerance: 4.0,
            cadence_delta_tolerance: 12.0,
            amount_variance_tolerance: 0.12,
            cadence_weight: 0.3,
            amount_weight: 0.4,
            count_weight: 0.3,
        }
    }
}

impl RecurrenceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cadences.is_empty() {
            return Err(CashFlowError::InvalidConfig(
                "At least one reference cadence is required".to_string(),
            ));
        }

        if self.cadences.contains(&0) {
            return Err(CashFlowError::InvalidConfig(
                "Reference cadences must be positive".to_string(),
            ));
        }

        if self.min_sample_count == 0 {
            return Err(CashFlowError::InvalidConfig(
                "min_sample_count must be at least 1".to_string(),
            ));
        }

        for (name, value) in [
            ("cadence_tolerance", self.cadence_tolerance),
            ("cadence_delta_tolerance", self.cadence_delta_tolerance),
            ("amount_variance_tolerance", self.amount_variance_tolerance),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(CashFlowError::InvalidConfig(format!(
                    "{} must be a positive number (got {})",
                    name, value
                )));
            }
        }

        let weights = [self.cadence_weight, self.amount_weight, self.count_weight];
        if weights.iter().any(|&w| w < 0.0) {
            return Err(CashFlowError::InvalidConfig(
                "Score weights must be non-negative".to_string(),
            ));
        }

        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(CashFlowError::InvalidConfig(format!(
                "Score weights must sum to 1.0 (got {})",
                sum
            )));
        }

        Ok(())
    }
}

/// Which side of the ledger is searched for recurring signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum SignalDirection {
    #[default]
    #[schemars(description = "Only inflows (paychecks, transfers in).")]
    Deposits,

    #[schemars(description = "Only outflows (subscriptions, bills).")]
    Withdrawals,

    #[schemars(description = "Both partitions, scored independently.")]
    Both,
}

/// Settings for a full analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalysisConfig {
    pub recurrence: RecurrenceConfig,

    #[schemars(description = "Minimum score for a series to be amortized as a recurring signal.")]
    pub recurring_threshold: f64,

    #[schemars(description = "Minimum score for a series to be listed as a frequent transaction.")]
    pub frequent_threshold: f64,

    #[schemars(
        description = "Move amortized contributions that land on a weekend to the following Monday."
    )]
    pub forward_weekends: bool,

    pub signal_direction: SignalDirection,

    #[schemars(
        description = "Collapse same-day postings of a series into one occurrence before scoring it."
    )]
    pub aggregate_daily_before_scoring: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            recurrence: RecurrenceConfig::default(),
            recurring_threshold: 0.75,
            frequent_threshold: 0.25,
            forward_weekends: true,
            signal_direction: SignalDirection::default(),
            aggregate_daily_before_scoring: true,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        self.recurrence.validate()?;

        for (name, value) in [
            ("recurring_threshold", self.recurring_threshold),
            ("frequent_threshold", self.frequent_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CashFlowError::InvalidConfig(format!(
                    "{} must be between 0.0 and 1.0 (got {})",
                    name, value
                )));
            }
        }

        Ok(())
    }

    /// Parses and validates a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalysisConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recurrence.cadences, vec![7, 14, 30]);
        assert_eq!(config.recurrence.min_sample_count, 4);
        assert!((config.recurring_threshold - 0.75).abs() < 1e-12);
        assert_eq!(config.signal_direction, SignalDirection::Deposits);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = RecurrenceConfig {
            cadence_weight: 0.3,
            amount_weight: 0.3,
            count_weight: 0.3,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CashFlowError::InvalidConfig(_))
        ));

        let alternate = RecurrenceConfig {
            cadence_weight: 0.3,
            amount_weight: 0.3,
            count_weight: 0.4,
            ..Default::default()
        };
        assert!(alternate.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_tolerance() {
        let config = RecurrenceConfig {
            cadence_tolerance: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RecurrenceConfig {
            amount_variance_tolerance: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_cadences_and_counts() {
        let empty = RecurrenceConfig {
            cadences: vec![],
            ..Default::default()
        };
        assert!(empty.validate().is_err());

        let zero = RecurrenceConfig {
            cadences: vec![0, 30],
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let no_samples = RecurrenceConfig {
            min_sample_count: 0,
            ..Default::default()
        };
        assert!(no_samples.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AnalysisConfig::from_json_str(
            r#"{
                "recurring_threshold": 0.8,
                "signal_direction": "Both",
                "recurrence": { "min_sample_count": 6 }
            }"#,
        )
        .unwrap();

        assert!((config.recurring_threshold - 0.8).abs() < 1e-12);
        assert_eq!(config.signal_direction, SignalDirection::Both);
        assert_eq!(config.recurrence.min_sample_count, 6);
        assert_eq!(config.recurrence.cadences, vec![7, 14, 30]);
        assert!(config.forward_weekends);
    }

    #[test]
    fn test_json_threshold_out_of_range() {
        let result = AnalysisConfig::from_json_str(r#"{ "frequent_threshold": 1.5 }"#);
        assert!(matches!(result, Err(CashFlowError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_json() {
        let result = AnalysisConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(CashFlowError::Serialization(_))));
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = AnalysisConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("recurring_threshold"));
        assert!(schema_json.contains("cadence_delta_tolerance"));
        assert!(schema_json.contains("forward_weekends"));
    }
}
