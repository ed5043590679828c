use crate::amortization::Amortizer;
use crate::error::Result;
use crate::grouping::{recurring_occurrences, Signals};
use crate::ledger::StatementLedger;
use crate::statement::StatementRecord;
use crate::utils::round_to_cents;
use chrono::NaiveDate;
use log::debug;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::Path;

/// Prefix on the description of synthetic amortized entries.
pub const AMORTIZED_PREFIX: &str = "(amortized) ";

/// One line on a calendar day: either a posted statement or an amortized share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementView {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub is_recurring: bool,
}

impl StatementView {
    pub fn from_record(record: &StatementRecord, is_recurring: bool) -> Self {
        Self {
            date: record.date(),
            description: record.description().to_string(),
            amount: record.amount(),
            is_recurring,
        }
    }

    pub fn amortized(date: NaiveDate, signal_key: &str, daily_amount: f64) -> Self {
        Self {
            date,
            description: format!("{}{}", AMORTIZED_PREFIX, signal_key),
            amount: daily_amount,
            is_recurring: true,
        }
    }

    pub fn is_amortized(&self) -> bool {
        self.description.starts_with(AMORTIZED_PREFIX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Green,
    Red,
}

impl DayStatus {
    pub fn from_net(net: f64) -> Self {
        if net >= 0.0 {
            Self::Green
        } else {
            Self::Red
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDayView {
    pub date: NaiveDate,
    /// Non-recurring raw amounts plus amortized shares, rounded to cents.
    pub net_daily_avg: f64,
    pub status_color: DayStatus,
    pub statements: Vec<StatementView>,
}

/// Day-by-day net cash-flow projection.
///
/// Iteration and serialization run most recent day first. Serialized as
/// `{"days": {"YYYY-MM-DD": {...}, ...}}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CashFlowCalendar {
    days: BTreeMap<NaiveDate, CalendarDayView>,
}

impl CashFlowCalendar {
    pub fn get(&self, date: NaiveDate) -> Option<&CalendarDayView> {
        self.days.get(&date)
    }

    pub fn days(&self) -> impl Iterator<Item = &CalendarDayView> {
        self.days.values().rev()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

struct DaysDescending<'a>(&'a BTreeMap<NaiveDate, CalendarDayView>);

impl Serialize for DaysDescending<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (date, view) in self.0.iter().rev() {
            map.serialize_entry(date, view)?;
        }
        map.end()
    }
}

impl Serialize for CashFlowCalendar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CashFlowCalendar", 1)?;
        state.serialize_field("days", &DaysDescending(&self.days))?;
        state.end()
    }
}

// Raw and amortized contributions are kept apart until the final pass, so a
// day that genuinely nets to zero is never mistaken for an unfilled one.
#[derive(Default)]
struct DayAccumulator {
    raw_net: f64,
    amortized: f64,
    statements: Vec<StatementView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarBuilder {
    forward_weekends: bool,
}

impl Default for CalendarBuilder {
    fn default() -> Self {
        Self {
            forward_weekends: true,
        }
    }
}

impl CalendarBuilder {
    pub fn new(forward_weekends: bool) -> Self {
        Self { forward_weekends }
    }

    pub fn build(&self, ledger: &StatementLedger, signals: &Signals<'_>) -> Result<CashFlowCalendar> {
        let recurring = recurring_occurrences(signals);

        let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

        if !signals.is_empty() {
            let amortizer = Amortizer::new(ledger.analysis_end_date()?, self.forward_weekends);

            for (key, records) in signals {
                let daily = amortizer.amortize(records).map_err(|e| {
                    debug!("Signal '{}' could not be amortized: {}", key, e);
                    e
                })?;
                debug!("Signal '{}' amortized over {} days", key, daily.len());

                for (day, amount) in daily {
                    let acc = days.entry(day).or_default();
                    acc.amortized += amount;
                    acc.statements.push(StatementView::amortized(day, key, amount));
                }
            }
        }

        for (day, records) in ledger.daily_statements() {
            let acc = days.entry(*day).or_default();
            for record in records {
                let is_recurring =
                    recurring.contains(&(record.date(), record.normalized_description()));
                if !is_recurring {
                    acc.raw_net += record.amount();
                }
                acc.statements
                    .push(StatementView::from_record(record, is_recurring));
            }
        }

        let days = days
            .into_iter()
            .map(|(date, acc)| {
                let net = round_to_cents(acc.raw_net + acc.amortized);
                (
                    date,
                    CalendarDayView {
                        date,
                        net_daily_avg: net,
                        status_color: DayStatus::from_net(net),
                        statements: acc.statements,
                    },
                )
            })
            .collect();

        Ok(CashFlowCalendar { days })
    }
}

/// Builds the calendar with weekend forwarding enabled.
pub fn build_calendar(ledger: &StatementLedger, signals: &Signals<'_>) -> Result<CashFlowCalendar> {
    CalendarBuilder::default().build(ledger, signals)
}
