use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Whole days from `start` to `end`. Negative when `end` precedes `start`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The posting day for an amount landing on `date`.
///
/// Saturdays and Sundays roll forward to the following Monday; weekdays
/// are returned unchanged.
pub fn weekend_forward_target(date: NaiveDate) -> NaiveDate {
    let offset = match date.weekday() {
        Weekday::Sat => 2,
        Weekday::Sun => 1,
        _ => return date,
    };

    date.checked_add_days(Days::new(offset)).unwrap_or(date)
}

/// Dates in `[start, end)`.
pub fn half_open_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d < end)
}

/// Dates in `[start, end]`.
pub fn inclusive_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
