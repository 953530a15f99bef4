//! Trading calendar trait and date helpers.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};

/// Walk-back bound when searching for the latest trading date.
pub const LATEST_LOOKBACK_DAYS: usize = 31;
/// Walk-back bound when searching for the previous trading date.
pub const PREVIOUS_LOOKBACK_DAYS: usize = 14;

/// Exchange-local wall-clock time. Out-of-range input maps to midnight.
pub fn hhmm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Answers whether the exchange is open on a given date.
pub trait TradingCalendar: Send + Sync {
    fn is_trading_day(&self, date: NaiveDate) -> bool;
}

/// Monday through Friday, minus an explicit holiday list.
#[derive(Debug, Clone, Default)]
pub struct WeekdayCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl WeekdayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

impl TradingCalendar for WeekdayCalendar {
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.holidays.contains(&date)
    }
}

/// Most recent trading date on or before `date`.
///
/// Falls back to the previous weekday if nothing is found in the walk-back window.
pub fn latest_trading_date(calendar: &dyn TradingCalendar, date: NaiveDate) -> NaiveDate {
    let mut cursor = date;
    for _ in 0..LATEST_LOOKBACK_DAYS {
        if calendar.is_trading_day(cursor) {
            return cursor;
        }
        cursor -= Duration::days(1);
    }
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date - Duration::days(2),
        _ => date,
    }
}

/// Most recent trading date strictly before `date`.
pub fn previous_trading_date(calendar: &dyn TradingCalendar, date: NaiveDate) -> NaiveDate {
    let mut cursor = date - Duration::days(1);
    for _ in 0..PREVIOUS_LOOKBACK_DAYS {
        if calendar.is_trading_day(cursor) {
            return cursor;
        }
        cursor -= Duration::days(1);
    }
    latest_trading_date(calendar, date - Duration::days(1))
}

/// Trading dates in `[start, end]`, ascending.
pub fn trading_sessions(
    calendar: &dyn TradingCalendar,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| calendar.is_trading_day(*d))
        .collect()
}
