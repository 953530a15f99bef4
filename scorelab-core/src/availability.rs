//! Which strategies can be served for a date, given the current time.
//!
//! Availability is a lookup in a fixed table keyed by the requested date's
//! relation to today and, for today, the time-of-day bucket:
//!
//! | slot                  | available                    | default   |
//! |-----------------------|------------------------------|-----------|
//! | past trading day      | premarket, close             | close     |
//! | today, before 08:00   | none                         | none      |
//! | today, 08:00–09:05    | premarket                    | premarket |
//! | today, 09:05–15:00    | premarket, intraday          | intraday  |
//! | today, 15:00–15:20    | premarket, intraday, close   | intraday  |
//! | today, 15:20–15:30    | premarket, close             | close     |
//! | today, from 15:30     | premarket, close             | close     |
//!
//! Future dates and non-trading days are errors.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::{hhmm, previous_trading_date, TradingCalendar};
use crate::domain::{StrategyContext, StrategyKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvailabilityError {
    #[error("requested date {date} is in the future")]
    DateInFuture { date: NaiveDate },

    #[error("requested date {date} is not a trading day")]
    NonTradingDay { date: NaiveDate },

    #[error("no strategy is available on {date} at this time")]
    NoStrategyAvailable { date: NaiveDate },

    #[error("strategy '{strategy}' is not available on {date} (available: {available})")]
    StrategyNotAvailable {
        strategy: StrategyKind,
        date: NaiveDate,
        available: String,
    },
}

/// Time-of-day bucket for requests about today's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeBucket {
    BeforePremarket,
    Premarket,
    Session,
    CloseWindow,
    PostSession,
    AfterClose,
}

impl TimeBucket {
    pub fn of(time: NaiveTime) -> Self {
        if time < hhmm(8, 0) {
            TimeBucket::BeforePremarket
        } else if time < hhmm(9, 5) {
            TimeBucket::Premarket
        } else if time < hhmm(15, 0) {
            TimeBucket::Session
        } else if time <= hhmm(15, 20) {
            TimeBucket::CloseWindow
        } else if time < hhmm(15, 30) {
            TimeBucket::PostSession
        } else {
            TimeBucket::AfterClose
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Past,
    Today(TimeBucket),
}

struct Row {
    slot: Slot,
    available: &'static [StrategyKind],
    default: Option<StrategyKind>,
    premarket: &'static str,
    close: &'static str,
    intraday: &'static str,
}

use StrategyKind::{Close, Intraday, Premarket};

const PREMARKET_REPLAY: &str = "Today's premarket result is available as a replay.";
const CLOSE_LATER: &str = "Close strategy opens at 15:00.";
const CLOSE_NOW: &str = "Close strategy is available now.";
const INTRADAY_NOW: &str = "Intraday strategy is available now.";
const INTRADAY_CLOSED: &str = "Intraday strategy closed at 15:20.";

const PAST: Row = Row {
    slot: Slot::Past,
    available: &[Premarket, Close],
    default: Some(Close),
    premarket: "Premarket replay is available for past trading days.",
    close: "Close replay is available for past trading days.",
    intraday: "Intraday strategy is only available during the session (09:05-15:20).",
};

const BEFORE_PREMARKET: Row = Row {
    slot: Slot::Today(TimeBucket::BeforePremarket),
    available: &[],
    default: None,
    premarket: "Premarket strategy opens at 08:00.",
    close: CLOSE_LATER,
    intraday: "Intraday strategy is available from 09:05 to 15:20.",
};

const PREMARKET_OPEN: Row = Row {
    slot: Slot::Today(TimeBucket::Premarket),
    available: &[Premarket],
    default: Some(Premarket),
    premarket: "Premarket strategy is available now.",
    close: CLOSE_LATER,
    intraday: "Intraday strategy opens at 09:05.",
};

const SESSION: Row = Row {
    slot: Slot::Today(TimeBucket::Session),
    available: &[Premarket, Intraday],
    default: Some(Intraday),
    premarket: PREMARKET_REPLAY,
    close: CLOSE_LATER,
    intraday: INTRADAY_NOW,
};

const CLOSE_WINDOW: Row = Row {
    slot: Slot::Today(TimeBucket::CloseWindow),
    available: &[Premarket, Intraday, Close],
    default: Some(Intraday),
    premarket: PREMARKET_REPLAY,
    close: CLOSE_NOW,
    intraday: INTRADAY_NOW,
};

const POST_SESSION: Row = Row {
    slot: Slot::Today(TimeBucket::PostSession),
    available: &[Premarket, Close],
    default: Some(Close),
    premarket: PREMARKET_REPLAY,
    close: CLOSE_NOW,
    intraday: INTRADAY_CLOSED,
};

const AFTER_CLOSE: Row = Row {
    slot: Slot::Today(TimeBucket::AfterClose),
    available: &[Premarket, Close],
    default: Some(Close),
    premarket: PREMARKET_REPLAY,
    close: CLOSE_NOW,
    intraday: INTRADAY_CLOSED,
};

fn row(slot: Slot) -> &'static Row {
    match slot {
        Slot::Past => &PAST,
        Slot::Today(TimeBucket::BeforePremarket) => &BEFORE_PREMARKET,
        Slot::Today(TimeBucket::Premarket) => &PREMARKET_OPEN,
        Slot::Today(TimeBucket::Session) => &SESSION,
        Slot::Today(TimeBucket::CloseWindow) => &CLOSE_WINDOW,
        Slot::Today(TimeBucket::PostSession) => &POST_SESSION,
        Slot::Today(TimeBucket::AfterClose) => &AFTER_CLOSE,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyMessages {
    pub premarket: String,
    pub close: String,
    pub intraday: String,
}

impl StrategyMessages {
    pub fn get(&self, kind: StrategyKind) -> &str {
        match kind {
            Premarket => &self.premarket,
            Close => &self.close,
            Intraday => &self.intraday,
        }
    }
}

/// Strategies servable for a date at a given moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub requested_date: NaiveDate,
    pub now: NaiveDateTime,
    /// `None` for past sessions.
    pub time_bucket: Option<TimeBucket>,
    pub available_strategies: Vec<StrategyKind>,
    pub default_strategy: Option<StrategyKind>,
    pub messages: StrategyMessages,
}

impl Availability {
    pub fn allows(&self, kind: StrategyKind) -> bool {
        self.available_strategies.contains(&kind)
    }
}

/// Look up availability for `requested` (today when `None`) at `now`.
pub fn strategy_availability(
    calendar: &dyn TradingCalendar,
    requested: Option<NaiveDate>,
    now: NaiveDateTime,
) -> Result<Availability, AvailabilityError> {
    let today = now.date();
    let date = requested.unwrap_or(today);
    if date > today {
        return Err(AvailabilityError::DateInFuture { date });
    }
    if !calendar.is_trading_day(date) {
        return Err(AvailabilityError::NonTradingDay { date });
    }

    let time_bucket = (date == today).then(|| TimeBucket::of(now.time()));
    let row = row(time_bucket.map_or(Slot::Past, Slot::Today));
    Ok(Availability {
        requested_date: date,
        now,
        time_bucket,
        available_strategies: row.available.to_vec(),
        default_strategy: row.default,
        messages: StrategyMessages {
            premarket: row.premarket.to_string(),
            close: row.close.to_string(),
            intraday: row.intraday.to_string(),
        },
    })
}

/// How the served strategy was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyReason {
    Explicit(StrategyKind),
    PastDateDefaultClose,
    CurrentSession(StrategyKind),
}

impl fmt::Display for StrategyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyReason::Explicit(kind) => write!(f, "explicit:{kind}"),
            StrategyReason::PastDateDefaultClose => f.write_str("auto:past-date-default-close"),
            StrategyReason::CurrentSession(kind) => write!(f, "auto:current-session-{kind}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStrategy {
    pub context: StrategyContext,
    pub reason: StrategyReason,
    pub availability: Availability,
}

/// Pick the strategy for a request and build its context.
///
/// Without an explicit strategy the slot's default is used. Premarket
/// contexts take the previous trading date as their signal date.
pub fn resolve_strategy_context(
    calendar: &dyn TradingCalendar,
    requested: Option<StrategyKind>,
    date: Option<NaiveDate>,
    now: NaiveDateTime,
) -> Result<ResolvedStrategy, AvailabilityError> {
    let availability = strategy_availability(calendar, date, now)?;
    let session = availability.requested_date;
    let kind = requested
        .or(availability.default_strategy)
        .ok_or(AvailabilityError::NoStrategyAvailable { date: session })?;

    if !availability.allows(kind) {
        let available = if availability.available_strategies.is_empty() {
            "none".to_string()
        } else {
            availability
                .available_strategies
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        return Err(AvailabilityError::StrategyNotAvailable {
            strategy: kind,
            date: session,
            available,
        });
    }

    let context = match kind {
        Premarket => StrategyContext::premarket(session, previous_trading_date(calendar, session)),
        other => StrategyContext::same_day(other, session),
    };
    let reason = match requested {
        Some(kind) => StrategyReason::Explicit(kind),
        None if session < now.date() => StrategyReason::PastDateDefaultClose,
        None => StrategyReason::CurrentSession(kind),
    };
    Ok(ResolvedStrategy {
        context,
        reason,
        availability,
    })
}
