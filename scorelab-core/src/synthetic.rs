//! Deterministic synthetic market for demos, benches and tests.
//!
//! Every bar is a pure function of `(master seed, code, date)`: per-symbol
//! and per-day sub-seeds are derived with BLAKE3 and fed to `StdRng`, so any
//! date range can be fetched in any order and always yields the same bars.
//! Log prices follow a drift plus a seasonal cycle plus daily noise.

use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::calendar::{hhmm, TradingCalendar, WeekdayCalendar};
use crate::domain::{Interval, PriceBar};
use crate::provider::{Headline, MarketData, NewsSource, ProviderError};

/// Five-minute bars per session, 09:00 through 15:25.
pub const BARS_PER_SESSION: usize = 78;

const HEADLINES_PER_DAY: i64 = 4;

const TEMPLATES: [&str; 12] = [
    "{} posts record quarterly growth",
    "{} wins new order from global customer",
    "Analysts upgrade {} on strong demand",
    "{} announces partnership with chip designer",
    "{} shares surge on contract approval",
    "{} holds annual shareholder meeting",
    "{} management comments on outlook",
    "{} faces regulatory probe",
    "{} misses estimates as margins decline",
    "Brokers downgrade {} citing weak orders",
    "{} product recall raises risk concerns",
    "{} reports loss on delayed shipments",
];

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Approximately standard normal from a sum of four uniforms.
fn gauss(rng: &mut StdRng) -> f64 {
    let sum: f64 = (0..4).map(|_| rng.gen::<f64>()).sum();
    (sum - 2.0) * 3.0_f64.sqrt()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Shape parameters of one symbol's price path.
#[derive(Debug, Clone, Copy)]
struct Profile {
    base_price: f64,
    annual_drift: f64,
    cycle_amplitude: f64,
    cycle_period: f64,
    cycle_phase: f64,
    daily_noise: f64,
    base_volume: f64,
}

impl Profile {
    fn sample(rng: &mut StdRng, is_index: bool) -> Self {
        Self {
            base_price: if is_index {
                rng.gen_range(1_000.0..5_000.0)
            } else {
                rng.gen_range(5_000.0..200_000.0)
            },
            annual_drift: rng.gen_range(-0.25..0.45),
            cycle_amplitude: rng.gen_range(0.04..0.18),
            cycle_period: rng.gen_range(40.0..160.0),
            cycle_phase: rng.gen_range(0.0..TAU),
            daily_noise: if is_index {
                rng.gen_range(0.004..0.010)
            } else {
                rng.gen_range(0.008..0.022)
            },
            base_volume: if is_index {
                1.0e8
            } else {
                10f64.powf(rng.gen_range(5.0..7.3))
            },
        }
    }
}

/// Seeded provider of daily bars, five-minute bars and headlines.
#[derive(Debug, Clone)]
pub struct SyntheticMarket {
    seed: u64,
    calendar: WeekdayCalendar,
    missing: HashSet<String>,
    listings: HashMap<String, NaiveDate>,
    news_as_of: Option<NaiveDateTime>,
}

impl SyntheticMarket {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            calendar: WeekdayCalendar::new(),
            missing: HashSet::new(),
            listings: HashMap::new(),
            news_as_of: None,
        }
    }

    pub fn with_calendar(mut self, calendar: WeekdayCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Codes that fail with `SymbolNotFound`.
    pub fn with_missing<S: AsRef<str>>(mut self, codes: &[S]) -> Self {
        self.missing.extend(codes.iter().map(|c| c.as_ref().to_string()));
        self
    }

    /// No bars before `date` for `code`.
    pub fn with_listing(mut self, code: &str, date: NaiveDate) -> Self {
        self.listings.insert(code.to_string(), date);
        self
    }

    /// Publish headlines in the two days before `as_of`.
    pub fn with_news_as_of(mut self, as_of: NaiveDateTime) -> Self {
        self.news_as_of = Some(as_of);
        self
    }

    pub fn calendar(&self) -> &WeekdayCalendar {
        &self.calendar
    }

    fn sub_seed(&self, code: &str, tag: &str, index: i64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(code.as_bytes());
        hasher.update(tag.as_bytes());
        hasher.update(&index.to_le_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    fn rng(&self, code: &str, tag: &str, index: i64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(code, tag, index))
    }

    fn profile(&self, code: &str) -> Profile {
        Profile::sample(&mut self.rng(code, "profile", 0), code.starts_with('^'))
    }

    fn is_listed(&self, code: &str, date: NaiveDate) -> bool {
        self.listings.get(code).map_or(true, |&listed| date >= listed)
    }

    /// The daily bar of `code` on `date`, trading day or not.
    pub fn daily_bar(&self, code: &str, date: NaiveDate) -> PriceBar {
        let p = self.profile(code);
        let t = (date - epoch()).num_days();
        let mut rng = self.rng(code, "daily", t);
        let t = t as f64;

        let log_level = p.annual_drift * t / 365.0
            + p.cycle_amplitude * (TAU * t / p.cycle_period + p.cycle_phase).sin()
            + p.daily_noise * gauss(&mut rng);
        let close = p.base_price * log_level.exp();
        let open = close * (p.daily_noise * 0.6 * gauss(&mut rng)).exp();
        let high = open.max(close) * (1.0 + p.daily_noise * 0.8 * rng.gen::<f64>());
        let low = open.min(close) * (1.0 - p.daily_noise * 0.8 * rng.gen::<f64>());
        let volume = (p.base_volume * (0.5 + rng.gen::<f64>())).round();

        PriceBar::daily(date, round2(open), round2(high), round2(low), round2(close), volume)
    }

    /// Five-minute bars walking from the daily open to the daily close.
    pub fn session_bars(&self, code: &str, date: NaiveDate) -> Vec<PriceBar> {
        let day = self.daily_bar(code, date);
        let mut rng = self.rng(code, "5m", (date - epoch()).num_days());
        let span = (day.high - day.low).max(day.close * 0.001);
        let n = BARS_PER_SESSION as f64;
        let mid = (n - 1.0) / 2.0;
        let weights: Vec<f64> = (0..BARS_PER_SESSION)
            .map(|i| 1.0 + 1.5 * ((i as f64 - mid) / mid).powi(2))
            .collect();
        let weight_sum: f64 = weights.iter().sum();

        let mut prev = day.open;
        let mut bars = Vec::with_capacity(BARS_PER_SESSION);
        for (i, weight) in weights.iter().enumerate() {
            let progress = (i + 1) as f64 / n;
            let anchor = day.open + (day.close - day.open) * progress;
            let close = if i + 1 == BARS_PER_SESSION {
                day.close
            } else {
                (anchor + gauss(&mut rng) * span * 0.12).clamp(day.low, day.high)
            };
            let wiggle = span * 0.05 * rng.gen::<f64>();
            let minutes = 5 * i as i64;
            bars.push(PriceBar {
                timestamp: date.and_time(hhmm(9, 0)) + Duration::minutes(minutes),
                open: round2(prev),
                high: round2((prev.max(close) + wiggle).min(day.high)),
                low: round2((prev.min(close) - wiggle).max(day.low)),
                close: round2(close),
                volume: (day.volume * weight / weight_sum).round(),
            });
            prev = close;
        }
        bars
    }
}

impl MarketData for SyntheticMarket {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_history(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        if self.missing.contains(code) {
            return Err(ProviderError::SymbolNotFound {
                symbol: code.to_string(),
            });
        }
        let mut bars = Vec::new();
        let mut date = start;
        while date <= end {
            if self.calendar.is_trading_day(date) && self.is_listed(code, date) {
                match interval {
                    Interval::Daily => bars.push(self.daily_bar(code, date)),
                    Interval::FiveMinute => bars.extend(self.session_bars(code, date)),
                }
            }
            date += Duration::days(1);
        }
        Ok(bars)
    }
}

impl NewsSource for SyntheticMarket {
    fn headlines(&self, code: &str) -> Result<Vec<Headline>, ProviderError> {
        let Some(as_of) = self.news_as_of else {
            return Ok(Vec::new());
        };
        let hours_apart = 24 / HEADLINES_PER_DAY;
        let bucket = (as_of.date() - epoch()).num_days();
        let mut rng = self.rng(code, "news", bucket);
        Ok((1..=2 * HEADLINES_PER_DAY)
            .map(|k| {
                let template = TEMPLATES[rng.gen_range(0..TEMPLATES.len())];
                Headline {
                    title: template.replace("{}", code),
                    published_at: as_of - Duration::hours(k * hours_apart),
                }
            })
            .collect())
    }
}
