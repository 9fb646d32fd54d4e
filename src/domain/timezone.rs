//! Time normalization into the exchange calendar zone.
//!
//! Every hour and weekday check runs against US Eastern wall-clock time.
//! Naive timestamps are read as UTC unless [`NaiveTimePolicy::Exchange`] is
//! configured, in which case they are exchange-local and DST gaps/overlaps
//! resolve with the earlier offset.

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use std::fmt;
use std::str::FromStr;

/// The canonical exchange zone.
pub const EXCHANGE_TZ: Tz = chrono_tz::America::New_York;

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A timestamp as read from the source, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInstant {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

/// How to read timestamps that carry no zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NaiveTimePolicy {
    #[default]
    Utc,
    Exchange,
}

impl FromStr for NaiveTimePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utc" => Ok(NaiveTimePolicy::Utc),
            "exchange" | "et" | "eastern" => Ok(NaiveTimePolicy::Exchange),
            other => Err(format!("unknown naive time policy '{other}' (expected utc or exchange)")),
        }
    }
}

impl fmt::Display for NaiveTimePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NaiveTimePolicy::Utc => write!(f, "utc"),
            NaiveTimePolicy::Exchange => write!(f, "exchange"),
        }
    }
}

/// Parse a textual timestamp. Returns `None` if no known layout matches.
pub fn parse_instant(input: &str) -> Option<RawInstant> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(RawInstant::Aware(dt));
    }
    for fmt in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(RawInstant::Aware(dt));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(RawInstant::Naive(dt));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(RawInstant::Naive)
}

/// Express an instant in the exchange zone.
pub fn to_exchange_time(instant: RawInstant, policy: NaiveTimePolicy) -> DateTime<Tz> {
    match (instant, policy) {
        (RawInstant::Aware(dt), _) => dt.with_timezone(&EXCHANGE_TZ),
        (RawInstant::Naive(naive), NaiveTimePolicy::Utc) => {
            Utc.from_utc_datetime(&naive).with_timezone(&EXCHANGE_TZ)
        }
        (RawInstant::Naive(naive), NaiveTimePolicy::Exchange) => localize_exchange(naive),
    }
}

/// Attach the exchange zone to a wall-clock time.
///
/// Fall-back overlaps pick the first occurrence. Spring-forward gaps are read
/// with the offset in force before the transition, which lands one hour later
/// on the wall clock.
pub fn localize_exchange(naive: NaiveDateTime) -> DateTime<Tz> {
    match EXCHANGE_TZ.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let before = EXCHANGE_TZ
                .offset_from_utc_datetime(&(naive - Duration::days(1)))
                .fix();
            let utc = naive - Duration::seconds(i64::from(before.local_minus_utc()));
            EXCHANGE_TZ.from_utc_datetime(&utc)
        }
    }
}
