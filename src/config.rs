use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};

const SECONDS_PER_HOUR: i32 = 3_600;

/// civil calendar anchored to the business timezone
///
/// All date-only comparisons in the engine go through this type, so a loan
/// booked at 23:30 UTC lands on the correct local day. The offset is fixed
/// (the reference deployment runs in UTC-5, which has no DST).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessCalendar {
    offset: FixedOffset,
}

impl BusinessCalendar {
    /// calendar at a fixed offset west of UTC, e.g. 5 for UTC-5
    pub fn utc_minus(hours: i32) -> Self {
        Self {
            offset: FixedOffset::west_opt(hours * SECONDS_PER_HOUR)
                .expect("offset within +/-24h"),
        }
    }

    /// calendar at a fixed offset east of UTC
    pub fn utc_plus(hours: i32) -> Self {
        Self {
            offset: FixedOffset::east_opt(hours * SECONDS_PER_HOUR)
                .expect("offset within +/-24h"),
        }
    }

    /// civil date of an instant, time-of-day stripped
    pub fn civil_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// civil date of the injected now
    pub fn today(&self, time: &SafeTimeProvider) -> NaiveDate {
        self.civil_date(time.now())
    }

    /// signed count of civil days from `from` to `to`
    pub fn days_between(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        (to - from).num_days()
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self::utc_minus(5)
    }
}

/// loan creation rule bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub min_principal: Money,
    pub max_principal: Money,
    pub rate_floor: Rate,
    pub min_term: u32,
    pub max_term: u32,
    /// principal at or above this requires declaration acceptance
    pub declaration_threshold: Money,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_principal: Money::from_major(300),
            max_principal: Money::from_major(200_000),
            rate_floor: Rate::from_decimal(dec!(0.10)),
            min_term: 6,
            max_term: 60,
            declaration_threshold: Money::from_major(5_350),
        }
    }
}

/// statement rendering options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementOptions {
    pub title: String,
    /// prefix for every monetary cell, e.g. "S/"
    pub currency_prefix: String,
}

impl Default for StatementOptions {
    fn default() -> Self {
        Self {
            title: "Payment Schedule".to_string(),
            currency_prefix: "S/".to_string(),
        }
    }
}

/// engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub policy: PolicyConfig,
    pub calendar: BusinessCalendar,
    pub statement: StatementOptions,
}
