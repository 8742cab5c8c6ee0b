//! Monthly billing period calculation.
//!
//! Periods are calendar months in UTC. Using the host's local time zone would
//! make period flips depend on how the instance clock is configured.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

/// A half-open monthly window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BillingPeriod {
    /// True if `now` falls inside the window
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now < self.end
    }
}

/// Computes the billing period containing `now`
///
/// `start` is the first instant of the current UTC month and `end` the first
/// instant of the next one.
pub fn compute_billing_period(now: DateTime<Utc>) -> BillingPeriod {
    let (year, month) = (now.year(), now.month());
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    BillingPeriod {
        start: first_instant_of_month(year, month),
        end: first_instant_of_month(next_year, next_month),
    }
}

fn first_instant_of_month(year: i32, month: u32) -> DateTime<Utc> {
    // Day 1 at midnight exists for every valid year/month pair
    let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN);
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}
