//! Unit tests for billing period calculation

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use promptmeter::models::compute_billing_period;
use proptest::prelude::*;
use rstest::rstest;

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

// =============================================================================
// Calendar Boundaries
// =============================================================================

#[rstest]
#[case(utc(2025, 1, 15, 12, 0, 0), utc(2025, 1, 1, 0, 0, 0), utc(2025, 2, 1, 0, 0, 0))]
#[case(utc(2024, 2, 29, 23, 59, 59), utc(2024, 2, 1, 0, 0, 0), utc(2024, 3, 1, 0, 0, 0))]
#[case(utc(2025, 12, 31, 23, 59, 59), utc(2025, 12, 1, 0, 0, 0), utc(2026, 1, 1, 0, 0, 0))]
#[case(utc(2026, 1, 1, 0, 0, 0), utc(2026, 1, 1, 0, 0, 0), utc(2026, 2, 1, 0, 0, 0))]
fn test_period_boundaries(
    #[case] now: DateTime<Utc>,
    #[case] start: DateTime<Utc>,
    #[case] end: DateTime<Utc>,
) {
    let period = compute_billing_period(now);
    assert_eq!(period.start, start);
    assert_eq!(period.end, end);
}

#[test]
fn test_first_instant_belongs_to_new_period() {
    let boundary = utc(2025, 5, 1, 0, 0, 0);
    let before = boundary - chrono::Duration::milliseconds(1);

    assert_eq!(compute_billing_period(boundary).start, boundary);
    assert_eq!(compute_billing_period(before).end, boundary);
}

#[test]
fn test_period_is_deterministic() {
    let now = utc(2025, 7, 4, 9, 30, 0);
    assert_eq!(compute_billing_period(now), compute_billing_period(now));
}

#[test]
fn test_services_reexport_same_period() {
    let now = utc(2025, 12, 31, 23, 0, 0);
    let from_services: promptmeter::models::BillingPeriod =
        promptmeter::services::compute_billing_period(now);

    assert_eq!(from_services, compute_billing_period(now));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_period_contains_now(secs in 0i64..4_102_444_800i64) {
        let now = Utc.timestamp_opt(secs, 0).unwrap();
        let period = compute_billing_period(now);

        prop_assert!(period.start <= now);
        prop_assert!(now < period.end);
        prop_assert!(period.contains(now));
    }

    #[test]
    fn prop_period_spans_one_calendar_month(secs in 0i64..4_102_444_800i64) {
        let now = Utc.timestamp_opt(secs, 0).unwrap();
        let period = compute_billing_period(now);

        prop_assert_eq!(period.start.day(), 1);
        prop_assert_eq!(period.start.hour(), 0);
        prop_assert_eq!(period.end.day(), 1);
        prop_assert_eq!(period.end.hour(), 0);

        let days = (period.end - period.start).num_days();
        prop_assert!((28..=31).contains(&days));
    }
}
