//! Doubling-interval scheduling policy.
//!
//! Each question carries a spacing interval in days:
//! - Remembered: the interval doubles, capped at 60 days
//! - Forgotten: the interval drops back to 3 days
//! - The next review lands `interval` days after the review date
//! - Intervals always stay within [3, 60]

use super::question::INITIAL_INTERVAL_DAYS;
use chrono::{Days, NaiveDate};

pub const MIN_INTERVAL_DAYS: u32 = INITIAL_INTERVAL_DAYS;
pub const MAX_INTERVAL_DAYS: u32 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Remembered,
    Forgotten,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NextState {
    pub interval_days: u32,
    pub next_review: NaiveDate,
}

/// Brings an interval from outside the scheduler (imports, hand-edited rows) into range.
pub fn clamp_interval(days: u32) -> u32 {
    days.clamp(MIN_INTERVAL_DAYS, MAX_INTERVAL_DAYS)
}

/// Computes the interval and due date following a review on `today`.
pub fn compute_next_state(current_interval: u32, outcome: Outcome, today: NaiveDate) -> NextState {
    let interval_days = match outcome {
        Outcome::Remembered => clamp_interval(current_interval.saturating_mul(2)),
        Outcome::Forgotten => MIN_INTERVAL_DAYS,
    };

    NextState {
        interval_days,
        next_review: today + Days::new(u64::from(interval_days)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 30).unwrap()
    }

    #[test]
    fn test_clamp_interval() {
        assert_eq!(clamp_interval(0), MIN_INTERVAL_DAYS);
        assert_eq!(clamp_interval(12), 12);
        assert_eq!(clamp_interval(500), MAX_INTERVAL_DAYS);
    }

    #[test]
    fn test_first_review_doubles() {
        let next = compute_next_state(3, Outcome::Remembered, today());
        assert_eq!(next.interval_days, 6);
        assert_eq!(next.next_review, today() + Days::new(6));
    }

    #[test]
    fn test_interval_capped_at_sixty() {
        let next = compute_next_state(48, Outcome::Remembered, today());
        assert_eq!(next.interval_days, 60);
        assert_eq!(next.next_review, today() + Days::new(60));
    }

    #[test]
    fn test_forgotten_resets() {
        let next = compute_next_state(24, Outcome::Forgotten, today());
        assert_eq!(next.interval_days, 3);
        assert_eq!(next.next_review, today() + Days::new(3));
    }

    #[test]
    fn test_remembered_over_full_range() {
        for current in MIN_INTERVAL_DAYS..=MAX_INTERVAL_DAYS {
            let next = compute_next_state(current, Outcome::Remembered, today());
            assert_eq!(next.interval_days, (current * 2).min(MAX_INTERVAL_DAYS));
            assert!(next.interval_days <= MAX_INTERVAL_DAYS);
            assert_eq!(
                next.next_review,
                today() + Days::new(u64::from(next.interval_days))
            );
        }
    }

    #[test]
    fn test_forgotten_over_full_range() {
        for current in MIN_INTERVAL_DAYS..=MAX_INTERVAL_DAYS {
            let next = compute_next_state(current, Outcome::Forgotten, today());
            assert_eq!(next.interval_days, MIN_INTERVAL_DAYS);
        }
    }

    #[test]
    fn test_out_of_range_input_is_clamped() {
        assert_eq!(
            compute_next_state(0, Outcome::Remembered, today()).interval_days,
            MIN_INTERVAL_DAYS
        );
        assert_eq!(
            compute_next_state(u32::MAX, Outcome::Remembered, today()).interval_days,
            MAX_INTERVAL_DAYS
        );
    }

    #[test]
    fn test_crosses_month_boundary() {
        let end_of_month = NaiveDate::from_ymd_opt(2025, 1, 30).unwrap();
        let next = compute_next_state(6, Outcome::Remembered, end_of_month);
        assert_eq!(next.next_review, NaiveDate::from_ymd_opt(2025, 2, 11).unwrap());
    }
}
