//! Day-in-period arithmetic and period-boundary derivation from a pay schedule.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use pace_domain::{clamped_date, shift_month, PaycheckFrequency, UserPreferences};

use crate::CoreError;

/// Local hour at which an elapsed period is considered over.
pub const ROLLOVER_REFERENCE_HOUR: u32 = 6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Inclusive start/end dates of a derived period.
pub struct PeriodBounds {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub period_length: u32,
}

impl PeriodBounds {
    fn from_range(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            period_length: ((end_date - start_date).num_days() + 1).max(1) as u32,
        }
    }
}

/// One-based day of the period that `today` falls on, clamped to `[1, period_length]`.
pub fn day_in_period(start_date: NaiveDate, period_length: u32, today: NaiveDate) -> u32 {
    let elapsed = (today - start_date).num_days() + 1;
    elapsed.min(period_length.max(1) as i64).max(1) as u32
}

/// True once `now` is `period_length` or more whole days past `start_date` at the reference hour.
pub fn is_period_ended(
    start_date: NaiveDate,
    period_length: u32,
    now: NaiveDateTime,
    reference_hour: u32,
) -> bool {
    let reference_time = NaiveTime::from_hms_opt(reference_hour.min(23), 0, 0).unwrap_or_default();
    let reference = start_date.and_time(reference_time);
    let elapsed_days = (now - reference).num_days();
    elapsed_days >= period_length as i64
}

/// Derives the period that follows one ending on `current_period_end`.
pub fn next_period_bounds(
    preferences: &UserPreferences,
    current_period_end: NaiveDate,
) -> Result<PeriodBounds, CoreError> {
    let start_date = current_period_end
        .succ_opt()
        .ok_or_else(|| CoreError::Validation("period end is out of calendar range".into()))?;

    let end_date = match preferences.paycheck_frequency {
        PaycheckFrequency::Weekly => start_date + Duration::days(6),
        PaycheckFrequency::Biweekly => start_date + Duration::days(13),
        PaycheckFrequency::Monthly => {
            let anchor = monthly_anchor(preferences)?;
            day_before(next_anchor_after(start_date, &[anchor])?)?
        }
        PaycheckFrequency::Semimonthly => {
            let anchors = semi_monthly_anchors(preferences)?;
            day_before(next_anchor_after(start_date, &anchors)?)?
        }
    };

    Ok(PeriodBounds::from_range(start_date, end_date))
}

/// Bounds of the very first period configured in the preferences.
pub fn first_period_bounds(preferences: &UserPreferences) -> PeriodBounds {
    let length = preferences.first_period_length.max(1);
    let start = preferences.first_period_start;
    PeriodBounds::from_range(start, start + Duration::days(length as i64 - 1))
}

/// Earliest date strictly after `after` that lands on one of `anchor_days`.
///
/// Anchor days past a month's end resolve to that month's last day.
pub fn next_anchor_after(after: NaiveDate, anchor_days: &[u32]) -> Result<NaiveDate, CoreError> {
    let mut days = anchor_days.to_vec();
    days.sort_unstable();
    for offset in 0..=2 {
        let (year, month) = shift_month(after.year(), after.month(), offset);
        for day in &days {
            let candidate = clamped_date(year, month, *day).ok_or_else(|| {
                CoreError::Validation(format!("no valid date for day {day} in {year}-{month:02}"))
            })?;
            if candidate > after {
                return Ok(candidate);
            }
        }
    }
    Err(CoreError::Configuration("pay schedule has no anchor day".into()))
}

fn monthly_anchor(preferences: &UserPreferences) -> Result<u32, CoreError> {
    let day = preferences
        .monthly_pay_day
        .unwrap_or_else(|| preferences.next_payday.day());
    validate_anchor_day(day)?;
    Ok(day)
}

fn semi_monthly_anchors(preferences: &UserPreferences) -> Result<[u32; 2], CoreError> {
    let mut days = preferences.semi_monthly_pay_days.ok_or_else(|| {
        CoreError::Configuration("semi-monthly schedule requires two pay days".into())
    })?;
    for day in days {
        validate_anchor_day(day)?;
    }
    days.sort_unstable();
    Ok(days)
}

fn validate_anchor_day(day: u32) -> Result<(), CoreError> {
    if (1..=31).contains(&day) {
        Ok(())
    } else {
        Err(CoreError::Configuration(format!(
            "pay day {day} is outside 1-31"
        )))
    }
}

fn day_before(date: NaiveDate) -> Result<NaiveDate, CoreError> {
    date.pred_opt()
        .ok_or_else(|| CoreError::Validation("date is out of calendar range".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn prefs(frequency: PaycheckFrequency, payday: NaiveDate) -> UserPreferences {
        UserPreferences::new(frequency, payday, 2000.0)
    }

    #[test]
    fn day_in_period_starts_at_one() {
        assert_eq!(day_in_period(date(2025, 1, 1), 14, date(2025, 1, 1)), 1);
        assert_eq!(day_in_period(date(2025, 1, 1), 14, date(2025, 1, 5)), 5);
    }

    #[test]
    fn day_in_period_is_clamped() {
        assert_eq!(day_in_period(date(2025, 1, 1), 14, date(2025, 3, 1)), 14);
        assert_eq!(day_in_period(date(2025, 1, 10), 14, date(2025, 1, 1)), 1);
    }

    #[test]
    fn period_ends_at_reference_hour() {
        let start = date(2025, 1, 1);
        let before = date(2025, 1, 15).and_hms_opt(5, 59, 0).unwrap();
        let after = date(2025, 1, 15).and_hms_opt(6, 0, 0).unwrap();
        assert!(!is_period_ended(start, 14, before, ROLLOVER_REFERENCE_HOUR));
        assert!(is_period_ended(start, 14, after, ROLLOVER_REFERENCE_HOUR));
    }

    #[test]
    fn weekly_and_biweekly_use_fixed_lengths() {
        let weekly = next_period_bounds(
            &prefs(PaycheckFrequency::Weekly, date(2025, 1, 3)),
            date(2025, 1, 9),
        )
        .unwrap();
        assert_eq!(weekly.start_date, date(2025, 1, 10));
        assert_eq!(weekly.end_date, date(2025, 1, 16));
        assert_eq!(weekly.period_length, 7);

        let biweekly = next_period_bounds(
            &prefs(PaycheckFrequency::Biweekly, date(2025, 1, 3)),
            date(2025, 1, 9),
        )
        .unwrap();
        assert_eq!(biweekly.end_date, date(2025, 1, 23));
        assert_eq!(biweekly.period_length, 14);
    }

    #[test]
    fn monthly_rolls_to_following_month_anchor() {
        let preferences = prefs(PaycheckFrequency::Monthly, date(2025, 1, 15));
        let bounds = next_period_bounds(&preferences, date(2025, 1, 19)).unwrap();
        assert_eq!(bounds.start_date, date(2025, 1, 20));
        assert_eq!(bounds.end_date, date(2025, 2, 14));
    }

    #[test]
    fn monthly_anchor_on_start_day_spans_full_month() {
        let preferences = prefs(PaycheckFrequency::Monthly, date(2025, 1, 15));
        let bounds = next_period_bounds(&preferences, date(2025, 1, 14)).unwrap();
        assert_eq!(bounds.start_date, date(2025, 1, 15));
        assert_eq!(bounds.end_date, date(2025, 2, 14));
        assert_eq!(bounds.period_length, 31);
    }

    #[test]
    fn semi_monthly_sorts_and_clamps_anchor_days() {
        let mut preferences = prefs(PaycheckFrequency::Semimonthly, date(2025, 2, 15));
        preferences.semi_monthly_pay_days = Some([31, 15]);

        let bounds = next_period_bounds(&preferences, date(2025, 2, 14)).unwrap();
        assert_eq!(bounds.start_date, date(2025, 2, 15));
        assert_eq!(bounds.end_date, date(2025, 2, 27));

        let following = next_period_bounds(&preferences, bounds.end_date).unwrap();
        assert_eq!(following.start_date, date(2025, 2, 28));
        assert_eq!(following.end_date, date(2025, 3, 14));
    }

    #[test]
    fn semi_monthly_without_pay_days_is_configuration_error() {
        let preferences = prefs(PaycheckFrequency::Semimonthly, date(2025, 2, 15));
        let err = next_period_bounds(&preferences, date(2025, 2, 14))
            .expect_err("semi-monthly requires pay days");
        assert!(matches!(err, CoreError::Configuration(_)), "unexpected: {err:?}");
    }

    #[test]
    fn first_period_uses_configured_length() {
        let mut preferences = prefs(PaycheckFrequency::Biweekly, date(2025, 1, 3));
        preferences.first_period_start = date(2025, 1, 1);
        preferences.first_period_length = 10;
        let bounds = first_period_bounds(&preferences);
        assert_eq!(bounds.end_date, date(2025, 1, 10));
        assert_eq!(bounds.period_length, 10);
    }
}
