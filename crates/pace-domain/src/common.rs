//! Money rounding, calendar-month helpers, and file-name labels.

use chrono::{Datelike, NaiveDate};

/// Amounts closer than this are considered equal when comparing currency values.
pub const CURRENCY_EPSILON: f64 = 0.005;

/// Rounds an amount to whole cents.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sums amounts starting from `+0.0`, so an empty set totals zero rather than `-0.0`.
pub fn sum_amounts<I: IntoIterator<Item = f64>>(amounts: I) -> f64 {
    amounts.into_iter().fold(0.0, |total, amount| total + amount)
}

/// Lowercase, dash-separated label for a backup note, safe inside a file name.
pub fn note_slug(note: &str) -> Option<String> {
    let mut slug = String::new();
    for ch in note.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    (!slug.is_empty()).then(|| slug.to_string())
}

/// Returns the number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Builds the date for `day` in the given month, clamping to the month's last day.
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Returns `(year, month)` shifted by `months` calendar months.
pub fn shift_month(year: i32, month: u32, months: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + months;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}
