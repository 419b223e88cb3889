//! Settlement period windows.
//!
//! A period (year, month) closes on the configured cutoff day, clamped to
//! the month's length. The window opens the day after the previous
//! period's close and both bounds are inclusive epoch milliseconds.

use chrono::{Datelike, NaiveDate};

use crate::error::{AppError, AppResult};

/// Inclusive `[start, end]` window for a settlement period.
pub fn cutoff_window(year: i64, month: i64, cutoff_day: u32) -> AppResult<(i64, i64)> {
    if !(1..=12).contains(&month) {
        return Err(AppError::InvalidArgument(format!(
            "month must be in 1..=12, got {month}"
        )));
    }
    if !(1970..=9999).contains(&year) {
        return Err(AppError::InvalidArgument(format!("invalid year {year}")));
    }
    let year = year as i32;
    let month = month as u32;

    let close = close_date(year, month, cutoff_day);
    let (prev_year, prev_month) = if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    };
    let prev_close = close_date(prev_year, prev_month, cutoff_day);
    let open = prev_close.succ_opt().unwrap_or(prev_close);

    let start = open
        .and_hms_milli_opt(0, 0, 0, 0)
        .unwrap_or_default()
        .and_utc()
        .timestamp_millis();
    let end = close
        .and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_default()
        .and_utc()
        .timestamp_millis();
    Ok((start, end))
}

fn close_date(year: i32, month: u32, cutoff_day: u32) -> NaiveDate {
    let day = cutoff_day.clamp(1, days_in_month(year, month));
    // Day is clamped to the month, so this cannot fail.
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default();
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .unwrap_or_default();
    next.signed_duration_since(first).num_days() as u32
}

/// Canonical "YYYY-MM" label used as the wallet transaction reference.
pub fn period_label(year: i64, month: i64) -> String {
    format!("{year:04}-{month:02}")
}
