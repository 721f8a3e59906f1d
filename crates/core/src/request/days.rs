//! Working-day arithmetic for leave requests.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::request::error::RequestError;

/// Longest request, in calendar days.
pub const MAX_REQUEST_SPAN_DAYS: i64 = 366;

/// Length of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCount {
    /// Working days, in half-day steps.
    pub total_days: Decimal,
    /// `total_days * hours_per_day`.
    pub total_hours: Decimal,
}

/// True for Monday through Friday.
#[must_use]
pub fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Counts the working days of `start..=end`.
///
/// A half-day flag removes half of its boundary day when that day is a
/// working day. A single-day request with either flag counts as half a day.
///
/// # Errors
///
/// Returns `InvalidDateRange` when `start > end` or the range holds no
/// working time, and `RangeTooLong` past `MAX_REQUEST_SPAN_DAYS`.
pub fn count_days(
    start: NaiveDate,
    end: NaiveDate,
    start_half: bool,
    end_half: bool,
    hours_per_day: Decimal,
) -> Result<DayCount, RequestError> {
    if start > end {
        return Err(RequestError::InvalidDateRange(format!(
            "start {start} is after end {end}"
        )));
    }
    let span = (end - start).num_days() + 1;
    if span > MAX_REQUEST_SPAN_DAYS {
        return Err(RequestError::RangeTooLong {
            days: span,
            max: MAX_REQUEST_SPAN_DAYS,
        });
    }

    let half = Decimal::new(5, 1);
    let total_days = if start == end {
        match (is_working_day(start), start_half || end_half) {
            (false, _) => Decimal::ZERO,
            (true, true) => half,
            (true, false) => Decimal::ONE,
        }
    } else {
        let working = start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| is_working_day(*d))
            .count();
        let mut days = Decimal::from(working);
        if start_half && is_working_day(start) {
            days -= half;
        }
        if end_half && is_working_day(end) {
            days -= half;
        }
        days
    };

    if total_days <= Decimal::ZERO {
        return Err(RequestError::InvalidDateRange(format!(
            "{start}..={end} contains no working days"
        )));
    }

    Ok(DayCount {
        total_days,
        total_hours: total_days * hours_per_day,
    })
}
