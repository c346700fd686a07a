//! Calendar-aware date arithmetic.
//!
//! A calendar is a weekly work-day bitmask (Monday = bit 0 ... Sunday = bit 6)
//! plus two sparse date sets: exceptions that force a day off, and overtime
//! entries that force a day on. All dates are civil dates without time of day.

use chrono::{Datelike, Days, NaiveDate};
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound::{Excluded, Unbounded};

/// Monday through Friday.
pub const MASK_MON_FRI: u8 = 0b001_1111;

const WEEK_MASK: u8 = 0b111_1111;

/// Hours credited to an overtime day that does not state its own.
pub const DEFAULT_OVERTIME_HOURS: f64 = 8.0;

/// Kind of a dated calendar entry as stored by the planning tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionKind {
    /// Forced working day.
    Overtime,
    /// Holidays, shutdowns and any other non-working marker.
    #[serde(other)]
    NonWorking,
}

/// One dated entry attached to a calendar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarException {
    pub exception_date: NaiveDate,
    pub exception_type: ExceptionKind,
    pub hours_available: Option<f64>,
}

/// Effective work pattern used for every date computation in a run.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[pyo3(get, set)]
    pub work_days_mask: u8,
    /// Dates forced to non-working.
    #[pyo3(get, set)]
    pub exceptions: BTreeSet<NaiveDate>,
    /// Dates forced to working, with the hours available on that day.
    #[pyo3(get, set)]
    pub overtime_dates: BTreeMap<NaiveDate, f64>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            work_days_mask: MASK_MON_FRI,
            exceptions: BTreeSet::new(),
            overtime_dates: BTreeMap::new(),
        }
    }
}

impl CalendarConfig {
    /// Build a calendar from its weekly mask and stored dated entries.
    pub fn from_exceptions(work_days_mask: u8, entries: &[CalendarException]) -> Self {
        let mut calendar = Self {
            work_days_mask,
            ..Self::default()
        };
        for entry in entries {
            match entry.exception_type {
                ExceptionKind::Overtime => {
                    calendar.overtime_dates.insert(
                        entry.exception_date,
                        entry.hours_available.unwrap_or(DEFAULT_OVERTIME_HOURS),
                    );
                }
                ExceptionKind::NonWorking => {
                    calendar.exceptions.insert(entry.exception_date);
                }
            }
        }
        calendar
    }

    /// Dates listed both as exception and as overtime.
    ///
    /// The exception wins on such dates (see [`is_work_day`]).
    pub fn conflicting_dates(&self) -> Vec<NaiveDate> {
        self.overtime_dates
            .keys()
            .filter(|date| self.exceptions.contains(date))
            .copied()
            .collect()
    }

    /// Whether any date strictly after `date` can still be a working day.
    fn has_work_after(&self, date: NaiveDate) -> bool {
        self.work_days_mask & WEEK_MASK != 0
            || self
                .overtime_dates
                .range((Excluded(date), Unbounded))
                .any(|(d, _)| !self.exceptions.contains(d))
    }
}

#[pymethods]
impl CalendarConfig {
    #[new]
    #[pyo3(signature = (work_days_mask=MASK_MON_FRI, exceptions=None, overtime_dates=None))]
    fn new(
        work_days_mask: u8,
        exceptions: Option<BTreeSet<NaiveDate>>,
        overtime_dates: Option<BTreeMap<NaiveDate, f64>>,
    ) -> Self {
        Self {
            work_days_mask,
            exceptions: exceptions.unwrap_or_default(),
            overtime_dates: overtime_dates.unwrap_or_default(),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "CalendarConfig(work_days_mask={:#09b}, exceptions={}, overtime_dates={})",
            self.work_days_mask,
            self.exceptions.len(),
            self.overtime_dates.len()
        )
    }
}

/// Whether `date` is a working day under `calendar`.
///
/// Exceptions are checked before overtime, so a date carrying both is a day off.
pub fn is_work_day(date: NaiveDate, calendar: &CalendarConfig) -> bool {
    if calendar.exceptions.contains(&date) {
        return false;
    }
    if calendar.overtime_dates.contains_key(&date) {
        return true;
    }
    let bit = 1u8 << date.weekday().num_days_from_monday();
    calendar.work_days_mask & bit != 0
}

/// Date of the `days`-th working day strictly after `start`.
///
/// Returns `start` unchanged when `days <= 0`. Walks one calendar day at a time
/// since exceptions and overtime are irregular. A calendar with no working days
/// left stops the walk at the last date reached.
pub fn add_work_days(start: NaiveDate, days: i64, calendar: &CalendarConfig) -> NaiveDate {
    let mut current = start;
    let mut remaining = days;
    while remaining > 0 {
        if !calendar.has_work_after(current) {
            break;
        }
        let Some(next) = current.checked_add_days(Days::new(1)) else {
            break;
        };
        current = next;
        if is_work_day(current, calendar) {
            remaining -= 1;
        }
    }
    current
}

/// Working dates in the half-open range `[start, end)`.
pub fn work_dates(start: NaiveDate, end: NaiveDate, calendar: &CalendarConfig) -> WorkDates<'_> {
    WorkDates {
        cursor: Some(start),
        end,
        calendar,
    }
}

/// Single-pass iterator returned by [`work_dates`], ascending.
#[derive(Clone, Debug)]
pub struct WorkDates<'a> {
    cursor: Option<NaiveDate>,
    end: NaiveDate,
    calendar: &'a CalendarConfig,
}

impl Iterator for WorkDates<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        while let Some(date) = self.cursor {
            if date >= self.end {
                self.cursor = None;
                return None;
            }
            self.cursor = date.checked_add_days(Days::new(1));
            if is_work_day(date, self.calendar) {
                return Some(date);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_default_calendar_is_mon_fri() {
        let cal = CalendarConfig::default();
        // 2024-01-01 is a Monday
        assert!(is_work_day(d(2024, 1, 1), &cal));
        assert!(is_work_day(d(2024, 1, 5), &cal));
        assert!(!is_work_day(d(2024, 1, 6), &cal));
        assert!(!is_work_day(d(2024, 1, 7), &cal));
    }

    #[test]
    fn test_sunday_maps_to_bit_six() {
        let cal = CalendarConfig {
            work_days_mask: 0b100_0000,
            ..Default::default()
        };
        assert!(is_work_day(d(2024, 1, 7), &cal));
        assert!(!is_work_day(d(2024, 1, 6), &cal));
        assert!(!is_work_day(d(2024, 1, 8), &cal));
    }

    #[test]
    fn test_exception_overrides_mask() {
        let mut cal = CalendarConfig::default();
        cal.exceptions.insert(d(2024, 1, 2));
        assert!(!is_work_day(d(2024, 1, 2), &cal));
    }

    #[test]
    fn test_overtime_overrides_mask() {
        let mut cal = CalendarConfig::default();
        cal.overtime_dates.insert(d(2024, 1, 6), 8.0);
        assert!(is_work_day(d(2024, 1, 6), &cal));
        assert_eq!(cal.overtime_dates.get(&d(2024, 1, 6)).copied(), Some(8.0));
        assert_eq!(cal.overtime_dates.get(&d(2024, 1, 7)).copied(), None);
    }

    #[test]
    fn test_exception_checked_before_overtime() {
        let mut cal = CalendarConfig::default();
        cal.exceptions.insert(d(2024, 1, 6));
        cal.overtime_dates.insert(d(2024, 1, 6), 8.0);
        assert!(!is_work_day(d(2024, 1, 6), &cal));
        assert_eq!(cal.conflicting_dates(), vec![d(2024, 1, 6)]);
    }

    #[test]
    fn test_add_zero_or_negative_days() {
        let cal = CalendarConfig::default();
        assert_eq!(add_work_days(d(2024, 1, 6), 0, &cal), d(2024, 1, 6));
        assert_eq!(add_work_days(d(2024, 1, 3), -2, &cal), d(2024, 1, 3));
    }

    #[test]
    fn test_add_work_days_skips_weekend() {
        let cal = CalendarConfig::default();
        // Fri + 1 = Mon
        assert_eq!(add_work_days(d(2024, 1, 5), 1, &cal), d(2024, 1, 8));
        // Mon + 3 = Thu
        assert_eq!(add_work_days(d(2024, 1, 1), 3, &cal), d(2024, 1, 4));
        // Starting on a Saturday still counts strictly after the start
        assert_eq!(add_work_days(d(2024, 1, 6), 1, &cal), d(2024, 1, 8));
    }

    #[test]
    fn test_add_work_days_skips_exceptions() {
        let mut cal = CalendarConfig::default();
        cal.exceptions.insert(d(2024, 1, 2));
        assert_eq!(add_work_days(d(2024, 1, 1), 1, &cal), d(2024, 1, 3));
    }

    #[test]
    fn test_add_work_days_without_working_days_terminates() {
        let cal = CalendarConfig {
            work_days_mask: 0,
            ..Default::default()
        };
        assert_eq!(add_work_days(d(2024, 1, 1), 5, &cal), d(2024, 1, 1));

        let mut cal = cal;
        cal.overtime_dates.insert(d(2024, 1, 10), 4.0);
        assert_eq!(add_work_days(d(2024, 1, 1), 1, &cal), d(2024, 1, 10));
        assert_eq!(add_work_days(d(2024, 1, 1), 2, &cal), d(2024, 1, 10));
    }

    #[test]
    fn test_work_dates_half_open() {
        let cal = CalendarConfig::default();
        let dates: Vec<_> = work_dates(d(2024, 1, 1), d(2024, 1, 4), &cal).collect();
        assert_eq!(dates, vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 3)]);
    }

    #[test]
    fn test_work_dates_skips_non_working_start() {
        let cal = CalendarConfig::default();
        let dates: Vec<_> = work_dates(d(2024, 1, 6), d(2024, 1, 10), &cal).collect();
        assert_eq!(dates, vec![d(2024, 1, 8), d(2024, 1, 9)]);
    }

    #[test]
    fn test_work_dates_empty_range() {
        let cal = CalendarConfig::default();
        assert_eq!(work_dates(d(2024, 1, 2), d(2024, 1, 2), &cal).count(), 0);
        assert_eq!(work_dates(d(2024, 1, 3), d(2024, 1, 2), &cal).count(), 0);
    }

    #[test]
    fn test_overtime_saturday_included() {
        let mut cal = CalendarConfig::default();
        cal.overtime_dates.insert(d(2024, 1, 6), 8.0);
        // Fri 2024-01-05 through Mon 2024-01-08 inclusive
        let dates: Vec<_> = work_dates(d(2024, 1, 5), d(2024, 1, 9), &cal).collect();
        assert_eq!(dates, vec![d(2024, 1, 5), d(2024, 1, 6), d(2024, 1, 8)]);
    }

    #[test]
    fn test_from_exceptions() {
        let entries = vec![
            CalendarException {
                exception_date: d(2024, 1, 1),
                exception_type: ExceptionKind::NonWorking,
                hours_available: None,
            },
            CalendarException {
                exception_date: d(2024, 1, 6),
                exception_type: ExceptionKind::Overtime,
                hours_available: None,
            },
            CalendarException {
                exception_date: d(2024, 1, 13),
                exception_type: ExceptionKind::Overtime,
                hours_available: Some(4.0),
            },
        ];
        let cal = CalendarConfig::from_exceptions(MASK_MON_FRI, &entries);
        assert!(cal.exceptions.contains(&d(2024, 1, 1)));
        assert_eq!(
            cal.overtime_dates.get(&d(2024, 1, 6)).copied(),
            Some(DEFAULT_OVERTIME_HOURS)
        );
        assert_eq!(cal.overtime_dates.get(&d(2024, 1, 13)).copied(), Some(4.0));
        assert!(cal.conflicting_dates().is_empty());
    }

    #[test]
    fn test_exception_kind_deserializes_unknown_as_non_working() {
        let entry: CalendarException = serde_json::from_str(
            r#"{"exception_date": "2024-12-25", "exception_type": "holiday", "hours_available": null}"#,
        )
        .unwrap();
        assert_eq!(entry.exception_type, ExceptionKind::NonWorking);

        let entry: CalendarException = serde_json::from_str(
            r#"{"exception_date": "2024-12-28", "exception_type": "overtime", "hours_available": 6}"#,
        )
        .unwrap();
        assert_eq!(entry.exception_type, ExceptionKind::Overtime);
        assert_eq!(entry.hours_available, Some(6.0));
    }
}
