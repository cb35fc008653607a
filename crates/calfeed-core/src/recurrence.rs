//! Recurrence rules.
//!
//! A recurrence is read from JSON or built from an iCalendar `RRULE` as a
//! [`RecurrenceRule`], whose fields are all optional so that a broken rule can
//! still be loaded and reported. [`RecurrenceRule::validate`] turns it into a
//! [`RecurrenceSpec`], the only form the expander works with.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a recurrence rule cannot be expanded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecurrenceError {
    #[error("recurrence has no anchor date")]
    MissingAnchorDate,

    #[error("recurrence has no until date")]
    MissingUntilDate,

    #[error("recurrence has no weekday list")]
    MissingWeekdays,

    /// Weekday numbers run from 0 (Sunday) to 6 (Saturday).
    #[error("weekday number {0} is out of range 0..=6")]
    WeekdayOutOfRange(u8),
}

/// Wire form of a recurrence, as stored in `calendar.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    /// First candidate date.
    #[serde(default)]
    pub anchor_date: Option<NaiveDate>,

    /// Last candidate date, inclusive.
    #[serde(default)]
    pub until_date: Option<NaiveDate>,

    /// Weekday numbers, 0=Sunday..6=Saturday.
    #[serde(default)]
    pub weekdays: Option<Vec<u8>>,
}

impl RecurrenceRule {
    /// Creates a complete rule.
    pub fn new(
        anchor_date: NaiveDate,
        until_date: NaiveDate,
        weekdays: impl IntoIterator<Item = u8>,
    ) -> Self {
        Self {
            anchor_date: Some(anchor_date),
            until_date: Some(until_date),
            weekdays: Some(weekdays.into_iter().collect()),
        }
    }

    /// Checks the rule and builds the validated [`RecurrenceSpec`].
    ///
    /// # Errors
    ///
    /// Returns the first missing or out-of-range field.
    pub fn validate(&self) -> Result<RecurrenceSpec, RecurrenceError> {
        let anchor_date = self.anchor_date.ok_or(RecurrenceError::MissingAnchorDate)?;
        let until_date = self.until_date.ok_or(RecurrenceError::MissingUntilDate)?;
        let numbers = self
            .weekdays
            .as_deref()
            .ok_or(RecurrenceError::MissingWeekdays)?;
        let weekdays = WeekdaySet::from_numbers(numbers.iter().copied())?;

        Ok(RecurrenceSpec {
            anchor_date,
            until_date,
            weekdays,
        })
    }
}

/// A validated recurrence: every date in `anchor_date..=until_date` whose
/// weekday is in `weekdays` is an occurrence date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceSpec {
    pub anchor_date: NaiveDate,
    pub until_date: NaiveDate,
    pub weekdays: WeekdaySet,
}

impl RecurrenceSpec {
    /// Returns the candidate dates in ascending order, matching or not.
    ///
    /// Empty when `anchor_date > until_date`.
    pub fn candidate_dates(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let until = self.until_date;
        self.anchor_date.iter_days().take_while(move |date| *date <= until)
    }

    /// Returns the dates that fall on one of the listed weekdays.
    pub fn occurrence_dates(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let weekdays = self.weekdays;
        self.candidate_dates()
            .filter(move |date| weekdays.contains(date.weekday()))
    }
}

/// A set of weekdays stored as a bit mask indexed from Sunday.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// All seven days.
    pub const ALL: Self = Self(0b0111_1111);

    /// Builds a set from weekday numbers (0=Sunday..6=Saturday).
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::WeekdayOutOfRange`] for numbers above 6.
    pub fn from_numbers(numbers: impl IntoIterator<Item = u8>) -> Result<Self, RecurrenceError> {
        numbers.into_iter().try_fold(Self::EMPTY, |set, n| {
            if n > 6 {
                Err(RecurrenceError::WeekdayOutOfRange(n))
            } else {
                Ok(Self(set.0 | 1 << n))
            }
        })
    }

    /// Builds a set from chrono weekdays.
    pub fn from_weekdays(days: impl IntoIterator<Item = Weekday>) -> Self {
        days.into_iter().fold(Self::EMPTY, |set, day| set.with(day))
    }

    /// Returns the set with `day` added.
    #[must_use]
    pub fn with(self, day: Weekday) -> Self {
        Self(self.0 | 1 << day.num_days_from_sunday())
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns the weekday numbers in the set, ascending from Sunday.
    pub fn numbers(&self) -> Vec<u8> {
        (0..7).filter(|n| self.0 & (1 << n) != 0).collect()
    }
}

impl fmt::Debug for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.numbers()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn validate_complete_rule() {
        let rule = RecurrenceRule::new(date(2024, 1, 1), date(2024, 1, 14), [1, 3]);
        let spec = rule.validate().unwrap();

        assert_eq!(spec.anchor_date, date(2024, 1, 1));
        assert_eq!(spec.until_date, date(2024, 1, 14));
        assert!(spec.weekdays.contains(Weekday::Mon));
        assert!(spec.weekdays.contains(Weekday::Wed));
        assert!(!spec.weekdays.contains(Weekday::Sun));
        assert_eq!(spec.weekdays.len(), 2);
    }

    #[test]
    fn validate_reports_missing_fields() {
        let mut rule = RecurrenceRule::new(date(2024, 1, 1), date(2024, 1, 14), [1]);
        rule.weekdays = None;
        assert_eq!(rule.validate(), Err(RecurrenceError::MissingWeekdays));

        rule.until_date = None;
        assert_eq!(rule.validate(), Err(RecurrenceError::MissingUntilDate));

        rule.anchor_date = None;
        assert_eq!(rule.validate(), Err(RecurrenceError::MissingAnchorDate));
    }

    #[test]
    fn validate_rejects_out_of_range_weekday() {
        let rule = RecurrenceRule::new(date(2024, 1, 1), date(2024, 1, 14), [1, 7]);
        assert_eq!(rule.validate(), Err(RecurrenceError::WeekdayOutOfRange(7)));
    }

    #[test]
    fn empty_weekday_list_is_valid() {
        let rule = RecurrenceRule::new(date(2024, 1, 1), date(2024, 1, 14), []);
        let spec = rule.validate().unwrap();
        assert!(spec.weekdays.is_empty());
        assert_eq!(spec.occurrence_dates().count(), 0);
    }

    #[test]
    fn candidate_dates_are_inclusive() {
        let spec = RecurrenceRule::new(date(2024, 2, 27), date(2024, 3, 1), [])
            .validate()
            .unwrap();
        let dates: Vec<_> = spec.candidate_dates().collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 2, 27),
                date(2024, 2, 28),
                date(2024, 2, 29),
                date(2024, 3, 1)
            ]
        );
    }

    #[test]
    fn candidate_dates_empty_when_anchor_after_until() {
        let spec = RecurrenceRule::new(date(2024, 1, 15), date(2024, 1, 14), [0, 1, 2])
            .validate()
            .unwrap();
        assert_eq!(spec.candidate_dates().count(), 0);
    }

    #[test]
    fn occurrence_dates_filter_by_weekday() {
        // 2024-01-01 is a Monday.
        let spec = RecurrenceRule::new(date(2024, 1, 1), date(2024, 1, 14), [1])
            .validate()
            .unwrap();
        let dates: Vec<_> = spec.occurrence_dates().collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 8)]);
    }

    #[test]
    fn weekday_set_numbers_and_debug() {
        let set = WeekdaySet::from_weekdays([Weekday::Sat, Weekday::Sun]);
        assert_eq!(set.numbers(), vec![0, 6]);
        assert_eq!(format!("{:?}", set), "{0, 6}");
        assert_eq!(WeekdaySet::ALL.len(), 7);
    }

    #[test]
    fn rule_json_uses_camel_case() {
        let rule = RecurrenceRule::new(date(2024, 1, 1), date(2024, 1, 14), [1]);
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["anchorDate"], "2024-01-01");
        assert_eq!(json["untilDate"], "2024-01-14");
        assert_eq!(json["weekdays"], serde_json::json!([1]));
    }

    #[test]
    fn rule_json_with_missing_fields_still_loads() {
        let rule: RecurrenceRule = serde_json::from_str(r#"{"anchorDate":"2024-01-01"}"#).unwrap();
        assert_eq!(rule.anchor_date, Some(date(2024, 1, 1)));
        assert!(rule.until_date.is_none());
        assert_eq!(rule.validate(), Err(RecurrenceError::MissingUntilDate));
    }
}
