use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::common::error::StaffingError;

/// Inclusive range of days. A missing end means the period never ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    start: NaiveDate,
    end: Option<NaiveDate>,
}

impl Period {
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Result<Self, StaffingError> {
        match end {
            Some(end) if end < start => Err(StaffingError::InvalidPeriod { start, end }),
            _ => Ok(Period { start, end }),
        }
    }

    pub fn open(start: NaiveDate) -> Self {
        Period { start, end: None }
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Period {
            start: date,
            end: Some(date),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.is_none_or(|end| date <= end)
    }

    pub fn overlaps(&self, other: &Period) -> bool {
        self.intersect(other).is_some()
    }

    /// Is the other period completely inside this one?
    pub fn covers(&self, other: &Period) -> bool {
        other.start >= self.start
            && match (self.end, other.end) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(end), Some(other_end)) => other_end <= end,
            }
    }

    pub fn intersect(&self, other: &Period) -> Option<Period> {
        let start = self.start.max(other.start);
        let end = match (self.end, other.end) {
            (None, None) => None,
            (Some(end), None) | (None, Some(end)) => Some(end),
            (Some(a), Some(b)) => Some(a.min(b)),
        };
        match end {
            Some(end) if end < start => None,
            _ => Some(Period { start, end }),
        }
    }

    /// Number of days in the period, `None` for open periods.
    pub fn days(&self) -> Option<u64> {
        self.end
            .map(|end| (end - self.start).num_days() as u64 + 1)
    }

    /// Did the period end strictly before `date`? Open periods never do.
    pub fn ends_before(&self, date: NaiveDate) -> bool {
        self.end.is_some_and(|end| end < date)
    }

    /// First day after the period, `None` for open periods.
    pub fn day_after_end(&self) -> Option<NaiveDate> {
        self.end.and_then(|end| end.checked_add_days(Days::new(1)))
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.end {
            Some(end) => write!(f, "{} .. {}", self.start, end),
            None => write!(f, "{} ..", self.start),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    pub fn period(start: &str, end: Option<&str>) -> Period {
        Period::new(date(start), end.map(date)).unwrap()
    }

    #[test]
    fn test_period_rejects_reversed_range() {
        assert!(Period::new(date("2024-02-01"), Some(date("2024-01-31"))).is_err());
        assert!(Period::new(date("2024-02-01"), Some(date("2024-02-01"))).is_ok());
    }

    #[test]
    fn test_period_contains() {
        let p = period("2024-01-10", Some("2024-01-20"));
        assert!(p.contains(date("2024-01-10")));
        assert!(p.contains(date("2024-01-20")));
        assert!(!p.contains(date("2024-01-21")));
        assert!(!p.contains(date("2024-01-09")));
        assert!(period("2024-01-10", None).contains(date("2099-01-01")));
    }

    #[test]
    fn test_adjacent_periods_do_not_overlap() {
        let a = period("2024-01-01", Some("2024-01-31"));
        let b = period("2024-02-01", None);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&period("2024-01-31", Some("2024-03-01"))));
    }

    #[test]
    fn test_period_intersect() {
        let a = period("2024-01-01", None);
        let b = period("2023-06-01", Some("2024-03-01"));
        assert_eq!(a.intersect(&b), Some(period("2024-01-01", Some("2024-03-01"))));
        assert_eq!(a.intersect(&period("2024-05-01", None)), Some(period("2024-05-01", None)));
    }

    #[test]
    fn test_period_covers() {
        let project = period("2024-01-01", Some("2024-12-31"));
        assert!(project.covers(&period("2024-02-01", Some("2024-03-01"))));
        assert!(!project.covers(&period("2024-02-01", None)));
        assert!(period("2024-01-01", None).covers(&period("2024-02-01", None)));
    }

    #[test]
    fn test_period_days() {
        assert_eq!(period("2024-02-01", Some("2024-02-29")).days(), Some(29));
        assert_eq!(period("2024-02-01", None).days(), None);
        assert_eq!(Period::single_day(date("2024-02-01")).days(), Some(1));
    }

    #[test]
    fn test_single_day() {
        let day = Period::single_day(date("2024-02-29"));
        assert_eq!(day, period("2024-02-29", Some("2024-02-29")));
        assert!(day.contains(date("2024-02-29")));
        assert!(!day.contains(date("2024-03-01")));
        assert_eq!(day.day_after_end(), Some(date("2024-03-01")));
    }

    #[test]
    fn test_ends_before() {
        let p = period("2024-01-01", Some("2024-01-31"));
        assert!(p.ends_before(date("2024-02-01")));
        assert!(!p.ends_before(date("2024-01-31")));
        assert!(!p.ends_before(date("2023-12-01")));
        assert!(!period("2024-01-01", None).ends_before(date("2099-01-01")));
    }
}
