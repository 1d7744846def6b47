use std::ops::Bound;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::error::LedgerError;
use crate::model::attendance::AttendanceView;

pub const DEFAULT_LIMIT: i64 = 10;

/// One end of a check-in date range: a whole UTC day or an exact instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Day(NaiveDate),
    Instant(DateTime<Utc>),
}

impl FromStr for DateBound {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(DateBound::Day(day));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|t| DateBound::Instant(t.with_timezone(&Utc)))
            .map_err(|_| LedgerError::invalid(format!("unrecognized date '{s}'")))
    }
}

impl DateBound {
    /// Inclusive lower bound: a day starts at its UTC midnight.
    pub fn lower(self) -> Bound<DateTime<Utc>> {
        match self {
            DateBound::Day(day) => Bound::Included(start_of(day)),
            DateBound::Instant(at) => Bound::Included(at),
        }
    }

    /// Inclusive upper bound: a day runs through its last instant.
    pub fn upper(self) -> Bound<DateTime<Utc>> {
        match self {
            DateBound::Day(day) => match day.checked_add_days(Days::new(1)) {
                Some(next) => Bound::Excluded(start_of(next)),
                None => Bound::Unbounded,
            },
            DateBound::Instant(at) => Bound::Included(at),
        }
    }
}

fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceFilter {
    pub user_id: Option<String>,
    pub start_date: Option<DateBound>,
    pub end_date: Option<DateBound>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for AttendanceFilter {
    fn default() -> Self {
        Self {
            user_id: None,
            start_date: None,
            end_date: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl AttendanceFilter {
    /// Parses the raw query-string shape; blank strings count as absent.
    pub fn parse(
        user_id: Option<String>,
        start_date: Option<&str>,
        end_date: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Self, LedgerError> {
        let bound = |raw: Option<&str>| -> Result<Option<DateBound>, LedgerError> {
            match raw.map(str::trim).filter(|s| !s.is_empty()) {
                Some(s) => s.parse().map(Some),
                None => Ok(None),
            }
        };

        Ok(Self {
            user_id: user_id.filter(|u| !u.trim().is_empty()),
            start_date: bound(start_date)?,
            end_date: bound(end_date)?,
            limit: limit.unwrap_or(DEFAULT_LIMIT),
            offset: offset.unwrap_or(0),
        })
    }

    pub fn range(&self) -> (Bound<DateTime<Utc>>, Bound<DateTime<Utc>>) {
        (
            self.start_date.map_or(Bound::Unbounded, DateBound::lower),
            self.end_date.map_or(Bound::Unbounded, DateBound::upper),
        )
    }

    /// Negative values clamp to zero.
    pub fn window(&self) -> (usize, usize) {
        (clamp(self.offset), clamp(self.limit))
    }
}

fn clamp(value: i64) -> usize {
    usize::try_from(value.max(0)).unwrap_or(usize::MAX)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendancePage {
    pub records: Vec<AttendanceView>,
    /// Matches before pagination.
    pub total: u64,
}
