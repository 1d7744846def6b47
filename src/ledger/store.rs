use std::ops::Bound;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::error::StoreError;
use crate::model::attendance::{AttendanceRecord, CheckOutStamp};

/// Selection over the attendance collection. Every set field narrows the
/// result; results come back in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordCriteria {
    pub user_id: Option<String>,
    /// UTC calendar day of `check_in_at`.
    pub day: Option<NaiveDate>,
    pub checked_in: (Bound<DateTime<Utc>>, Bound<DateTime<Utc>>),
    pub open_only: bool,
    pub offset: usize,
    /// `None` returns everything from `offset` on. Ignored by `count`.
    pub limit: Option<usize>,
}

impl Default for RecordCriteria {
    fn default() -> Self {
        Self {
            user_id: None,
            day: None,
            checked_in: (Bound::Unbounded, Bound::Unbounded),
            open_only: false,
            offset: 0,
            limit: None,
        }
    }
}

impl RecordCriteria {
    /// All records of `user_id` checked in on `day`.
    pub fn same_day(user_id: &str, day: NaiveDate) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            day: Some(day),
            ..Self::default()
        }
    }

    pub fn open(mut self) -> Self {
        self.open_only = true;
        self
    }

    #[cfg(test)]
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        use std::ops::RangeBounds;

        if let Some(user_id) = &self.user_id {
            if &record.user_id != user_id {
                return false;
            }
        }
        if let Some(day) = self.day {
            if record.check_in_day() != day {
                return false;
            }
        }
        if self.open_only && !record.is_open() {
            return false;
        }
        self.checked_in.contains(&record.check_in_at)
    }
}

/// Durable attendance storage the ledger composes its operations from.
///
/// Implementations must reject a second record for the same
/// `(user_id, check-in day)` with [`StoreError::Conflict`], and must apply a
/// check-out stamp only to a record that is still open.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, StoreError>;

    async fn find_by(
        &self,
        criteria: &RecordCriteria,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn count(&self, criteria: &RecordCriteria) -> Result<u64, StoreError>;

    /// Closes the record `id`. `Conflict` when it is already closed.
    async fn update_in_place(
        &self,
        id: &str,
        stamp: CheckOutStamp,
    ) -> Result<AttendanceRecord, StoreError>;
}
