//! In-memory record store used by the test suites.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::error::StoreError;
use super::store::{RecordCriteria, RecordStore};
use crate::model::attendance::{AttendanceRecord, CheckOutStamp};

pub struct MemoryRecordStore {
    records: RwLock<Vec<AttendanceRecord>>,
    offline: AtomicBool,
    unique_day: bool,
    stamps: AtomicUsize,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::with_records(Vec::new())
    }
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<AttendanceRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            offline: AtomicBool::new(false),
            unique_day: true,
            stamps: AtomicUsize::new(0),
        }
    }

    /// A store with no `(user_id, day)` constraint, so only the ledger's own
    /// locking keeps a user to one record per day.
    pub fn without_unique_day() -> Self {
        Self {
            unique_day: false,
            ..Self::default()
        }
    }

    /// While offline every call fails with a database error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<AttendanceRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of check-out stamps actually written.
    pub fn stamps_applied(&self) -> usize {
        self.stamps.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, StoreError> {
        self.ensure_online()?;
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let day = record.check_in_day();
        if self.unique_day
            && records
                .iter()
                .any(|r| r.user_id == record.user_id && r.check_in_day() == day)
        {
            return Err(StoreError::Conflict);
        }
        records.push(record.clone());
        Ok(record)
    }

    async fn find_by(
        &self,
        criteria: &RecordCriteria,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.ensure_online()?;
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let matching = records
            .iter()
            .filter(|r| criteria.matches(r))
            .skip(criteria.offset)
            .take(criteria.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matching)
    }

    async fn count(&self, criteria: &RecordCriteria) -> Result<u64, StoreError> {
        self.ensure_online()?;
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(records.iter().filter(|r| criteria.matches(r)).count() as u64)
    }

    async fn update_in_place(
        &self,
        id: &str,
        stamp: CheckOutStamp,
    ) -> Result<AttendanceRecord, StoreError> {
        self.ensure_online()?;
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if !record.is_open() {
            return Err(StoreError::Conflict);
        }
        stamp.apply(record);
        self.stamps.fetch_add(1, Ordering::SeqCst);
        Ok(record.clone())
    }
}
