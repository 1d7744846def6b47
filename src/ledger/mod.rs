//! Attendance ledger: check-in/check-out rules and the attendance listing.
//!
//! A user gets one attendance record per UTC calendar day. Check-in creates
//! it, check-out closes it, and nothing touches it afterwards. Both writes run
//! under a per-user lock so the read that guards them and the write itself
//! are observed as one step by other calls for the same user.

pub mod clock;
pub mod error;
pub mod locks;
#[cfg(test)]
pub mod memory;
pub mod query;
pub mod store;

use std::sync::Arc;

use tracing::info;

use crate::model::attendance::{AttendanceRecord, AttendanceView, CheckOutStamp, GeoPoint};
use crate::registry::Directory;
use clock::{Clock, IdGen, SystemClock, UuidIdGen};
use error::{LedgerError, Result, StoreError};
use locks::UserLocks;
use query::{AttendanceFilter, AttendancePage};
use store::{RecordCriteria, RecordStore};

/// Shown when a record's principal no longer exists.
pub const UNKNOWN_PRINCIPAL: &str = "Unknown";

/// A check-in or check-out as submitted by the request layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceRequest {
    pub user_id: String,
    pub qr_code_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[cfg(test)]
impl AttendanceRequest {
    pub fn new(user_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            user_id: user_id.into(),
            qr_code_id: None,
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }

    pub fn with_qr_code(mut self, qr_code_id: impl Into<String>) -> Self {
        self.qr_code_id = Some(qr_code_id.into());
        self
    }
}

impl AttendanceRequest {
    fn validate(self) -> Result<(String, Option<String>, GeoPoint)> {
        let user_id = self.user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(LedgerError::invalid("user id is required"));
        }
        let location = GeoPoint::from_parts(self.latitude, self.longitude)
            .ok_or_else(|| LedgerError::invalid("latitude and longitude are required"))?;
        let qr_code_id = self.qr_code_id.filter(|id| !id.trim().is_empty());
        Ok((user_id, qr_code_id, location))
    }
}

pub struct Ledger {
    store: Arc<dyn RecordStore>,
    directory: Arc<dyn Directory>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGen>,
    locks: UserLocks,
}

impl Ledger {
    pub fn new(store: Arc<dyn RecordStore>, directory: Arc<dyn Directory>) -> Self {
        Self::with_parts(store, directory, Arc::new(SystemClock), Arc::new(UuidIdGen))
    }

    pub fn with_parts(
        store: Arc<dyn RecordStore>,
        directory: Arc<dyn Directory>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGen>,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
            ids,
            locks: UserLocks::new(),
        }
    }

    /// Opens today's record for the user.
    ///
    /// Fails with [`LedgerError::DuplicateCheckIn`] if the user already has a
    /// record for the current UTC day, open or closed.
    pub async fn check_in(&self, request: AttendanceRequest) -> Result<AttendanceRecord> {
        let (user_id, qr_code_id, location) = request.validate()?;

        let slot = self.locks.slot(&user_id);
        let _guard = slot.lock().await;

        let now = self.clock.now();
        let today = RecordCriteria::same_day(&user_id, now.date_naive());
        if self.store.count(&today).await? > 0 {
            return Err(LedgerError::DuplicateCheckIn);
        }

        let record = AttendanceRecord {
            id: self.ids.next_id(),
            user_id,
            qr_code_id,
            check_in_at: now,
            check_out_at: None,
            check_in_location: location,
            check_out_location: None,
            created_at: now,
            updated_at: now,
        };

        match self.store.insert(record).await {
            Ok(record) => {
                info!(
                    user_id = %record.user_id,
                    location = %record.check_in_location,
                    "Checked in"
                );
                Ok(record)
            }
            Err(StoreError::Conflict) => Err(LedgerError::DuplicateCheckIn),
            Err(e) => Err(e.into()),
        }
    }

    /// Closes today's open record for the user.
    ///
    /// A QR reference on check-out is accepted but not stored; the record keeps
    /// the one it was opened with.
    pub async fn check_out(&self, request: AttendanceRequest) -> Result<AttendanceRecord> {
        let (user_id, _qr_code_id, location) = request.validate()?;

        let slot = self.locks.slot(&user_id);
        let _guard = slot.lock().await;

        let now = self.clock.now();
        let criteria = RecordCriteria {
            limit: Some(1),
            ..RecordCriteria::same_day(&user_id, now.date_naive()).open()
        };
        let open = self
            .store
            .find_by(&criteria)
            .await?
            .into_iter()
            .next()
            .ok_or(LedgerError::NoOpenCheckIn)?;

        let stamp = CheckOutStamp { at: now, location };
        match self.store.update_in_place(&open.id, stamp).await {
            Ok(record) => {
                info!(
                    user_id = %record.user_id,
                    location = %location,
                    status = %record.status(),
                    "Checked out"
                );
                Ok(record)
            }
            Err(StoreError::Conflict | StoreError::NotFound(_)) => Err(LedgerError::NoOpenCheckIn),
            Err(e) => Err(e.into()),
        }
    }

    /// Filtered, paginated listing in insertion order, joined with each
    /// principal's display name and external id.
    pub async fn query(&self, filter: &AttendanceFilter) -> Result<AttendancePage> {
        let (offset, limit) = filter.window();
        let criteria = RecordCriteria {
            user_id: filter.user_id.clone(),
            checked_in: filter.range(),
            offset,
            limit: Some(limit),
            ..RecordCriteria::default()
        };

        let total = self.store.count(&criteria).await?;
        let page = if limit == 0 || offset as u64 >= total {
            Vec::new()
        } else {
            self.store.find_by(&criteria).await?
        };

        let mut records = Vec::with_capacity(page.len());
        for record in page {
            let (display_name, external_id) =
                match self.directory.lookup_display_info(&record.user_id).await? {
                    Some(info) => (info.display_name, info.external_id),
                    None => (UNKNOWN_PRINCIPAL.to_string(), UNKNOWN_PRINCIPAL.to_string()),
                };
            records.push(AttendanceView::new(record, display_name, external_id));
        }

        Ok(AttendancePage { records, total })
    }
}

#[cfg(test)]
mod tests;
