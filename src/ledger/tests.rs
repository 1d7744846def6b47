use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::clock::testing::{FixedClock, SequentialIdGen};
use super::memory::MemoryRecordStore;
use super::query::{AttendanceFilter, DateBound};
use super::*;
use crate::model::attendance::AttendanceStatus;
use crate::registry::memory::MemoryDirectory;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

struct Fixture {
    ledger: Arc<Ledger>,
    store: Arc<MemoryRecordStore>,
    clock: FixedClock,
}

fn fixture_with(store: MemoryRecordStore) -> Fixture {
    let store = Arc::new(store);
    let clock = FixedClock::new(at(2025, 7, 1, 1, 15));
    let directory = Arc::new(
        MemoryDirectory::default()
            .with("u1", "Budi Santoso", "EMP001")
            .with("u2", "Siti Aminah", "EMP002"),
    );
    let ledger = Ledger::with_parts(
        store.clone(),
        directory,
        Arc::new(clock.clone()),
        Arc::new(SequentialIdGen::new("att")),
    );
    Fixture {
        ledger: Arc::new(ledger),
        store,
        clock,
    }
}

fn fixture() -> Fixture {
    fixture_with(MemoryRecordStore::new())
}

fn jakarta(user: &str) -> AttendanceRequest {
    AttendanceRequest::new(user, -6.2, 106.8)
}

fn seeded(id: &str, user: &str, check_in_at: DateTime<Utc>) -> AttendanceRecord {
    AttendanceRecord {
        id: id.to_string(),
        user_id: user.to_string(),
        qr_code_id: None,
        check_in_at,
        check_out_at: None,
        check_in_location: GeoPoint {
            latitude: -6.208763,
            longitude: 106.845599,
        },
        check_out_location: None,
        created_at: check_in_at,
        updated_at: check_in_at,
    }
}

#[actix_web::test]
async fn check_in_creates_open_record() {
    let f = fixture();

    let record = f
        .ledger
        .check_in(jakarta("u1").with_qr_code("qr1"))
        .await
        .unwrap();

    assert_eq!(record.id, "att-1");
    assert_eq!(record.user_id, "u1");
    assert_eq!(record.qr_code_id.as_deref(), Some("qr1"));
    assert_eq!(record.check_in_at, at(2025, 7, 1, 1, 15));
    assert_eq!(record.check_out_at, None);
    assert_eq!(record.check_out_location, None);
    assert_eq!(record.created_at, record.updated_at);
    assert_eq!(record.status(), AttendanceStatus::Open);
    assert_eq!(f.store.snapshot(), vec![record]);
}

#[actix_web::test]
async fn check_in_rejects_missing_fields() {
    let f = fixture();

    let blank_user = AttendanceRequest::new("  ", -6.2, 106.8);
    assert!(matches!(
        f.ledger.check_in(blank_user).await,
        Err(LedgerError::InvalidInput(_))
    ));

    let no_longitude = AttendanceRequest {
        longitude: None,
        ..jakarta("u1")
    };
    assert!(matches!(
        f.ledger.check_in(no_longitude.clone()).await,
        Err(LedgerError::InvalidInput(_))
    ));
    assert!(matches!(
        f.ledger.check_out(no_longitude).await,
        Err(LedgerError::InvalidInput(_))
    ));
    assert!(f.store.snapshot().is_empty());
}

#[actix_web::test]
async fn second_check_in_same_day_is_duplicate() {
    let f = fixture();
    f.ledger.check_in(jakarta("u1")).await.unwrap();

    f.clock.advance(Duration::hours(3));
    let err = f.ledger.check_in(jakarta("u1")).await.unwrap_err();

    assert!(matches!(err, LedgerError::DuplicateCheckIn));
    assert_eq!(f.store.snapshot().len(), 1);
}

#[actix_web::test]
async fn check_in_after_check_out_same_day_is_duplicate() {
    let f = fixture();
    f.ledger.check_in(jakarta("u1")).await.unwrap();
    f.ledger.check_out(jakarta("u1")).await.unwrap();

    let err = f.ledger.check_in(jakarta("u1")).await.unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateCheckIn));
}

#[actix_web::test]
async fn other_users_are_independent() {
    let f = fixture();
    f.ledger.check_in(jakarta("u1")).await.unwrap();
    f.ledger.check_in(jakarta("u2")).await.unwrap();

    assert_eq!(f.store.snapshot().len(), 2);
}

#[actix_web::test]
async fn new_utc_day_allows_new_check_in() {
    let f = fixture();
    f.clock.set(at(2025, 7, 1, 23, 58));
    f.ledger.check_in(jakarta("u1")).await.unwrap();

    f.clock.advance(Duration::minutes(3));
    let next = f.ledger.check_in(jakarta("u1")).await.unwrap();

    assert_eq!(next.check_in_at, at(2025, 7, 2, 0, 1));
    assert_eq!(f.store.snapshot().len(), 2);
}

#[actix_web::test]
async fn check_out_without_check_in_fails() {
    let f = fixture();

    let err = f.ledger.check_out(jakarta("u1")).await.unwrap_err();
    assert!(matches!(err, LedgerError::NoOpenCheckIn));
}

#[actix_web::test]
async fn yesterdays_open_record_cannot_be_closed_today() {
    let f = fixture();
    f.clock.set(at(2025, 6, 30, 8, 0));
    f.ledger.check_in(jakarta("u1")).await.unwrap();

    f.clock.set(at(2025, 7, 1, 8, 0));
    let err = f.ledger.check_out(jakarta("u1")).await.unwrap_err();

    assert!(matches!(err, LedgerError::NoOpenCheckIn));
    assert!(f.store.snapshot()[0].is_open());
}

#[actix_web::test]
async fn check_out_closes_record_once() {
    let f = fixture();
    f.ledger.check_in(jakarta("u1")).await.unwrap();

    f.clock.advance(Duration::hours(9));
    f.ledger.check_out(jakarta("u1")).await.unwrap();

    f.clock.advance(Duration::minutes(5));
    let err = f.ledger.check_out(jakarta("u1")).await.unwrap_err();

    assert!(matches!(err, LedgerError::NoOpenCheckIn));
    let stored = f.store.snapshot();
    assert_eq!(stored[0].check_out_at, Some(at(2025, 7, 1, 10, 15)));
}

#[actix_web::test]
async fn check_out_only_touches_check_out_fields() {
    let f = fixture();
    let opened = f
        .ledger
        .check_in(AttendanceRequest::new("u1", -6.208763, 106.845599).with_qr_code("qr1"))
        .await
        .unwrap();

    f.clock.advance(Duration::hours(8));
    let closed = f
        .ledger
        .check_out(AttendanceRequest::new("u1", -6.3, 106.9).with_qr_code("qr2"))
        .await
        .unwrap();

    assert_eq!(closed.id, opened.id);
    assert_eq!(closed.user_id, opened.user_id);
    assert_eq!(closed.qr_code_id, opened.qr_code_id);
    assert_eq!(closed.check_in_at, opened.check_in_at);
    assert_eq!(closed.check_in_location, opened.check_in_location);
    assert_eq!(closed.created_at, opened.created_at);

    let now = at(2025, 7, 1, 9, 15);
    assert_eq!(closed.check_out_at, Some(now));
    assert_eq!(
        closed.check_out_location,
        Some(GeoPoint {
            latitude: -6.3,
            longitude: 106.9
        })
    );
    assert_eq!(closed.updated_at, now);
}

#[actix_web::test]
async fn check_in_then_check_out_scenario() {
    let f = fixture();
    f.ledger.check_in(jakarta("u1")).await.unwrap();
    f.clock.advance(Duration::hours(9));
    let record = f.ledger.check_out(jakarta("u1")).await.unwrap();

    assert!(record.check_out_at.is_some());
    assert_eq!(record.status(), AttendanceStatus::Closed);
    assert_eq!(
        record.check_out_location,
        Some(GeoPoint {
            latitude: -6.2,
            longitude: 106.8
        })
    );
}

#[actix_web::test]
async fn storage_failures_are_not_business_failures() {
    let f = fixture();
    f.store.set_offline(true);

    assert!(matches!(
        f.ledger.check_in(jakarta("u1")).await,
        Err(LedgerError::StorageUnavailable(_))
    ));
    assert!(matches!(
        f.ledger.check_out(jakarta("u1")).await,
        Err(LedgerError::StorageUnavailable(_))
    ));
    assert!(matches!(
        f.ledger.query(&AttendanceFilter::default()).await,
        Err(LedgerError::StorageUnavailable(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_check_ins_yield_one_record() {
    // No store constraint here: the per-user lock alone has to hold the line.
    let f = fixture_with(MemoryRecordStore::without_unique_day());

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let ledger = f.ledger.clone();
            tokio::spawn(async move { ledger.check_in(jakarta("u1")).await })
        })
        .collect();

    let mut ok = 0;
    let mut duplicate = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(LedgerError::DuplicateCheckIn) => duplicate += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(duplicate, 15);
    assert_eq!(f.store.snapshot().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn store_constraint_settles_races_between_ledgers() {
    // Two ledgers over one store behave like two server processes.
    let f = fixture();
    let other = Arc::new(Ledger::with_parts(
        f.store.clone(),
        Arc::new(MemoryDirectory::default()),
        Arc::new(f.clock.clone()),
        Arc::new(SequentialIdGen::new("other")),
    ));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let ledger = if i % 2 == 0 {
                f.ledger.clone()
            } else {
                other.clone()
            };
            tokio::spawn(async move { ledger.check_in(jakarta("u1")).await })
        })
        .collect();

    let mut ok = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(LedgerError::DuplicateCheckIn) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(f.store.snapshot().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_check_outs_close_the_record_once() {
    let f = fixture_with(MemoryRecordStore::without_unique_day());
    f.ledger.check_in(jakarta("u1")).await.unwrap();
    f.clock.advance(Duration::hours(8));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let ledger = f.ledger.clone();
            tokio::spawn(async move { ledger.check_out(jakarta("u1")).await })
        })
        .collect();

    let mut ok = 0;
    let mut no_open = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(LedgerError::NoOpenCheckIn) => no_open += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(no_open, 15);
    assert_eq!(f.store.stamps_applied(), 1);
    let records = f.store.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].check_out_at, Some(at(2025, 7, 1, 9, 15)));
    assert_eq!(records[0].updated_at, at(2025, 7, 1, 9, 15));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn check_out_races_between_ledgers_close_once() {
    let f = fixture();
    let other = Arc::new(Ledger::with_parts(
        f.store.clone(),
        Arc::new(MemoryDirectory::default()),
        Arc::new(f.clock.clone()),
        Arc::new(SequentialIdGen::new("other")),
    ));
    f.ledger.check_in(jakarta("u1")).await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let ledger = if i % 2 == 0 {
                f.ledger.clone()
            } else {
                other.clone()
            };
            tokio::spawn(async move { ledger.check_out(jakarta("u1")).await })
        })
        .collect();

    let mut ok = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(LedgerError::NoOpenCheckIn) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(f.store.stamps_applied(), 1);
}

/// Serves every lookup as if the record were still open, like a read taken
/// just before another process closed it.
struct StaleReads(Arc<MemoryRecordStore>);

#[async_trait::async_trait]
impl RecordStore for StaleReads {
    async fn insert(
        &self,
        record: AttendanceRecord,
    ) -> std::result::Result<AttendanceRecord, StoreError> {
        self.0.insert(record).await
    }

    async fn find_by(
        &self,
        criteria: &RecordCriteria,
    ) -> std::result::Result<Vec<AttendanceRecord>, StoreError> {
        let criteria = RecordCriteria {
            open_only: false,
            ..criteria.clone()
        };
        self.0.find_by(&criteria).await
    }

    async fn count(&self, criteria: &RecordCriteria) -> std::result::Result<u64, StoreError> {
        self.0.count(criteria).await
    }

    async fn update_in_place(
        &self,
        id: &str,
        stamp: CheckOutStamp,
    ) -> std::result::Result<AttendanceRecord, StoreError> {
        self.0.update_in_place(id, stamp).await
    }
}

#[actix_web::test]
async fn check_out_losing_to_another_writer_is_no_open_check_in() {
    let f = fixture();
    let stale = Ledger::with_parts(
        Arc::new(StaleReads(f.store.clone())),
        Arc::new(MemoryDirectory::default()),
        Arc::new(f.clock.clone()),
        Arc::new(SequentialIdGen::new("stale")),
    );
    f.ledger.check_in(jakarta("u1")).await.unwrap();
    f.clock.advance(Duration::hours(8));
    let closed = f.ledger.check_out(jakarta("u1")).await.unwrap();

    f.clock.advance(Duration::minutes(5));
    assert!(matches!(
        stale.check_out(jakarta("u1")).await,
        Err(LedgerError::NoOpenCheckIn)
    ));
    assert_eq!(f.store.snapshot(), vec![closed]);
    assert_eq!(f.store.stamps_applied(), 1);
}

#[actix_web::test]
async fn query_paginates_in_insertion_order() {
    let f = fixture_with(MemoryRecordStore::with_records(vec![
        seeded("a", "u1", at(2025, 6, 28, 1, 0)),
        seeded("b", "u1", at(2025, 6, 29, 1, 0)),
        seeded("c", "u1", at(2025, 6, 30, 1, 0)),
    ]));

    let page = f
        .ledger
        .query(&AttendanceFilter {
            limit: 1,
            offset: 1,
            ..AttendanceFilter::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].id, "b");
}

#[actix_web::test]
async fn query_filters_by_date_range() {
    let f = fixture_with(MemoryRecordStore::with_records(vec![
        seeded("1", "u1", at(2025, 6, 30, 1, 15)),
        seeded("2", "u1", at(2025, 7, 1, 3, 0)),
    ]));

    let filter =
        AttendanceFilter::parse(None, Some("2025-07-01"), Some("2025-07-01"), None, None).unwrap();
    let page = f.ledger.query(&filter).await.unwrap();

    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].id, "2");
}

#[actix_web::test]
async fn query_filters_by_user_and_joins_display_fields() {
    let f = fixture_with(MemoryRecordStore::with_records(vec![
        seeded("1", "u1", at(2025, 7, 1, 1, 0)),
        seeded("2", "u2", at(2025, 7, 1, 2, 0)),
        seeded("3", "ghost", at(2025, 7, 1, 3, 0)),
    ]));

    let page = f
        .ledger
        .query(&AttendanceFilter {
            user_id: Some("u2".into()),
            ..AttendanceFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].display_name, "Siti Aminah");
    assert_eq!(page.records[0].external_id, "EMP002");

    let all = f.ledger.query(&AttendanceFilter::default()).await.unwrap();
    let ghost = &all.records[2];
    assert_eq!(ghost.display_name, UNKNOWN_PRINCIPAL);
    assert_eq!(ghost.external_id, UNKNOWN_PRINCIPAL);
}

#[actix_web::test]
async fn query_out_of_range_windows_do_not_fail() {
    let f = fixture_with(MemoryRecordStore::with_records(vec![
        seeded("1", "u1", at(2025, 7, 1, 1, 0)),
        seeded("2", "u1", at(2025, 7, 2, 1, 0)),
    ]));

    let past_end = f
        .ledger
        .query(&AttendanceFilter {
            offset: 5,
            ..AttendanceFilter::default()
        })
        .await
        .unwrap();
    assert!(past_end.records.is_empty());
    assert_eq!(past_end.total, 2);

    let negative = f
        .ledger
        .query(&AttendanceFilter {
            limit: -1,
            offset: -3,
            ..AttendanceFilter::default()
        })
        .await
        .unwrap();
    assert!(negative.records.is_empty());
    assert_eq!(negative.total, 2);

    let huge = f
        .ledger
        .query(&AttendanceFilter {
            limit: i64::MAX,
            offset: 1,
            ..AttendanceFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(huge.records.len(), 1);
    assert_eq!(huge.records[0].id, "2");
}

#[actix_web::test]
async fn query_with_timestamp_bounds() {
    let f = fixture_with(MemoryRecordStore::with_records(vec![
        seeded("1", "u1", at(2025, 7, 1, 1, 0)),
        seeded("2", "u1", at(2025, 7, 1, 3, 0)),
        seeded("3", "u1", at(2025, 7, 1, 5, 0)),
    ]));

    let filter = AttendanceFilter {
        start_date: Some(DateBound::Instant(at(2025, 7, 1, 3, 0))),
        end_date: Some(DateBound::Instant(at(2025, 7, 1, 5, 0))),
        ..AttendanceFilter::default()
    };
    let page = f.ledger.query(&filter).await.unwrap();

    let ids: Vec<_> = page.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["2", "3"]);
}
