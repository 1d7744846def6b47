use std::ops::Bound;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use sqlx::{MySqlPool, mysql::MySqlArguments, query::QueryAs};

use crate::db::is_duplicate_key;
use crate::ledger::error::StoreError;
use crate::ledger::store::{RecordCriteria, RecordStore};
use crate::model::attendance::{AttendanceRecord, CheckOutStamp, GeoPoint};

const SELECT_RECORD: &str = r#"
    SELECT id, user_id, qr_code_id, check_in_at, check_out_at,
           check_in_latitude, check_in_longitude,
           check_out_latitude, check_out_longitude,
           created_at, updated_at
    FROM attendance
"#;

#[derive(sqlx::FromRow)]
struct AttendanceRow {
    id: String,
    user_id: String,
    qr_code_id: Option<String>,
    check_in_at: DateTime<Utc>,
    check_out_at: Option<DateTime<Utc>>,
    check_in_latitude: f64,
    check_in_longitude: f64,
    check_out_latitude: Option<f64>,
    check_out_longitude: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(row: AttendanceRow) -> Self {
        AttendanceRecord {
            id: row.id,
            user_id: row.user_id,
            qr_code_id: row.qr_code_id,
            check_in_at: row.check_in_at,
            check_out_at: row.check_out_at,
            check_in_location: GeoPoint {
                latitude: row.check_in_latitude,
                longitude: row.check_in_longitude,
            },
            check_out_location: GeoPoint::from_parts(
                row.check_out_latitude,
                row.check_out_longitude,
            ),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// Helper enum for typed SQLx binding
#[derive(Debug, Clone, PartialEq)]
enum FilterValue {
    Str(String),
    Date(NaiveDate),
    Time(DateTime<Utc>),
}

/// Builds the WHERE clause for `criteria` along with its bind values.
fn where_clause(criteria: &RecordCriteria) -> (String, Vec<FilterValue>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut args = Vec::new();

    if let Some(user_id) = &criteria.user_id {
        sql.push_str(" AND user_id = ?");
        args.push(FilterValue::Str(user_id.clone()));
    }
    if let Some(day) = criteria.day {
        sql.push_str(" AND check_in_date = ?");
        args.push(FilterValue::Date(day));
    }
    match criteria.checked_in.0 {
        Bound::Included(t) => {
            sql.push_str(" AND check_in_at >= ?");
            args.push(FilterValue::Time(t));
        }
        Bound::Excluded(t) => {
            sql.push_str(" AND check_in_at > ?");
            args.push(FilterValue::Time(t));
        }
        Bound::Unbounded => {}
    }
    match criteria.checked_in.1 {
        Bound::Included(t) => {
            sql.push_str(" AND check_in_at <= ?");
            args.push(FilterValue::Time(t));
        }
        Bound::Excluded(t) => {
            sql.push_str(" AND check_in_at < ?");
            args.push(FilterValue::Time(t));
        }
        Bound::Unbounded => {}
    }
    if criteria.open_only {
        sql.push_str(" AND check_out_at IS NULL");
    }

    (sql, args)
}

fn bind_all<'q, O>(
    mut query: QueryAs<'q, sqlx::MySql, O, MySqlArguments>,
    args: Vec<FilterValue>,
) -> QueryAs<'q, sqlx::MySql, O, MySqlArguments> {
    for arg in args {
        query = match arg {
            FilterValue::Str(s) => query.bind(s),
            FilterValue::Date(d) => query.bind(d),
            FilterValue::Time(t) => query.bind(t),
        };
    }
    query
}

/// Attendance records in the `attendance` table.
///
/// The `(user_id, check_in_date)` unique key rejects a second check-in for the
/// same day even when it comes from another server process, and check-out
/// only updates rows whose `check_out_at` is still NULL.
pub struct MySqlRecordStore {
    pool: MySqlPool,
}

impl MySqlRecordStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    async fn insert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, StoreError> {
        // DATETIME(3) keeps milliseconds; hand back what a later read returns.
        let record = AttendanceRecord {
            check_in_at: record.check_in_at.trunc_subsecs(3),
            created_at: record.created_at.trunc_subsecs(3),
            updated_at: record.updated_at.trunc_subsecs(3),
            ..record
        };

        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (id, user_id, qr_code_id, check_in_date, check_in_at,
                 check_in_latitude, check_in_longitude, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.qr_code_id)
        .bind(record.check_in_day())
        .bind(record.check_in_at)
        .bind(record.check_in_location.latitude)
        .bind(record.check_in_location.longitude)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(record),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by(
        &self,
        criteria: &RecordCriteria,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let (where_sql, args) = where_clause(criteria);
        let sql = format!("{SELECT_RECORD}{where_sql} ORDER BY seq LIMIT ? OFFSET ?");

        let limit = criteria.limit.map_or(u64::MAX, |l| l as u64);
        let rows = bind_all(sqlx::query_as::<_, AttendanceRow>(&sql), args)
            .bind(limit)
            .bind(criteria.offset as u64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(AttendanceRecord::from).collect())
    }

    async fn count(&self, criteria: &RecordCriteria) -> Result<u64, StoreError> {
        let (where_sql, args) = where_clause(criteria);
        let sql = format!("SELECT COUNT(*) FROM attendance{where_sql}");

        let (total,) = bind_all(sqlx::query_as::<_, (i64,)>(&sql), args)
            .fetch_one(&self.pool)
            .await?;

        Ok(total.max(0) as u64)
    }

    async fn update_in_place(
        &self,
        id: &str,
        stamp: CheckOutStamp,
    ) -> Result<AttendanceRecord, StoreError> {
        let at = stamp.at.trunc_subsecs(3);
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out_at = ?, check_out_latitude = ?, check_out_longitude = ?, updated_at = ?
            WHERE id = ?
            AND check_out_at IS NULL
            "#,
        )
        .bind(at)
        .bind(stamp.location.latitude)
        .bind(stamp.location.longitude)
        .bind(at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<String> =
                sqlx::query_scalar("SELECT id FROM attendance WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;
            return Err(match exists {
                Some(_) => StoreError::Conflict,
                None => StoreError::NotFound(id.to_string()),
            });
        }

        let row = sqlx::query_as::<_, AttendanceRow>(&format!("{SELECT_RECORD} WHERE id = ?"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(row.into())
    }
}
