use async_trait::async_trait;
use chrono::Utc;
use sqlx::MySqlPool;

use crate::db::is_duplicate_key;
use crate::ledger::error::StoreError;
use crate::model::qr_code::QrCode;
use crate::registry::QrCodeLookup;

const SELECT_QR: &str = r#"
    SELECT id, code, location, is_active, created_at, updated_at
    FROM qr_codes
"#;

#[derive(Default)]
pub struct QrCodeChanges {
    pub code: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    if is_duplicate_key(&e) {
        StoreError::Conflict
    } else {
        e.into()
    }
}

pub async fn list(pool: &MySqlPool, active: Option<bool>) -> Result<Vec<QrCode>, StoreError> {
    let codes = match active {
        Some(active) => {
            sqlx::query_as::<_, QrCode>(&format!(
                "{SELECT_QR} WHERE is_active = ? ORDER BY created_at"
            ))
            .bind(active)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, QrCode>(&format!("{SELECT_QR} ORDER BY created_at"))
                .fetch_all(pool)
                .await?
        }
    };
    Ok(codes)
}

pub async fn find_by_id(pool: &MySqlPool, id: &str) -> Result<Option<QrCode>, StoreError> {
    let code = sqlx::query_as::<_, QrCode>(&format!("{SELECT_QR} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(code)
}

/// `Conflict` when `code` already exists.
pub async fn create(
    pool: &MySqlPool,
    code: &str,
    location: &str,
    is_active: bool,
) -> Result<QrCode, StoreError> {
    let now = Utc::now();
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO qr_codes (id, code, location, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(code)
    .bind(location)
    .bind(is_active)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(map_write_error)?;

    find_by_id(pool, &id)
        .await?
        .ok_or(StoreError::NotFound(id))
}

pub async fn update(
    pool: &MySqlPool,
    id: &str,
    changes: QrCodeChanges,
) -> Result<QrCode, StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE qr_codes
        SET code = COALESCE(?, code),
            location = COALESCE(?, location),
            is_active = COALESCE(?, is_active),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(changes.code)
    .bind(changes.location)
    .bind(changes.is_active)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(map_write_error)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(id.to_string()));
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
}

pub async fn delete(pool: &MySqlPool, id: &str) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM qr_codes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub struct MySqlQrCodes {
    pool: MySqlPool,
}

impl MySqlQrCodes {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QrCodeLookup for MySqlQrCodes {
    async fn find_by_code(&self, code: &str) -> Result<Option<QrCode>, StoreError> {
        let found = sqlx::query_as::<_, QrCode>(&format!("{SELECT_QR} WHERE code = ?"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }
}
