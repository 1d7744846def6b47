use crate::api::ApiError;
use crate::ledger::error::StoreError;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDateTime;
use serde_json::json;
use sqlx::MySqlPool;

/// Reports whether the database answers.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database reachable", body = Object, example = json!({
            "success": true,
            "message": "Database connected",
            "timestamp": "2025-07-01T08:00:00"
        })),
        (status = 503, description = "Database unreachable")
    ),
    tag = "Health"
)]
pub async fn health(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let now: NaiveDateTime = sqlx::query_scalar("SELECT NOW()")
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| ApiError::Storage(StoreError::from(e)))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Database connected",
        "timestamp": now
    })))
}
