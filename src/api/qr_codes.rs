use crate::api::ApiError;
use crate::auth::auth::AuthUser;
use crate::db::qr_codes::{self, QrCodeChanges};
use crate::ledger::error::StoreError;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
pub struct QrCodeQuery {
    /// Only codes with this active flag
    pub active: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateQrCode {
    #[schema(example = "HQ_MAIN_ENTRANCE")]
    pub code: String,
    #[schema(example = "Head Office")]
    pub location: String,
    /// Defaults to true
    pub is_active: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateQrCode {
    pub code: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateQrCode {
    fn into_changes(self) -> Result<QrCodeChanges, ApiError> {
        let trimmed = |field: &str, value: Option<String>| {
            match value.map(|v| v.trim().to_string()) {
                Some(v) if v.is_empty() => {
                    Err(ApiError::BadRequest(format!("{field} must not be empty")))
                }
                other => Ok(other),
            }
        };

        Ok(QrCodeChanges {
            code: trimmed("code", self.code)?,
            location: trimmed("location", self.location)?,
            is_active: self.is_active,
        })
    }
}

fn write_error(e: StoreError) -> ApiError {
    match e {
        StoreError::Conflict => ApiError::Conflict("QR code already exists"),
        StoreError::NotFound(_) => ApiError::NotFound("QR code not found"),
        other => ApiError::Storage(other),
    }
}

/// List QR codes
#[utoipa::path(
    get,
    path = "/api/qr-codes",
    params(QrCodeQuery),
    responses(
        (status = 200, description = "Registered QR codes", body = Vec<crate::model::qr_code::QrCode>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "QR Codes",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_qr_codes(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<QrCodeQuery>,
) -> actix_web::Result<impl Responder> {
    let codes = qr_codes::list(pool.get_ref(), query.active)
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": codes
    })))
}

/// Register QR code
#[utoipa::path(
    post,
    path = "/api/qr-codes",
    request_body = CreateQrCode,
    responses(
        (status = 201, description = "QR code created", body = crate::model::qr_code::QrCode),
        (status = 400, description = "Missing code or location"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Code already registered")
    ),
    tag = "QR Codes",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_qr_code(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateQrCode>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let code = payload.code.trim();
    let location = payload.location.trim();
    if code.is_empty() || location.is_empty() {
        return Err(ApiError::BadRequest("code and location are required".into()).into());
    }

    let qr = qr_codes::create(pool.get_ref(), code, location, payload.is_active.unwrap_or(true))
        .await
        .map_err(write_error)?;
    info!(qr_code_id = %qr.id, code = %qr.code, "QR code registered");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "QR code created successfully",
        "data": qr
    })))
}

/// Update QR code
#[utoipa::path(
    put,
    path = "/api/qr-codes/{id}",
    params(("id" = String, Path, description = "QR code id")),
    request_body = UpdateQrCode,
    responses(
        (status = 200, description = "QR code updated", body = crate::model::qr_code::QrCode),
        (status = 403, description = "Admin only"),
        (status = 404, description = "QR code not found"),
        (status = 409, description = "Code already registered")
    ),
    tag = "QR Codes",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_qr_code(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    payload: web::Json<UpdateQrCode>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let changes = payload.into_inner().into_changes()?;
    let qr = qr_codes::update(pool.get_ref(), &path, changes)
        .await
        .map_err(write_error)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "QR code updated successfully",
        "data": qr
    })))
}

/// Delete QR code
#[utoipa::path(
    delete,
    path = "/api/qr-codes/{id}",
    params(("id" = String, Path, description = "QR code id")),
    responses(
        (status = 200, description = "QR code deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "QR code not found")
    ),
    tag = "QR Codes",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_qr_code(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if !qr_codes::delete(pool.get_ref(), &path).await.map_err(ApiError::from)? {
        return Err(ApiError::NotFound("QR code not found").into());
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "QR code deleted successfully"
    })))
}
