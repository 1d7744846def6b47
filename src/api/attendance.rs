use crate::api::ApiError;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::ledger::query::{AttendanceFilter, DEFAULT_LIMIT};
use crate::ledger::{AttendanceRequest, Ledger};
use crate::registry::QrCodeLookup;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct AttendanceAction {
    /// Payload read from the scanned QR code; omitted for a manual action.
    #[schema(example = "HQ_MAIN_ENTRANCE")]
    pub qr_code: Option<String>,
    #[schema(example = json!(-6.208763))]
    pub latitude: Option<f64>,
    #[schema(example = json!(106.845599))]
    pub longitude: Option<f64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    /// Filter by user. Non-admins only ever see their own records.
    pub user_id: Option<String>,
    /// Inclusive lower bound on check-in, `YYYY-MM-DD` or RFC 3339
    #[schema(example = "2025-07-01")]
    pub start_date: Option<String>,
    /// Inclusive upper bound on check-in, `YYYY-MM-DD` or RFC 3339
    #[schema(example = "2025-07-31")]
    pub end_date: Option<String>,
    #[schema(example = 10)]
    pub limit: Option<i64>,
    #[schema(example = 0)]
    pub offset: Option<i64>,
}

/// Turns a scanned payload into the registered code's id.
async fn resolve_qr_code(
    lookup: &dyn QrCodeLookup,
    scanned: Option<&str>,
) -> Result<Option<String>, ApiError> {
    let Some(code) = scanned.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };

    match lookup.find_by_code(code).await? {
        Some(qr) if qr.is_active => Ok(Some(qr.id)),
        _ => Err(ApiError::InvalidQrCode),
    }
}

async fn to_request(
    auth: &AuthUser,
    qr_codes: &dyn QrCodeLookup,
    payload: AttendanceAction,
) -> Result<AttendanceRequest, ApiError> {
    Ok(AttendanceRequest {
        user_id: auth.user_id.clone(),
        qr_code_id: resolve_qr_code(qr_codes, payload.qr_code.as_deref()).await?,
        latitude: payload.latitude,
        longitude: payload.longitude,
    })
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = AttendanceAction,
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "success": true,
            "message": "Checked in successfully",
            "data": {}
        })),
        (status = 400, description = "Missing location or unknown QR code", body = Object, example = json!({
            "success": false,
            "code": "INVALID_QR_CODE",
            "message": "QR code is not registered or not active"
        })),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "success": false,
            "code": "DUPLICATE_CHECK_IN",
            "message": "already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Record store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    ledger: web::Data<Ledger>,
    qr_codes: web::Data<dyn QrCodeLookup>,
    payload: web::Json<AttendanceAction>,
) -> actix_web::Result<impl Responder> {
    let request = to_request(&auth, qr_codes.get_ref(), payload.into_inner()).await?;
    let record = ledger.check_in(request).await.map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Checked in successfully",
        "data": record
    })))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = AttendanceAction,
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "success": true,
            "message": "Checked out successfully",
            "data": {}
        })),
        (status = 400, description = "Missing location or unknown QR code"),
        (status = 409, description = "No active check-in found for today", body = Object, example = json!({
            "success": false,
            "code": "NO_OPEN_CHECK_IN",
            "message": "no open check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Record store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    ledger: web::Data<Ledger>,
    qr_codes: web::Data<dyn QrCodeLookup>,
    payload: web::Json<AttendanceAction>,
) -> actix_web::Result<impl Responder> {
    let request = to_request(&auth, qr_codes.get_ref(), payload.into_inner()).await?;
    let record = ledger.check_out(request).await.map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Checked out successfully",
        "data": record
    })))
}

/// Attendance listing, newest records last
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance list", body = AttendancePage),
        (status = 400, description = "Unparseable date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Listing another user's records"),
        (status = 503, description = "Record store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    ledger: web::Data<Ledger>,
    config: web::Data<Config>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let query = query.into_inner();

    let user_id = if auth.is_admin() {
        query.user_id
    } else {
        match query.user_id.as_deref().map(str::trim) {
            Some(requested) if !requested.is_empty() && requested != auth.user_id => {
                return Err(ApiError::Forbidden("Users may only list their own attendance").into());
            }
            _ => Some(auth.user_id.clone()),
        }
    };

    let filter = AttendanceFilter::parse(
        user_id,
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        Some(query.limit.unwrap_or(DEFAULT_LIMIT).min(config.max_page_size)),
        query.offset,
    )
    .map_err(ApiError::from)?;

    let page = ledger.query(&filter).await.map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": page.records,
        "total": page.total
    })))
}
