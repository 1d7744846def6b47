use crate::api::attendance::{AttendanceAction, AttendanceQuery};
use crate::api::qr_codes::{CreateQrCode, UpdateQrCode};
use crate::api::users::{CreateUser, UpdateUser};
use crate::ledger::query::AttendancePage;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, AttendanceView, GeoPoint};
use crate::model::qr_code::QrCode;
use crate::model::role::Role;
use crate::model::user::UserResponse;
use crate::models::{LoginReqDto, LoginResponse};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracker

Employees record a daily **check-in** and **check-out**, each stamped with the
time and their GPS position and optionally tied to a scanned QR code.

### 🔹 Key Features
- **Attendance**
  - One check-in and one check-out per user per UTC day
  - Paginated listing with user and date filters
- **Users** (admin)
  - Create, update, list and delete accounts
- **QR Codes** (admin)
  - Register the codes posted at each location

### 🔐 Security
Every `/api` endpoint requires a **JWT Bearer token** from `/auth/login`.

### ⚠️ Errors
Failures return `{"success": false, "code": "...", "message": "..."}` where
`code` is one of `INVALID_INPUT`, `INVALID_QR_CODE`, `DUPLICATE_CHECK_IN`,
`NO_OPEN_CHECK_IN`, `STORAGE_UNAVAILABLE`, `UNAUTHORIZED`, `FORBIDDEN`,
`NOT_FOUND`, `CONFLICT`, `INTERNAL_ERROR`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::api::health::health,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::list_attendance,

        crate::api::users::list_users,
        crate::api::users::create_user,
        crate::api::users::update_user,
        crate::api::users::delete_user,

        crate::api::qr_codes::list_qr_codes,
        crate::api::qr_codes::create_qr_code,
        crate::api::qr_codes::update_qr_code,
        crate::api::qr_codes::delete_qr_code
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            UserResponse,
            Role,
            AttendanceAction,
            AttendanceQuery,
            AttendanceRecord,
            AttendanceStatus,
            AttendanceView,
            AttendancePage,
            GeoPoint,
            QrCode,
            CreateUser,
            UpdateUser,
            CreateQrCode,
            UpdateQrCode
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login"),
        (name = "Health", description = "Database reachability"),
        (name = "Attendance", description = "Check-in, check-out and attendance history"),
        (name = "Users", description = "User administration"),
        (name = "QR Codes", description = "QR code registry"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
