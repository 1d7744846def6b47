use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": "0e7d5a8c-3f21-4d7e-9a61-5b2f8c9d1e44",
        "code": "HQ_MAIN_ENTRANCE",
        "location": "Head Office",
        "is_active": true,
        "created_at": "2025-06-01T09:00:00Z",
        "updated_at": "2025-06-01T09:00:00Z"
    })
)]
pub struct QrCode {
    pub id: String,
    /// Payload printed into the QR image; what the client scans and submits.
    pub code: String,
    pub location: String,
    pub is_active: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}
