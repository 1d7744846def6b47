use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum_macros::Display as StrumDisplay;
use utoipa::ToSchema;

/// A latitude/longitude pair captured by the client at check-in or check-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema, Display)]
#[display(fmt = "({}, {})", latitude, longitude)]
pub struct GeoPoint {
    #[schema(example = json!(-6.208763))]
    pub latitude: f64,
    #[schema(example = json!(106.845599))]
    pub longitude: f64,
}

impl GeoPoint {
    /// Both coordinates must be present and finite. No range check is applied.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) if latitude.is_finite() && longitude.is_finite() => {
                Some(Self {
                    latitude,
                    longitude,
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[derive(StrumDisplay)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = "1b4e28ba-2fa1-11d2-883f-0016d3cca427")]
    pub id: String,

    #[schema(example = "5f0c3c1e-9d0a-4a57-8d2b-0f6a1f0b2a11")]
    pub user_id: String,

    #[schema(nullable = true)]
    pub qr_code_id: Option<String>,

    #[schema(example = "2025-07-01T03:00:00Z", format = "date-time", value_type = String)]
    pub check_in_at: DateTime<Utc>,

    #[schema(format = "date-time", value_type = Option<String>, nullable = true)]
    pub check_out_at: Option<DateTime<Utc>>,

    pub check_in_location: GeoPoint,

    #[schema(nullable = true)]
    pub check_out_location: Option<GeoPoint>,

    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,

    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn status(&self) -> AttendanceStatus {
        if self.check_out_at.is_some() {
            AttendanceStatus::Closed
        } else {
            AttendanceStatus::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.status() == AttendanceStatus::Open
    }

    /// UTC calendar day of the check-in; the uniqueness boundary per user.
    pub fn check_in_day(&self) -> NaiveDate {
        self.check_in_at.date_naive()
    }
}

/// Everything a check-out writes onto an open record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckOutStamp {
    pub at: DateTime<Utc>,
    pub location: GeoPoint,
}

impl CheckOutStamp {
    pub fn apply(&self, record: &mut AttendanceRecord) {
        record.check_out_at = Some(self.at);
        record.check_out_location = Some(self.location);
        record.updated_at = self.at;
    }
}

/// A record joined with the owning principal's display fields.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceView {
    pub id: String,
    pub user_id: String,
    #[schema(nullable = true)]
    pub qr_code_id: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub check_in_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = Option<String>, nullable = true)]
    pub check_out_at: Option<DateTime<Utc>>,
    pub check_in_location: GeoPoint,
    #[schema(nullable = true)]
    pub check_out_location: Option<GeoPoint>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
    pub status: AttendanceStatus,
    #[schema(example = "Budi Santoso")]
    pub display_name: String,
    #[schema(example = "EMP001")]
    pub external_id: String,
}

impl AttendanceView {
    pub fn new(record: AttendanceRecord, display_name: String, external_id: String) -> Self {
        let status = record.status();
        Self {
            id: record.id,
            user_id: record.user_id,
            qr_code_id: record.qr_code_id,
            check_in_at: record.check_in_at,
            check_out_at: record.check_out_at,
            check_in_location: record.check_in_location,
            check_out_location: record.check_out_location,
            created_at: record.created_at,
            updated_at: record.updated_at,
            status,
            display_name,
            external_id,
        }
    }
}
