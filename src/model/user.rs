use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

/// Row shape of the `users` table. `role` is stored as its lowercase name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub password: String,
    pub employee_number: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User as returned by the API; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": "5f0c3c1e-9d0a-4a57-8d2b-0f6a1f0b2a11",
        "name": "Budi Santoso",
        "username": "budi",
        "employee_number": "EMP001",
        "role": "user",
        "created_at": "2025-06-01T09:00:00Z",
        "updated_at": "2025-06-01T09:00:00Z"
    })
)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub username: String,
    pub employee_number: String,
    pub role: Role,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Unknown role names degrade to `Role::User`.
    pub fn role(&self) -> Role {
        Role::from_name(&self.role).unwrap_or(Role::User)
    }

    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id.clone(),
            name: self.name.clone(),
            username: self.username.clone(),
            employee_number: self.employee_number.clone(),
            role: self.role(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Display fields the attendance listing joins onto each record.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PrincipalInfo {
    pub display_name: String,
    pub external_id: String,
}
