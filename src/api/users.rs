use crate::api::ApiError;
use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::db::users::{self, NewUser, UserChanges};
use crate::ledger::error::StoreError;
use crate::model::role::Role;
use crate::model::user::UserResponse;
use crate::registry::CachedDirectory;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "Budi Santoso")]
    pub name: String,
    #[schema(example = "budi")]
    pub username: String,
    #[schema(example = "secret123")]
    pub password: String,
    #[schema(example = "EMP001")]
    pub employee_number: String,
    /// Defaults to `user`
    pub role: Option<Role>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub username: Option<String>,
    /// Re-hashed before storing
    pub password: Option<String>,
    pub employee_number: Option<String>,
    pub role: Option<Role>,
}

impl CreateUser {
    fn validate(&self) -> Result<(), ApiError> {
        let fields = [
            ("name", &self.name),
            ("username", &self.username),
            ("password", &self.password),
            ("employee_number", &self.employee_number),
        ];
        match fields.iter().find(|(_, v)| v.trim().is_empty()) {
            Some((field, _)) => Err(ApiError::BadRequest(format!("{field} is required"))),
            None => Ok(()),
        }
    }
}

impl UpdateUser {
    /// Blank strings are rejected rather than silently ignored.
    fn into_changes(self) -> Result<UserChanges, ApiError> {
        let non_blank = |field: &str, value: Option<String>| -> Result<Option<String>, ApiError> {
            match value {
                Some(v) if v.trim().is_empty() => {
                    Err(ApiError::BadRequest(format!("{field} must not be empty")))
                }
                Some(v) => Ok(Some(v.trim().to_string())),
                None => Ok(None),
            }
        };

        let password_hash = match non_blank("password", self.password)? {
            Some(p) => Some(hash(&p)?),
            None => None,
        };

        Ok(UserChanges {
            name: non_blank("name", self.name)?,
            username: non_blank("username", self.username)?,
            password_hash,
            employee_number: non_blank("employee_number", self.employee_number)?,
            role: self.role,
        })
    }
}

fn hash(password: &str) -> Result<String, ApiError> {
    hash_password(password).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash password");
        ApiError::Internal("Failed to hash password")
    })
}

fn write_error(e: StoreError) -> ApiError {
    match e {
        StoreError::Conflict => ApiError::Conflict("Username or employee number already exists"),
        StoreError::NotFound(_) => ApiError::NotFound("User not found"),
        other => ApiError::Storage(other),
    }
}

/// List users
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users for admins, only the caller otherwise", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let found = if auth.is_admin() {
        users::list(pool.get_ref()).await
    } else {
        users::find_by_id(pool.get_ref(), &auth.user_id)
            .await
            .map(|u| u.into_iter().collect::<Vec<_>>())
    };
    let found = found.map_err(ApiError::from)?;

    let users: Vec<UserResponse> = found.iter().map(|u| u.to_response()).collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": users
    })))
}

/// Create user
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Missing field"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Username or employee number taken")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
#[instrument(name = "create_user", skip(auth, pool, payload), fields(admin = %auth.username))]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    payload.validate()?;

    let password_hash = hash(&payload.password)?;
    let user = users::create(
        pool.get_ref(),
        NewUser {
            name: payload.name.trim(),
            username: payload.username.trim(),
            password_hash: &password_hash,
            employee_number: payload.employee_number.trim(),
            role: payload.role.unwrap_or(Role::User),
        },
    )
    .await
    .map_err(write_error)?;

    info!(user_id = %user.id, "User created");

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "User created successfully",
        "data": user.to_response()
    })))
}

/// Update user
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Username or employee number taken")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    directory: web::Data<CachedDirectory>,
    path: web::Path<String>,
    payload: web::Json<UpdateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let changes = payload.into_inner().into_changes()?;
    let user = users::update(pool.get_ref(), &id, changes)
        .await
        .map_err(write_error)?;
    directory.invalidate(&id).await;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User updated successfully",
        "data": user.to_response()
    })))
}

/// Delete user
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Cannot delete own account"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    directory: web::Data<CachedDirectory>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    if id == auth.user_id {
        return Err(ApiError::BadRequest("Cannot delete your own account".into()).into());
    }

    if !users::delete(pool.get_ref(), &id).await.map_err(ApiError::from)? {
        return Err(ApiError::NotFound("User not found").into());
    }
    directory.invalidate(&id).await;
    info!(user_id = %id, admin = %auth.username, "User deleted");

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User deleted successfully"
    })))
}
