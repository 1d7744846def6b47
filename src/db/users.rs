use async_trait::async_trait;
use chrono::Utc;
use sqlx::MySqlPool;

use crate::db::is_duplicate_key;
use crate::ledger::error::StoreError;
use crate::model::role::Role;
use crate::model::user::{PrincipalInfo, User};
use crate::registry::Directory;

const SELECT_USER: &str = r#"
    SELECT id, name, username, password, employee_number, role, created_at, updated_at
    FROM users
"#;

pub struct NewUser<'a> {
    pub name: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub employee_number: &'a str,
    pub role: Role,
}

/// Fields left `None` keep their stored value.
#[derive(Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub employee_number: Option<String>,
    pub role: Option<Role>,
}

pub async fn find_by_username(
    pool: &MySqlPool,
    username: &str,
) -> Result<Option<User>, StoreError> {
    let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE username = ?"))
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_id(pool: &MySqlPool, id: &str) -> Result<Option<User>, StoreError> {
    let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn list(pool: &MySqlPool) -> Result<Vec<User>, StoreError> {
    let users = sqlx::query_as::<_, User>(&format!("{SELECT_USER} ORDER BY created_at"))
        .fetch_all(pool)
        .await?;
    Ok(users)
}

/// `Conflict` when the username or employee number is taken.
pub async fn create(pool: &MySqlPool, new: NewUser<'_>) -> Result<User, StoreError> {
    let now = Utc::now();
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO users (id, name, username, password, employee_number, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(new.name)
    .bind(new.username)
    .bind(new.password_hash)
    .bind(new.employee_number)
    .bind(new.role.as_ref())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            StoreError::Conflict
        } else {
            e.into()
        }
    })?;

    find_by_id(pool, &id)
        .await?
        .ok_or(StoreError::NotFound(id))
}

/// `NotFound` for an unknown id, `Conflict` when the new username or employee
/// number belongs to someone else.
pub async fn update(pool: &MySqlPool, id: &str, changes: UserChanges) -> Result<User, StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET name = COALESCE(?, name),
            username = COALESCE(?, username),
            password = COALESCE(?, password),
            employee_number = COALESCE(?, employee_number),
            role = COALESCE(?, role),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(changes.name)
    .bind(changes.username)
    .bind(changes.password_hash)
    .bind(changes.employee_number)
    .bind(changes.role.map(|r| r.as_ref().to_string()))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            StoreError::Conflict
        } else {
            e.into()
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(id.to_string()));
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
}

/// Returns false when no such user existed. Attendance rows are kept.
pub async fn delete(pool: &MySqlPool, id: &str) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Principal display fields straight from the users table.
pub struct MySqlDirectory {
    pool: MySqlPool,
}

impl MySqlDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for MySqlDirectory {
    async fn lookup_display_info(
        &self,
        user_id: &str,
    ) -> Result<Option<PrincipalInfo>, StoreError> {
        let info = sqlx::query_as::<_, PrincipalInfo>(
            r#"
            SELECT name AS display_name, employee_number AS external_id
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(info)
    }
}
