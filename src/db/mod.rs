pub mod attendance;
pub mod qr_codes;
pub mod users;

use anyhow::Context;
use chrono::Utc;
use sqlx::MySqlPool;
use tracing::info;

use crate::auth::password::hash_password;
use crate::model::role::Role;

pub async fn init_db(database_url: &str) -> anyhow::Result<MySqlPool> {
    MySqlPool::connect(database_url)
        .await
        .context("Failed to connect to database")
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id CHAR(36) NOT NULL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        username VARCHAR(255) NOT NULL UNIQUE,
        password VARCHAR(255) NOT NULL,
        employee_number VARCHAR(50) NOT NULL UNIQUE,
        role VARCHAR(20) NOT NULL DEFAULT 'user',
        created_at DATETIME(3) NOT NULL,
        updated_at DATETIME(3) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS qr_codes (
        id CHAR(36) NOT NULL PRIMARY KEY,
        code VARCHAR(255) NOT NULL UNIQUE,
        location VARCHAR(255) NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at DATETIME(3) NOT NULL,
        updated_at DATETIME(3) NOT NULL
    )
    "#,
    // `seq` keeps insertion order; the unique key is the one-record-per-day rule.
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        seq BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
        id CHAR(36) NOT NULL UNIQUE,
        user_id CHAR(36) NOT NULL,
        qr_code_id CHAR(36) NULL,
        check_in_date DATE NOT NULL,
        check_in_at DATETIME(3) NOT NULL,
        check_out_at DATETIME(3) NULL,
        check_in_latitude DOUBLE NOT NULL,
        check_in_longitude DOUBLE NOT NULL,
        check_out_latitude DOUBLE NULL,
        check_out_longitude DOUBLE NULL,
        created_at DATETIME(3) NOT NULL,
        updated_at DATETIME(3) NOT NULL,
        UNIQUE KEY uq_attendance_user_day (user_id, check_in_date),
        KEY idx_attendance_check_in_at (check_in_at)
    )
    "#,
];

/// Creates missing tables. Existing tables are left alone.
pub async fn migrate(pool: &MySqlPool) -> anyhow::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to apply schema")?;
    }
    info!("Database schema ready");
    Ok(())
}

/// Creates the first administrator when the users table has none.
pub async fn seed_admin(pool: &MySqlPool, username: &str, password: &str) -> anyhow::Result<()> {
    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
        .bind(Role::Admin.as_ref())
        .fetch_one(pool)
        .await
        .context("Failed to count administrators")?;

    if admins > 0 {
        return Ok(());
    }

    let hashed = hash_password(password).context("Failed to hash admin password")?;
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users (id, name, username, password, employee_number, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind("Administrator")
    .bind(username)
    .bind(hashed)
    .bind("ADM001")
    .bind(Role::Admin.as_ref())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to seed admin user")?;

    info!(username, "Seeded administrator account");
    Ok(())
}

/// MySQL reports unique-key violations with SQLSTATE 23000.
pub fn is_duplicate_key(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}
