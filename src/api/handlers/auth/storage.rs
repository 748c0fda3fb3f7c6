//! User persistence.

use sqlx::{PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// Fetch a user by normalized email.
///
/// # Errors
/// Returns the underlying `sqlx` error on query failure.
pub async fn lookup_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserRecord>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, full_name, email, password_hash, role FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .instrument(info_span!("db.query", table = "users", op = "lookup_by_email"))
    .await?;

    Ok(row.map(|row| UserRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
    }))
}

/// Fetch a user by primary key.
///
/// # Errors
/// Returns the underlying `sqlx` error on query failure.
pub async fn lookup_user_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<UserRecord>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, full_name, email, password_hash, role FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .instrument(info_span!("db.query", table = "users", op = "lookup_by_id"))
    .await?;

    Ok(row.map(|row| UserRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
    }))
}

/// Cheap existence probe used before sending an OTP.
///
/// # Errors
/// Returns the underlying `sqlx` error on query failure.
pub async fn user_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1) AS present")
        .bind(email)
        .fetch_one(pool)
        .instrument(info_span!("db.query", table = "users", op = "exists"))
        .await?;
    Ok(row.get("present"))
}

/// Insert a new user. The unique index on `email` is the arbiter of
/// duplicates; callers translate a 23505 into a conflict response.
///
/// # Errors
/// Returns the underlying `sqlx` error on query failure.
pub async fn insert_user(
    pool: &PgPool,
    full_name: &str,
    email: &str,
    password_hash: &str,
) -> Result<UserRecord, sqlx::Error> {
    let row = sqlx::query(
        "INSERT INTO users (full_name, email, password_hash) VALUES ($1, $2, $3) \
         RETURNING id, full_name, email, password_hash, role",
    )
    .bind(full_name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .instrument(info_span!("db.query", table = "users", op = "insert"))
    .await?;

    Ok(UserRecord {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
    })
}
