use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::User;
use crate::db::types::{SubscriptionStatus, UserRole};

const COLUMNS: &str = "\
    id, email, hashed_password, full_name, role, is_active, avatar_url, \
    subscription_status, subscription_expires_at, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Emails are matched case-insensitively; they are stored lowercased.
pub(crate) async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE email = lower($1)"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_role_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<UserRole>, sqlx::Error> {
    sqlx::query_scalar::<_, UserRole>("SELECT role FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) id: &'a str,
    pub(crate) email: &'a str,
    pub(crate) hashed_password: String,
    pub(crate) full_name: &'a str,
    pub(crate) role: UserRole,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, email, hashed_password, full_name, role, is_active,
            subscription_status, created_at, updated_at
        ) VALUES ($1, lower($2), $3, $4, $5, TRUE, 'free', $6, $6)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.email)
    .bind(params.hashed_password)
    .bind(params.full_name)
    .bind(params.role)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateProfile {
    pub(crate) full_name: Option<String>,
    pub(crate) avatar_url: Option<String>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update_profile(
    pool: &PgPool,
    id: &str,
    params: UpdateProfile,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET
            full_name = COALESCE($1, full_name),
            avatar_url = COALESCE($2, avatar_url),
            updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(params.full_name)
    .bind(params.avatar_url)
    .bind(params.updated_at)
    .bind(id)
    .fetch_one(pool)
    .await
}

pub(crate) struct AdminUpdateUser {
    pub(crate) role: Option<UserRole>,
    pub(crate) is_active: Option<bool>,
    pub(crate) subscription_status: Option<SubscriptionStatus>,
    /// `Some(None)` clears the expiry.
    pub(crate) subscription_expires_at: Option<Option<time::PrimitiveDateTime>>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn admin_update(
    pool: &PgPool,
    id: &str,
    params: AdminUpdateUser,
) -> Result<Option<User>, sqlx::Error> {
    let set_expiry = params.subscription_expires_at.is_some();
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET
            role = COALESCE($1, role),
            is_active = COALESCE($2, is_active),
            subscription_status = COALESCE($3, subscription_status),
            subscription_expires_at = CASE WHEN $4 THEN $5 ELSE subscription_expires_at END,
            updated_at = $6
         WHERE id = $7
         RETURNING {COLUMNS}"
    ))
    .bind(params.role)
    .bind(params.is_active)
    .bind(params.subscription_status)
    .bind(set_expiry)
    .bind(params.subscription_expires_at.flatten())
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    role: Option<UserRole>,
    skip: i64,
    limit: i64,
) -> Result<(Vec<User>, i64), sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM users"));
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
    if let Some(role) = role {
        builder.push(" WHERE role = ").push_bind(role);
        count.push(" WHERE role = ").push_bind(role);
    }
    builder.push(" ORDER BY created_at DESC OFFSET ").push_bind(skip);
    builder.push(" LIMIT ").push_bind(limit);

    let users = builder.build_query_as::<User>().fetch_all(pool).await?;
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;
    Ok((users, total))
}
