use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

/// Makes sure the configured first admin exists, is active and can log in
/// with the configured password. An existing account with that email is
/// promoted rather than duplicated.
pub(crate) async fn ensure_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_admin_password.is_empty() {
        tracing::warn!("FIRST_ADMIN_PASSWORD not configured; skipping admin creation");
        return Ok(());
    }

    let email = admin.first_admin_email.trim();
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_email(state.db(), email).await? {
        let verified = security::verify_password(&admin.first_admin_password, &user.hashed_password)
            .unwrap_or(false);
        if verified && user.role == UserRole::Admin && user.is_active {
            tracing::info!("Default admin already up to date");
            return Ok(());
        }

        let hashed_password = if verified {
            user.hashed_password.clone()
        } else {
            security::hash_password(&admin.first_admin_password)?
        };

        sqlx::query(
            "UPDATE users
             SET hashed_password = $1,
                 role = $2,
                 is_active = TRUE,
                 updated_at = $3
             WHERE id = $4",
        )
        .bind(hashed_password)
        .bind(UserRole::Admin)
        .bind(now)
        .bind(&user.id)
        .execute(state.db())
        .await?;

        tracing::info!(user_id = %user.id, "Updated default admin {email}");
        return Ok(());
    }

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email,
            hashed_password: security::hash_password(&admin.first_admin_password)?,
            full_name: "Administrador",
            role: UserRole::Admin,
            created_at: now,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "Created default admin {email}");
    Ok(())
}
