use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::{self, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::repositories;
use crate::schemas::user::{
    AdminUserUpdate, ProfileUpdate, SubscriptionResponse, UserListQuery, UserResponse,
};
use crate::services::subscription;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(me).patch(update_me))
        .route("/me/subscription", get(my_subscription))
        .route("/:user_id", patch(admin_update_user))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn update_me(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate()?;

    let updated = repositories::users::update_profile(
        state.db(),
        &user.id,
        repositories::users::UpdateProfile {
            full_name: payload.full_name,
            avatar_url: payload.avatar_url,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update profile"))?;

    Ok(Json(UserResponse::from_db(updated)))
}

async fn my_subscription(CurrentUser(user): CurrentUser) -> Json<SubscriptionResponse> {
    let active = subscription::is_active(
        user.subscription_status,
        user.subscription_expires_at,
        primitive_now_utc(),
    );

    Json(SubscriptionResponse {
        status: user.subscription_status,
        expires_at: user.subscription_expires_at.map(format_primitive),
        active,
    })
}

async fn list_users(
    Query(params): Query<UserListQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let (skip, limit) = pagination::bounds(params.skip, params.limit, 100);

    let (users, total_count) = repositories::users::list(state.db(), params.role, skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;

    Ok(Json(PaginatedResponse {
        items: users.into_iter().map(UserResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn admin_update_user(
    Path(user_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<AdminUserUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    if admin.id == user_id && payload.is_active == Some(false) {
        return Err(ApiError::BadRequest("Admins cannot deactivate themselves".to_string()));
    }

    let updated = repositories::users::admin_update(
        state.db(),
        &user_id,
        repositories::users::AdminUpdateUser {
            role: payload.role,
            is_active: payload.is_active,
            subscription_status: payload.subscription_status,
            subscription_expires_at: payload.subscription_expires_at,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update user"))?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(
        admin_id = %admin.id,
        user_id = %updated.id,
        role = ?updated.role,
        action = "user_update",
        "Admin updated user"
    );

    Ok(Json(UserResponse::from_db(updated)))
}

#[cfg(test)]
mod tests;
