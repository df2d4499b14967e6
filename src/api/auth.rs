use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::redis::AUTH_RATE_LIMIT;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::core::{metrics, security};
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::schemas::user::UserResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify", get(verify))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.validate()?;

    if !state.redis().allow("register", &payload.email, AUTH_RATE_LIMIT).await {
        return Err(ApiError::TooManyRequests("Demasiados intentos, intenta más tarde"));
    }

    let existing = repositories::users::find_by_email(state.db(), &payload.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Este correo ya está registrado".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    // Self-registration always yields a student; roles change through admins.
    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email: &payload.email,
            hashed_password,
            full_name: &payload.full_name,
            role: UserRole::Student,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            ApiError::Conflict("Este correo ya está registrado".to_string())
        } else {
            ApiError::internal(e, "Failed to create user")
        }
    })?;

    tracing::info!(user_id = %user.id, action = "register", "User registered");

    Ok((StatusCode::CREATED, Json(issue_token(&state, user)?)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.validate()?;

    if !state.redis().allow("login", &payload.email, AUTH_RATE_LIMIT).await {
        metrics::record_login("rate_limited");
        return Err(ApiError::TooManyRequests("Demasiados intentos, intenta más tarde"));
    }

    let user = repositories::users::find_by_email(state.db(), &payload.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

    let Some(user) = user else {
        metrics::record_login("invalid_credentials");
        return Err(ApiError::Unauthorized("Correo o contraseña incorrectos"));
    };

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Correo o contraseña incorrectos"))?;
    if !verified {
        metrics::record_login("invalid_credentials");
        return Err(ApiError::Unauthorized("Correo o contraseña incorrectos"));
    }

    if !user.is_active {
        metrics::record_login("inactive");
        return Err(ApiError::Forbidden("La cuenta está desactivada"));
    }

    metrics::record_login("success");
    Ok(Json(issue_token(&state, user)?))
}

async fn verify(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

fn issue_token(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let token = security::create_access_token(&user.id, user.role, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(AuthResponse { token, token_type: "bearer", user: UserResponse::from_db(user) })
}
