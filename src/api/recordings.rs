use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_course_owner, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::recordings::RecordingScope;
use crate::schemas::recording::{
    RecordingCreate, RecordingListQuery, RecordingResponse, ViewCountResponse,
};
use crate::services::subscription;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_recordings).post(create_recording))
        .route("/:recording_id", delete(delete_recording))
        .route("/:recording_id/views", post(record_view))
}

fn scope_for(user: &User, now: time::PrimitiveDateTime) -> RecordingScope {
    match user.role {
        UserRole::Admin => RecordingScope::Everything,
        UserRole::Teacher => RecordingScope::TaughtBy(user.id.clone()),
        UserRole::Student => RecordingScope::EnrolledStudent {
            student_id: user.id.clone(),
            include_premium: subscription::is_active(
                user.subscription_status,
                user.subscription_expires_at,
                now,
            ),
        },
    }
}

async fn list_recordings(
    Query(params): Query<RecordingListQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<RecordingResponse>>, ApiError> {
    let now = primitive_now_utc();
    let scope = scope_for(&user, now);

    let recordings =
        repositories::recordings::list(state.db(), &scope, params.course_id.as_deref(), now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list recordings"))?;

    Ok(Json(recordings.into_iter().map(RecordingResponse::from_db).collect()))
}

async fn create_recording(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<RecordingCreate>,
) -> Result<(StatusCode, Json<RecordingResponse>), ApiError> {
    payload.validate()?;
    require_course_owner(&state, &user, &payload.course_id).await?;

    let recording = repositories::recordings::create(
        state.db(),
        repositories::recordings::CreateRecording {
            id: &Uuid::new_v4().to_string(),
            course_id: &payload.course_id,
            title: &payload.title,
            url: &payload.url,
            is_premium: payload.is_premium,
            expires_at: payload.expires_at,
            created_by: &user.id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create recording"))?;

    tracing::info!(
        user_id = %user.id,
        course_id = %recording.course_id,
        recording_id = %recording.id,
        action = "recording_create",
        "Recording published"
    );

    Ok((StatusCode::CREATED, Json(RecordingResponse::from_db(recording))))
}

async fn delete_recording(
    Path(recording_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let recording = repositories::recordings::find_by_id(state.db(), &recording_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch recording"))?
        .ok_or_else(|| ApiError::NotFound("Recording not found".to_string()))?;

    require_course_owner(&state, &user, &recording.course_id).await?;

    repositories::recordings::delete(state.db(), &recording_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete recording"))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn record_view(
    Path(recording_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ViewCountResponse>, ApiError> {
    if user.role == UserRole::Student {
        let recording = repositories::recordings::find_by_id(state.db(), &recording_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch recording"))?
            .ok_or_else(|| ApiError::NotFound("Recording not found".to_string()))?;
        let enrolled =
            repositories::enrollments::has_active(state.db(), &user.id, &recording.course_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check enrollment"))?;
        if !enrolled {
            return Err(ApiError::NotFound("Recording not found".to_string()));
        }
    }

    let view_count = repositories::recordings::increment_views(state.db(), &recording_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to record view"))?
        .ok_or_else(|| ApiError::NotFound("Recording not found".to_string()))?;

    Ok(Json(ViewCountResponse { id: recording_id, view_count }))
}
