use std::collections::HashMap;
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_course_owner, CurrentUser};
use crate::api::validation::{normalize_extension, validate_submission_file};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::{ActivitySubmission, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::activities::{ActivityWithCourse, UpsertSubmission};
use crate::schemas::activity::{
    ActivityCreate, ActivityResponse, GradeRequest, SubmissionResponse, SubmissionUpsert,
};
use crate::services::storage;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_activities).post(create_activity))
        .route("/submissions/me", get(my_submissions))
        .route("/submissions/:submission_id/grade", patch(grade_submission))
        .route("/submissions/:submission_id/download", get(download_submission))
        .route("/:activity_id/submission", put(upsert_submission))
        .route("/:activity_id/submission/upload", post(upload_submission))
        .route("/:activity_id/submissions", get(list_activity_submissions))
}

#[derive(Debug, Serialize)]
struct DownloadResponse {
    url: String,
    expires_in_seconds: Option<u64>,
}

async fn list_activities(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ActivityResponse>>, ApiError> {
    let activities = match user.role {
        UserRole::Student => {
            let activities = repositories::activities::list_for_student(state.db(), &user.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to list activities"))?;
            let mut submissions: HashMap<String, SubmissionResponse> =
                repositories::activities::list_submissions_for_user(state.db(), &user.id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?
                    .into_iter()
                    .map(|row| {
                        (row.submission.activity_id.clone(), SubmissionResponse::with_activity(row))
                    })
                    .collect();

            activities
                .into_iter()
                .map(|row| {
                    let submission = submissions.remove(&row.activity.id);
                    ActivityResponse::from_row(row, submission)
                })
                .collect()
        }
        UserRole::Teacher | UserRole::Admin => {
            let teacher_id = (user.role == UserRole::Teacher).then_some(user.id.as_str());
            repositories::activities::list_for_teacher(state.db(), teacher_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to list activities"))?
                .into_iter()
                .map(|row| ActivityResponse::from_row(row, None))
                .collect()
        }
    };

    Ok(Json(activities))
}

async fn create_activity(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ActivityCreate>,
) -> Result<(StatusCode, Json<ActivityResponse>), ApiError> {
    payload.validate()?;
    let course = require_course_owner(&state, &user, &payload.course_id).await?;

    let allowed_file_types: Vec<String> = payload
        .allowed_file_types
        .iter()
        .map(|entry| normalize_extension(entry))
        .filter(|entry| !entry.is_empty())
        .collect();

    let activity = repositories::activities::create(
        state.db(),
        repositories::activities::CreateActivity {
            id: &Uuid::new_v4().to_string(),
            course_id: &course.id,
            title: &payload.title,
            description: &payload.description,
            due_date: payload.due_date,
            max_file_size_mb: payload.max_file_size_mb,
            allowed_file_types: &allowed_file_types,
            created_by: &user.id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create activity"))?;

    tracing::info!(
        user_id = %user.id,
        course_id = %course.id,
        activity_id = %activity.id,
        action = "activity_create",
        "Weekly activity created"
    );

    Ok((StatusCode::CREATED, Json(ActivityResponse::from_db(activity, Some(course.title)))))
}

/// Loads an active activity the student may submit to.
async fn submittable_activity(
    state: &AppState,
    user: &User,
    activity_id: &str,
) -> Result<ActivityWithCourse, ApiError> {
    let activity = repositories::activities::find_by_id(state.db(), activity_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch activity"))?
        .filter(|row| row.activity.is_active)
        .ok_or_else(|| ApiError::NotFound("Activity not found".to_string()))?;

    let enrolled =
        repositories::enrollments::has_active(state.db(), &user.id, &activity.activity.course_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check enrollment"))?;
    if !enrolled {
        return Err(ApiError::Forbidden("You are not enrolled in this course"));
    }

    Ok(activity)
}

async fn upsert_submission(
    Path(activity_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmissionUpsert>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    payload.validate()?;
    submittable_activity(&state, &user, &activity_id).await?;

    let submission = repositories::activities::upsert_submission(
        state.db(),
        UpsertSubmission {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            activity_id: &activity_id,
            file_url: &payload.file_url,
            file_name: &payload.file_name,
            file_size_bytes: payload.file_size_bytes,
            file_sha256: None,
            comments: payload.comments.as_deref(),
            submitted_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save submission"))?;

    tracing::info!(
        user_id = %user.id,
        activity_id = %activity_id,
        submission_id = %submission.id,
        action = "submission_upsert",
        "Activity submission saved"
    );

    Ok(Json(SubmissionResponse::from_db(submission)))
}

async fn upload_submission(
    Path(activity_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let storage = state.storage().ok_or_else(|| {
        ApiError::ServiceUnavailable("File storage is not configured".to_string())
    })?;
    let activity = submittable_activity(&state, &user, &activity_id).await?;

    let settings = state.settings().storage();
    let activity_cap = u64::try_from(activity.activity.max_file_size_mb).unwrap_or(0);
    let max_size_mb = settings.max_upload_size_mb.min(activity_cap);
    let max_bytes = max_size_mb * 1024 * 1024;

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut comments: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                file_name = field.file_name().map(str::to_string);
                let mut bytes = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
                {
                    if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                        return Err(ApiError::BadRequest(format!(
                            "File size exceeds {max_size_mb}MB limit"
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                file_bytes = Some(bytes);
            }
            "comments" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid comments field".to_string()))?;
                comments = Some(text).filter(|text| !text.trim().is_empty());
            }
            _ => {}
        }
    }

    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    let file_name =
        file_name.ok_or_else(|| ApiError::BadRequest("File name is required".to_string()))?;

    let extension = validate_submission_file(
        &file_name,
        file_bytes.len() as u64,
        &activity.activity.allowed_file_types,
        &settings.allowed_submission_extensions,
        max_size_mb,
    )?;

    let uploaded_at = OffsetDateTime::now_utc();
    let key = storage::submission_key(&user.id, &activity_id, uploaded_at, &extension);
    let stored = storage
        .upload_bytes(&key, storage::content_type_for(&extension), file_bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to upload file to storage"))?;

    let submission = repositories::activities::upsert_submission(
        state.db(),
        UpsertSubmission {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            activity_id: &activity_id,
            file_url: &stored.key,
            file_name: &file_name,
            file_size_bytes: stored.size_bytes,
            file_sha256: Some(&stored.sha256),
            comments: comments.as_deref(),
            submitted_at: to_primitive_utc(uploaded_at),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save submission"))?;

    metrics::record_submission_upload(stored.size_bytes);
    tracing::info!(
        user_id = %user.id,
        activity_id = %activity_id,
        submission_id = %submission.id,
        size_bytes = stored.size_bytes,
        action = "submission_upload",
        "Activity submission uploaded"
    );

    Ok(Json(SubmissionResponse::from_db(submission)))
}

async fn my_submissions(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let rows = repositories::activities::list_submissions_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(rows.into_iter().map(SubmissionResponse::with_activity).collect()))
}

async fn list_activity_submissions(
    Path(activity_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let activity = repositories::activities::find_by_id(state.db(), &activity_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch activity"))?
        .ok_or_else(|| ApiError::NotFound("Activity not found".to_string()))?;
    require_activity_teacher(&user, &activity)?;

    let rows = repositories::activities::list_submissions_for_activity(state.db(), &activity_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(rows.into_iter().map(SubmissionResponse::with_student).collect()))
}

/// Loads a submission after checking that `user` teaches its course.
async fn graded_submission_scope(
    state: &AppState,
    user: &User,
    submission_id: &str,
) -> Result<ActivitySubmission, ApiError> {
    let submission = repositories::activities::find_submission(state.db(), submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    let activity = repositories::activities::find_by_id(state.db(), &submission.activity_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch activity"))?
        .ok_or_else(|| ApiError::NotFound("Activity not found".to_string()))?;

    require_activity_teacher(user, &activity)?;

    Ok(submission)
}

fn require_activity_teacher(user: &User, activity: &ActivityWithCourse) -> Result<(), ApiError> {
    let teaches_course = user.role == UserRole::Admin
        || (user.role == UserRole::Teacher && activity.teacher_id == user.id);
    if teaches_course {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Only the course teacher can do this"))
    }
}

async fn grade_submission(
    Path(submission_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    payload.validate()?;
    graded_submission_scope(&state, &user, &submission_id).await?;

    let graded = repositories::activities::grade_submission(
        state.db(),
        &submission_id,
        payload.grade,
        payload.feedback.as_deref(),
        &user.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to grade submission"))?
    .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    tracing::info!(
        teacher_id = %user.id,
        submission_id = %submission_id,
        grade = payload.grade,
        action = "submission_grade",
        "Submission graded"
    );

    Ok(Json(SubmissionResponse::from_db(graded)))
}

/// Uploaded files (those with a digest) live in the bucket and are served
/// through a short-lived presigned URL; linked files are returned as-is.
async fn download_submission(
    Path(submission_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let submission = if user.role == UserRole::Student {
        repositories::activities::find_submission(state.db(), &submission_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
            .filter(|submission| submission.user_id == user.id)
            .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?
    } else {
        graded_submission_scope(&state, &user, &submission_id).await?
    };

    if submission.file_sha256.is_none() {
        return Ok(Json(DownloadResponse { url: submission.file_url, expires_in_seconds: None }));
    }

    let storage = state.storage().ok_or_else(|| {
        ApiError::ServiceUnavailable("File storage is not configured".to_string())
    })?;
    let expires_in = state.settings().storage().signed_url_expire_minutes * 60;
    let url = storage
        .presign_get(&submission.file_url, Duration::from_secs(expires_in))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to sign download URL"))?;

    Ok(Json(DownloadResponse { url, expires_in_seconds: Some(expires_in) }))
}
