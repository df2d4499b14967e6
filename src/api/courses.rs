use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{is_course_owner, require_course_owner, CurrentTeacher, CurrentUser};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::is_foreign_key_violation;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::courses::CourseFilter;
use crate::schemas::course::{
    AddStudentRequest, CourseCreate, CourseListQuery, CourseResponse, CourseSummaryResponse,
    CourseUpdate, EnrolledStudentResponse, EnrollmentResponse,
};
use crate::services::enrollment;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/:course_id", get(get_course).patch(update_course).delete(delete_course))
        .route("/:course_id/enroll", post(enroll))
        .route("/:course_id/unenroll", post(unenroll))
        .route("/:course_id/students", get(list_students).post(add_student))
}

async fn list_courses(
    Query(params): Query<CourseListQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseSummaryResponse>>, ApiError> {
    let filter = CourseFilter {
        language: params.language,
        level: params.level,
        teacher_id: params.teacher_id,
        include_inactive: false,
    };

    let courses = repositories::courses::list_with_counts(state.db(), &user.id, &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    Ok(Json(courses.into_iter().map(CourseSummaryResponse::from_db).collect()))
}

async fn create_course(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    payload.validate()?;

    let course = repositories::courses::create(
        state.db(),
        repositories::courses::CreateCourse {
            id: &Uuid::new_v4().to_string(),
            title: &payload.title,
            description: payload.description.as_deref(),
            language: &payload.language,
            level: payload.level,
            teacher_id: &teacher.id,
            schedule: &payload.schedule,
            max_students: payload.max_students,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create course"))?;

    tracing::info!(
        teacher_id = %teacher.id,
        course_id = %course.id,
        action = "course_create",
        "Teacher created course"
    );

    Ok((StatusCode::CREATED, Json(CourseResponse::from_db(course))))
}

async fn get_course(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CourseSummaryResponse>, ApiError> {
    let course = repositories::courses::find_with_count(state.db(), &course_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    if !course.course.is_active && !is_course_owner(&user, &course.course) {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    Ok(Json(CourseSummaryResponse::from_db(course)))
}

async fn update_course(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CourseUpdate>,
) -> Result<Json<CourseResponse>, ApiError> {
    payload.validate()?;
    require_course_owner(&state, &user, &course_id).await?;

    let updated = repositories::courses::update(
        state.db(),
        &course_id,
        repositories::courses::UpdateCourse {
            title: payload.title,
            description: payload.description,
            language: payload.language,
            level: payload.level,
            schedule: payload.schedule,
            max_students: payload.max_students,
            is_active: payload.is_active,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update course"))?
    .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    Ok(Json(CourseResponse::from_db(updated)))
}

async fn delete_course(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    require_course_owner(&state, &user, &course_id).await?;

    let deleted = repositories::courses::delete(state.db(), &course_id).await.map_err(|e| {
        if is_foreign_key_violation(&e) {
            ApiError::Conflict("Cannot delete course due to dependent records".to_string())
        } else {
            ApiError::internal(e, "Failed to delete course")
        }
    })?;

    if !deleted {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    tracing::info!(
        user_id = %user.id,
        course_id = %course_id,
        action = "course_delete",
        "Course deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn enroll(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    if user.role != UserRole::Student {
        return Err(ApiError::Forbidden("Only students can enroll in courses"));
    }

    enroll_student(&state, &course_id, &user).await
}

/// Shared by self-enrollment and teacher-driven enrollment by email.
async fn enroll_student(
    state: &AppState,
    course_id: &str,
    student: &User,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    match enrollment::enroll(state.db(), course_id, &student.id, primitive_now_utc()).await {
        Ok(created) => {
            metrics::record_enrollment("enrolled");
            tracing::info!(
                student_id = %student.id,
                course_id = %course_id,
                enrollment_id = %created.id,
                action = "enroll",
                "Student enrolled"
            );
            Ok((StatusCode::CREATED, Json(EnrollmentResponse::from_db(created))))
        }
        Err(error) => {
            metrics::record_enrollment(error.outcome());
            Err(error.into())
        }
    }
}

async fn unenroll(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let enrollment = repositories::enrollments::deactivate_for_student(
        state.db(),
        &user.id,
        &course_id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to unenroll"))?
    .ok_or_else(|| ApiError::NotFound("No active enrollment in this course".to_string()))?;

    tracing::info!(
        student_id = %user.id,
        course_id = %course_id,
        action = "unenroll",
        "Student unenrolled"
    );

    Ok(Json(EnrollmentResponse::from_db(enrollment)))
}

async fn list_students(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<EnrolledStudentResponse>>, ApiError> {
    require_course_owner(&state, &user, &course_id).await?;

    let students =
        repositories::enrollments::list_active_students_for_course(state.db(), &course_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    Ok(Json(students.into_iter().map(EnrolledStudentResponse::from_db).collect()))
}

async fn add_student(
    Path(course_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AddStudentRequest>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    payload.validate()?;
    require_course_owner(&state, &user, &course_id).await?;

    let student = repositories::users::find_by_email(state.db(), payload.email.trim())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to look up student"))?
        .ok_or_else(|| ApiError::NotFound("No registered user with that email".to_string()))?;

    if student.role != UserRole::Student {
        return Err(ApiError::BadRequest("Only students can be enrolled".to_string()));
    }

    enroll_student(&state, &course_id, &student).await
}

#[cfg(test)]
mod tests;
