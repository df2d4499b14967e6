use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{require_course_owner, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::course::{EnrollmentResponse, EnrollmentStatusUpdate, MyEnrollmentResponse};
use crate::services::enrollment;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(my_enrollments))
        .route("/:enrollment_id", patch(update_status))
}

async fn my_enrollments(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<MyEnrollmentResponse>>, ApiError> {
    let rows = repositories::enrollments::list_active_for_student(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;

    Ok(Json(rows.into_iter().map(MyEnrollmentResponse::from_db).collect()))
}

async fn update_status(
    Path(enrollment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<EnrollmentStatusUpdate>,
) -> Result<Json<EnrollmentResponse>, ApiError> {
    let current = repositories::enrollments::find_by_id(state.db(), &enrollment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch enrollment"))?
        .ok_or_else(|| ApiError::NotFound("Enrollment not found".to_string()))?;

    require_course_owner(&state, &user, &current.course_id).await?;

    let updated =
        enrollment::change_status(state.db(), &enrollment_id, payload.status, primitive_now_utc())
            .await?;

    tracing::info!(
        user_id = %user.id,
        enrollment_id = %updated.id,
        status = ?updated.status,
        action = "enrollment_status",
        "Enrollment status changed"
    );

    Ok(Json(EnrollmentResponse::from_db(updated)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::types::UserRole;
    use crate::test_support;

    #[tokio::test]
    async fn reactivation_respects_capacity() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let pool = ctx.state.db();

        let teacher = test_support::insert_user(pool, "profe@example.com", UserRole::Teacher).await;
        let first = test_support::insert_user(pool, "uno@example.com", UserRole::Student).await;
        let second = test_support::insert_user(pool, "dos@example.com", UserRole::Student).await;
        let course = test_support::insert_course(pool, &teacher.id, "Coreano", 1).await;
        let teacher_token = test_support::bearer_token(&teacher, ctx.state.settings());

        let first_token = test_support::bearer_token(&first, ctx.state.settings());
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/courses/{}/enroll", course.id),
                Some(&first_token),
                None,
            ))
            .await
            .expect("enroll");
        let body = test_support::read_json(response).await;
        let first_enrollment = body["id"].as_str().expect("id").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PATCH,
                &format!("/api/enrollments/{first_enrollment}"),
                Some(&teacher_token),
                Some(json!({"status": "completed"})),
            ))
            .await
            .expect("complete");
        assert_eq!(response.status(), StatusCode::OK);

        let second_token = test_support::bearer_token(&second, ctx.state.settings());
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/courses/{}/enroll", course.id),
                Some(&second_token),
                None,
            ))
            .await
            .expect("second enroll");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PATCH,
                &format!("/api/enrollments/{first_enrollment}"),
                Some(&teacher_token),
                Some(json!({"status": "active"})),
            ))
            .await
            .expect("reactivate");
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = test_support::read_json(response).await;
        assert_eq!(body["code"], "course_full");

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PATCH,
                &format!("/api/enrollments/{first_enrollment}"),
                Some(&second_token),
                Some(json!({"status": "inactive"})),
            ))
            .await
            .expect("student patch");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn my_enrollments_lists_active_courses_only() {
        let Some(ctx) = test_support::setup_test_context().await else { return };
        let pool = ctx.state.db();

        let teacher = test_support::insert_user(pool, "profe@example.com", UserRole::Teacher).await;
        let student = test_support::insert_user(pool, "alumna@example.com", UserRole::Student).await;
        let kept = test_support::insert_course(pool, &teacher.id, "Inglés", 5).await;
        let dropped = test_support::insert_course(pool, &teacher.id, "Chino", 5).await;
        let token = test_support::bearer_token(&student, ctx.state.settings());

        for course_id in [&kept.id, &dropped.id] {
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::POST,
                    &format!("/api/courses/{course_id}/enroll"),
                    Some(&token),
                    None,
                ))
                .await
                .expect("enroll");
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/courses/{}/unenroll", dropped.id),
                Some(&token),
                None,
            ))
            .await
            .expect("unenroll");
        assert_eq!(response.status(), StatusCode::OK);

        let mut bodies = Vec::new();
        for _ in 0..2 {
            let response = ctx
                .app
                .clone()
                .oneshot(test_support::json_request(
                    Method::GET,
                    "/api/enrollments/me",
                    Some(&token),
                    None,
                ))
                .await
                .expect("my enrollments");
            assert_eq!(response.status(), StatusCode::OK);
            bodies.push(test_support::read_json(response).await);
        }

        let items = bodies[0].as_array().expect("items");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["course"]["id"], kept.id.as_str());
        assert_eq!(items[0]["status"], "active");
        assert_eq!(bodies[0], bodies[1]);
    }
}
