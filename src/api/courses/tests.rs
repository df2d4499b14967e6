use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::test_support;

#[tokio::test]
async fn enroll_under_capacity_increments_count() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let pool = ctx.state.db();

    let teacher = test_support::insert_user(pool, "profe@example.com", UserRole::Teacher).await;
    let student = test_support::insert_user(pool, "alumna@example.com", UserRole::Student).await;
    let course = test_support::insert_course(pool, &teacher.id, "Inglés conversacional", 2).await;
    let token = test_support::bearer_token(&student, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/courses/{}/enroll", course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("enroll");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["status"], "active");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/courses/{}", course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("get course");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["enrolled_count"], 1);
    assert_eq!(body["available_spots"], 1);
    assert_eq!(body["is_enrolled"], true);
}

#[tokio::test]
async fn enroll_in_full_course_is_rejected_without_changing_count() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let pool = ctx.state.db();

    let teacher = test_support::insert_user(pool, "profe@example.com", UserRole::Teacher).await;
    let first = test_support::insert_user(pool, "uno@example.com", UserRole::Student).await;
    let second = test_support::insert_user(pool, "dos@example.com", UserRole::Student).await;
    let course = test_support::insert_course(pool, &teacher.id, "Francés A1", 1).await;

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
        .expect("first enroll");
    assert_eq!(response.status(), StatusCode::CREATED);

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
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = test_support::read_json(response).await;
    assert_eq!(body["code"], "course_full");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/courses/{}", course.id),
            Some(&second_token),
            None,
        ))
        .await
        .expect("get course");
    let body = test_support::read_json(response).await;
    assert_eq!(body["enrolled_count"], 1);
    assert_eq!(body["available_spots"], 0);
    assert_eq!(body["is_enrolled"], false);
}

#[tokio::test]
async fn enrolling_twice_is_a_conflict_and_unenroll_frees_the_seat() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let pool = ctx.state.db();

    let teacher = test_support::insert_user(pool, "profe@example.com", UserRole::Teacher).await;
    let student = test_support::insert_user(pool, "alumno@example.com", UserRole::Student).await;
    let course = test_support::insert_course(pool, &teacher.id, "Alemán", 3).await;
    let token = test_support::bearer_token(&student, ctx.state.settings());
    let enroll_uri = format!("/api/courses/{}/enroll", course.id);

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::POST, &enroll_uri, Some(&token), None))
            .await
            .expect("enroll");
        assert_eq!(response.status(), expected);
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/courses/{}/unenroll", course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("unenroll");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["status"], "inactive");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/courses/{}/unenroll", course.id),
            Some(&token),
            None,
        ))
        .await
        .expect("second unenroll");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &enroll_uri, Some(&token), None))
        .await
        .expect("re-enroll");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn listing_courses_twice_yields_identical_results() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let pool = ctx.state.db();

    let teacher = test_support::insert_user(pool, "profe@example.com", UserRole::Teacher).await;
    let student = test_support::insert_user(pool, "alumna@example.com", UserRole::Student).await;
    test_support::insert_course(pool, &teacher.id, "Inglés", 5).await;
    test_support::insert_course(pool, &teacher.id, "Italiano", 5).await;
    let token = test_support::bearer_token(&student, ctx.state.settings());

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/courses", Some(&token), None))
            .await
            .expect("list courses");
        assert_eq!(response.status(), StatusCode::OK);
        bodies.push(test_support::read_json(response).await);
    }

    assert_eq!(bodies[0].as_array().map(Vec::len), Some(2));
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn only_owner_manages_course_and_students_cannot_create() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let pool = ctx.state.db();

    let owner = test_support::insert_user(pool, "owner@example.com", UserRole::Teacher).await;
    let other = test_support::insert_user(pool, "other@example.com", UserRole::Teacher).await;
    let student = test_support::insert_user(pool, "alumna@example.com", UserRole::Student).await;
    let course = test_support::insert_course(pool, &owner.id, "Portugués", 4).await;

    let other_token = test_support::bearer_token(&other, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/courses/{}", course.id),
            Some(&other_token),
            Some(json!({"title": "Robado"})),
        ))
        .await
        .expect("patch");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let student_token = test_support::bearer_token(&student, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/courses",
            Some(&student_token),
            Some(json!({
                "title": "Mi curso",
                "language": "Inglés",
                "level": "beginner",
                "schedule": "Vie 17:00"
            })),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let owner_token = test_support::bearer_token(&owner, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/courses/{}", course.id),
            Some(&owner_token),
            Some(json!({"max_students": 6, "schedule": "Mar 19:00"})),
        ))
        .await
        .expect("owner patch");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["max_students"], 6);
    assert_eq!(body["schedule"], "Mar 19:00");
    assert_eq!(body["title"], "Portugués");
}

#[tokio::test]
async fn teacher_adds_student_by_email() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let pool = ctx.state.db();

    let teacher = test_support::insert_user(pool, "profe@example.com", UserRole::Teacher).await;
    let colleague = test_support::insert_user(pool, "colega@example.com", UserRole::Teacher).await;
    test_support::insert_user(pool, "alumna@example.com", UserRole::Student).await;
    let course = test_support::insert_course(pool, &teacher.id, "Japonés", 4).await;
    let token = test_support::bearer_token(&teacher, ctx.state.settings());
    let uri = format!("/api/courses/{}/students", course.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &uri,
            Some(&token),
            Some(json!({"email": "ALUMNA@example.com"})),
        ))
        .await
        .expect("add student");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &uri,
            Some(&token),
            Some(json!({"email": colleague.email})),
        ))
        .await
        .expect("add teacher");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &uri,
            Some(&token),
            Some(json!({"email": "nadie@example.com"})),
        ))
        .await
        .expect("add unknown");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &uri, Some(&token), None))
        .await
        .expect("list students");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    let students = body.as_array().expect("students");
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["email"], "alumna@example.com");
}

#[tokio::test]
async fn course_with_enrollments_cannot_be_deleted() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let pool = ctx.state.db();

    let teacher = test_support::insert_user(pool, "profe@example.com", UserRole::Teacher).await;
    let student = test_support::insert_user(pool, "alumna@example.com", UserRole::Student).await;
    let course = test_support::insert_course(pool, &teacher.id, "Italiano A2", 5).await;
    let empty = test_support::insert_course(pool, &teacher.id, "Italiano B1", 5).await;

    let student_token = test_support::bearer_token(&student, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/courses/{}/enroll", course.id),
            Some(&student_token),
            None,
        ))
        .await
        .expect("enroll");
    assert_eq!(response.status(), StatusCode::CREATED);

    let teacher_token = test_support::bearer_token(&teacher, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/courses/{}", course.id),
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("delete");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["code"], "conflict");
    assert_eq!(body["detail"], "Cannot delete course due to dependent records");

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
        .bind(&course.id)
        .fetch_one(pool)
        .await
        .expect("count enrollments");
    assert_eq!(remaining, 1);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/courses/{}", empty.id),
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("delete empty");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
