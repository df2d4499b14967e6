use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::test_support;

#[tokio::test]
async fn admin_promotes_user_and_grants_premium() {
    let Some(ctx) = test_support::setup_test_context().await else { return };

    let admin = test_support::insert_user(ctx.state.db(), "admin@example.com", UserRole::Admin).await;
    let user = test_support::insert_user(ctx.state.db(), "maria@example.com", UserRole::Student).await;
    let admin_token = test_support::bearer_token(&admin, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/users/{}", user.id),
            Some(&admin_token),
            Some(json!({
                "role": "teacher",
                "subscription_status": "premium",
                "subscription_expires_at": "2999-01-01T00:00:00Z"
            })),
        ))
        .await
        .expect("update user");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["role"], "teacher");
    assert_eq!(body["subscription_expires_at"], "2999-01-01T00:00:00Z");

    let user_token = test_support::bearer_token(&user, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/users/me/subscription",
            Some(&user_token),
            None,
        ))
        .await
        .expect("subscription");
    let body = test_support::read_json(response).await;
    assert_eq!(body["status"], "premium");
    assert_eq!(body["active"], true);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/users?role=teacher",
            Some(&admin_token),
            None,
        ))
        .await
        .expect("list users");
    let body = test_support::read_json(response).await;
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["items"][0]["email"], "maria@example.com");
}

#[tokio::test]
async fn students_cannot_use_admin_endpoints() {
    let Some(ctx) = test_support::setup_test_context().await else { return };

    let student =
        test_support::insert_user(ctx.state.db(), "alumno@example.com", UserRole::Student).await;
    let token = test_support::bearer_token(&student, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/users/{}", student.id),
            Some(&token),
            Some(json!({"role": "admin"})),
        ))
        .await
        .expect("self promote");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "response: {body}");
    assert_eq!(body["code"], "forbidden");
}

#[tokio::test]
async fn profile_update_validates_name() {
    let Some(ctx) = test_support::setup_test_context().await else { return };

    let student =
        test_support::insert_user(ctx.state.db(), "perfil@example.com", UserRole::Student).await;
    let token = test_support::bearer_token(&student, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            "/api/users/me",
            Some(&token),
            Some(json!({"full_name": "X"})),
        ))
        .await
        .expect("bad update");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PATCH,
            "/api/users/me",
            Some(&token),
            Some(json!({"fullName": "Perfil Actualizado"})),
        ))
        .await
        .expect("update");
    let body = test_support::read_json(response).await;
    assert_eq!(body["full_name"], "Perfil Actualizado");
}
