use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::test_support::{self, TestContext};

async fn send(
    ctx: &TestContext,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), body))
        .await
        .expect("request");
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return (status, Value::Null);
    }
    (status, test_support::read_json(response).await)
}

#[tokio::test]
async fn replies_nest_exactly_one_level() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let pool = ctx.state.db();

    let author = test_support::insert_user(pool, "autora@example.com", UserRole::Student).await;
    let token = test_support::bearer_token(&author, ctx.state.settings());

    let (status, post) = send(
        &ctx,
        Method::POST,
        "/api/forum/posts",
        &token,
        Some(json!({"title": "¿Cómo practico?", "content": "Consejos", "language": "Inglés"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {post}");
    let post_id = post["id"].as_str().expect("post id").to_string();
    let replies_uri = format!("/api/forum/posts/{post_id}/replies");

    let (status, top) =
        send(&ctx, Method::POST, &replies_uri, &token, Some(json!({"content": "Primera"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let top_id = top["id"].as_str().expect("top id").to_string();

    let (_, child) = send(
        &ctx,
        Method::POST,
        &replies_uri,
        &token,
        Some(json!({"content": "Hija", "parent_reply_id": top_id})),
    )
    .await;
    let child_id = child["id"].as_str().expect("child id").to_string();
    assert_eq!(child["parent_reply_id"], top_id.as_str());

    let (_, grandchild) = send(
        &ctx,
        Method::POST,
        &replies_uri,
        &token,
        Some(json!({"content": "Nieta", "parent_reply_id": child_id})),
    )
    .await;
    assert_eq!(grandchild["parent_reply_id"], top_id.as_str());

    let (status, threads) = send(&ctx, Method::GET, &replies_uri, &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let threads = threads.as_array().expect("threads");
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0]["id"], top_id.as_str());
    let children = threads[0]["children"].as_array().expect("children");
    assert_eq!(children.len(), 2);
    assert!(children.iter().all(|c| c.get("children").is_none()));

    let (_, post) =
        send(&ctx, Method::GET, &format!("/api/forum/posts/{post_id}"), &token, None).await;
    assert_eq!(post["reply_count"], 3);
    assert_eq!(post["view_count"], 1);
    assert!(post["last_reply_at"].is_string());
}

#[tokio::test]
async fn parent_from_another_post_is_rejected() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let pool = ctx.state.db();

    let author = test_support::insert_user(pool, "autora@example.com", UserRole::Student).await;
    let token = test_support::bearer_token(&author, ctx.state.settings());

    let mut post_ids = Vec::new();
    for title in ["Primer tema", "Segundo tema"] {
        let (_, post) = send(
            &ctx,
            Method::POST,
            "/api/forum/posts",
            &token,
            Some(json!({"title": title, "content": "Texto", "language": "Francés"})),
        )
        .await;
        post_ids.push(post["id"].as_str().expect("id").to_string());
    }

    let (_, reply) = send(
        &ctx,
        Method::POST,
        &format!("/api/forum/posts/{}/replies", post_ids[0]),
        &token,
        Some(json!({"content": "Hola"})),
    )
    .await;

    let (status, body) = send(
        &ctx,
        Method::POST,
        &format!("/api/forum/posts/{}/replies", post_ids[1]),
        &token,
        Some(json!({"content": "Cruzada", "parent_reply_id": reply["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");
}

#[tokio::test]
async fn locked_posts_reject_replies_and_only_authors_edit() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let pool = ctx.state.db();

    let teacher = test_support::insert_user(pool, "profe@example.com", UserRole::Teacher).await;
    let student = test_support::insert_user(pool, "alumna@example.com", UserRole::Student).await;
    let teacher_token = test_support::bearer_token(&teacher, ctx.state.settings());
    let student_token = test_support::bearer_token(&student, ctx.state.settings());

    let (_, post) = send(
        &ctx,
        Method::POST,
        "/api/forum/posts",
        &teacher_token,
        Some(json!({"title": "Avisos", "content": "Reglas del foro", "language": "Español"})),
    )
    .await;
    let post_uri = format!("/api/forum/posts/{}", post["id"].as_str().expect("id"));

    let (status, _) = send(
        &ctx,
        Method::PATCH,
        &post_uri,
        &student_token,
        Some(json!({"title": "Cambiado"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &ctx,
        Method::PATCH,
        &post_uri,
        &teacher_token,
        Some(json!({"is_locked": true, "is_pinned": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_locked"], true);

    let (status, _) = send(
        &ctx,
        Method::POST,
        &format!("{post_uri}/replies"),
        &student_token,
        Some(json!({"content": "¿Puedo?"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&ctx, Method::DELETE, &post_uri, &teacher_token, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn pinned_posts_come_first_and_pages_are_bounded() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let pool = ctx.state.db();

    let teacher = test_support::insert_user(pool, "profe@example.com", UserRole::Teacher).await;
    let token = test_support::bearer_token(&teacher, ctx.state.settings());

    let mut ids = Vec::new();
    for title in ["Tema uno", "Tema dos", "Tema tres"] {
        let (_, post) = send(
            &ctx,
            Method::POST,
            "/api/forum/posts",
            &token,
            Some(json!({"title": title, "content": "Texto", "language": "Inglés"})),
        )
        .await;
        ids.push(post["id"].as_str().expect("id").to_string());
    }

    send(
        &ctx,
        Method::PATCH,
        &format!("/api/forum/posts/{}", ids[0]),
        &token,
        Some(json!({"is_pinned": true})),
    )
    .await;

    let (status, page) =
        send(&ctx, Method::GET, "/api/forum/posts?limit=2&language=ingl%C3%A9s", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_count"], 3);
    assert_eq!(page["limit"], 2);
    let items = page["items"].as_array().expect("items");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], ids[0].as_str());
    assert_eq!(items[0]["author_name"], "profe");
}

#[tokio::test]
async fn blank_text_is_rejected_and_text_is_stored_trimmed() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let pool = ctx.state.db();

    let author = test_support::insert_user(pool, "autora@example.com", UserRole::Student).await;
    let token = test_support::bearer_token(&author, ctx.state.settings());

    let (status, body) = send(
        &ctx,
        Method::POST,
        "/api/forum/posts",
        &token,
        Some(json!({"title": "     ", "content": "Hola", "language": "Inglés"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "response: {body}");
    assert_eq!(body["code"], "validation");

    let (status, post) = send(
        &ctx,
        Method::POST,
        "/api/forum/posts",
        &token,
        Some(json!({
            "title": "  Verbos irregulares  ",
            "content": " Lista ",
            "language": "Inglés"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {post}");
    assert_eq!(post["title"], "Verbos irregulares");
    assert_eq!(post["content"], "Lista");
    let post_id = post["id"].as_str().expect("post id").to_string();
    let replies_uri = format!("/api/forum/posts/{post_id}/replies");

    let (status, body) =
        send(&ctx, Method::POST, &replies_uri, &token, Some(json!({"content": "    "}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "response: {body}");
    assert_eq!(body["code"], "validation");

    let (status, reply) =
        send(&ctx, Method::POST, &replies_uri, &token, Some(json!({"content": " Gracias "}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["content"], "Gracias");
    let reply_id = reply["id"].as_str().expect("reply id").to_string();

    let (status, _) = send(
        &ctx,
        Method::PATCH,
        &format!("/api/forum/replies/{reply_id}"),
        &token,
        Some(json!({"content": "\n\t "})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let stored: String = sqlx::query_scalar("SELECT content FROM forum_replies WHERE id = $1")
        .bind(&reply_id)
        .fetch_one(pool)
        .await
        .expect("stored reply");
    assert_eq!(stored, "Gracias");

    let (status, _) = send(&ctx, Method::GET, &replies_uri, &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM forum_replies WHERE post_id = $1")
        .bind(&post_id)
        .fetch_one(pool)
        .await
        .expect("count replies");
    assert_eq!(count, 1);
}
