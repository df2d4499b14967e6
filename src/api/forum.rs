use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_author, CurrentUser};
use crate::api::pagination;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::repositories::forum::PostFilter;
use crate::schemas::forum::{
    CategoryResponse, PostCreate, PostListQuery, PostPageResponse, PostResponse, PostUpdate,
    ReplyCreate, ReplyResponse, ReplyUpdate, ThreadResponse, MAX_POST_LIMIT,
};
use crate::services::forum_threads::{build_threads, effective_parent, NestingError};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:post_id", get(get_post).patch(update_post).delete(delete_post))
        .route("/posts/:post_id/replies", get(list_replies).post(create_reply))
        .route("/replies/:reply_id", patch(update_reply).delete(delete_reply))
}

async fn list_categories(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = repositories::forum::list_categories(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list forum categories"))?;

    Ok(Json(categories.into_iter().map(CategoryResponse::from_db).collect()))
}

async fn list_posts(
    Query(params): Query<PostListQuery>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PostPageResponse>, ApiError> {
    let (offset, limit) = pagination::bounds(params.offset, params.limit, MAX_POST_LIMIT);
    let filter = PostFilter {
        course_id: params.course_id,
        category_id: params.category_id,
        language: params.language,
    };

    let (posts, total_count) = repositories::forum::list_posts(state.db(), &filter, limit, offset)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list forum posts"))?;

    Ok(Json(PostPageResponse {
        items: posts.into_iter().map(PostResponse::from_row).collect(),
        total_count,
        limit,
        offset,
    }))
}

async fn create_post(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<PostCreate>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    payload.validate()?;

    if let Some(category_id) = payload.category_id.as_deref() {
        let exists = repositories::forum::category_exists(state.db(), category_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check forum category"))?;
        if !exists {
            return Err(ApiError::BadRequest("Unknown forum category".to_string()));
        }
    }

    if let Some(course_id) = payload.course_id.as_deref() {
        let course = repositories::courses::find_by_id(state.db(), course_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch course"))?;
        if course.is_none() {
            return Err(ApiError::BadRequest("Unknown course".to_string()));
        }
    }

    let post = repositories::forum::create_post(
        state.db(),
        repositories::forum::CreatePost {
            id: &Uuid::new_v4().to_string(),
            title: &payload.title,
            content: &payload.content,
            language: &payload.language,
            author_id: &user.id,
            course_id: payload.course_id.as_deref(),
            category_id: payload.category_id.as_deref(),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create forum post"))?;

    tracing::info!(
        user_id = %user.id,
        post_id = %post.id,
        action = "forum_post_create",
        "Forum post created"
    );

    Ok((StatusCode::CREATED, Json(PostResponse::from_db(post, Some(user.full_name)))))
}

async fn get_post(
    Path(post_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PostResponse>, ApiError> {
    let found = repositories::forum::increment_post_views(state.db(), &post_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to record post view"))?;
    if !found {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }

    let post = repositories::forum::find_post(state.db(), &post_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch forum post"))?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    Ok(Json(PostResponse::from_row(post)))
}

async fn update_post(
    Path(post_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<PostUpdate>,
) -> Result<Json<PostResponse>, ApiError> {
    payload.validate()?;

    let existing = repositories::forum::find_post(state.db(), &post_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch forum post"))?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    require_author(&user, &existing.post.author_id)?;

    if (payload.is_pinned.is_some() || payload.is_locked.is_some()) && !user.role.can_teach() {
        return Err(ApiError::Forbidden("Only teachers can pin or lock posts"));
    }

    let updated = repositories::forum::update_post(
        state.db(),
        &post_id,
        repositories::forum::UpdatePost {
            title: payload.title,
            content: payload.content,
            language: payload.language,
            is_pinned: payload.is_pinned,
            is_locked: payload.is_locked,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update forum post"))?
    .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    Ok(Json(PostResponse::from_db(updated, Some(existing.author_name))))
}

async fn delete_post(
    Path(post_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let existing = repositories::forum::find_post(state.db(), &post_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch forum post"))?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    require_author(&user, &existing.post.author_id)?;

    repositories::forum::delete_post(state.db(), &post_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete forum post"))?;

    tracing::info!(
        user_id = %user.id,
        post_id = %post_id,
        action = "forum_post_delete",
        "Forum post deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn list_replies(
    Path(post_id): Path<String>,
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ThreadResponse>>, ApiError> {
    repositories::forum::find_post(state.db(), &post_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch forum post"))?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    let replies = repositories::forum::list_replies(state.db(), &post_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list replies"))?;

    Ok(Json(build_threads(replies).into_iter().map(ThreadResponse::from_thread).collect()))
}

async fn create_reply(
    Path(post_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ReplyCreate>,
) -> Result<(StatusCode, Json<ReplyResponse>), ApiError> {
    payload.validate()?;

    let post = repositories::forum::find_post(state.db(), &post_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch forum post"))?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    if post.post.is_locked {
        return Err(ApiError::Forbidden("This post is locked"));
    }

    let parent_reply_id = match payload.parent_reply_id.as_deref() {
        Some(parent_id) => {
            let parent = repositories::forum::find_reply(state.db(), parent_id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to fetch parent reply"))?
                .ok_or_else(|| ApiError::BadRequest("Parent reply not found".to_string()))?;
            let parent = effective_parent(&post_id, &parent).map_err(|err| match err {
                NestingError::OtherPost => {
                    ApiError::BadRequest("Parent reply belongs to another post".to_string())
                }
            })?;
            Some(parent)
        }
        None => None,
    };

    let reply = repositories::forum::create_reply(
        state.db(),
        repositories::forum::CreateReply {
            id: &Uuid::new_v4().to_string(),
            post_id: &post_id,
            author_id: &user.id,
            parent_reply_id: parent_reply_id.as_deref(),
            content: &payload.content,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create reply"))?;

    Ok((StatusCode::CREATED, Json(ReplyResponse::from_db(reply, Some(user.full_name)))))
}

async fn update_reply(
    Path(reply_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ReplyUpdate>,
) -> Result<Json<ReplyResponse>, ApiError> {
    payload.validate()?;

    let existing = repositories::forum::find_reply(state.db(), &reply_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch reply"))?
        .ok_or_else(|| ApiError::NotFound("Reply not found".to_string()))?;
    require_author(&user, &existing.author_id)?;

    let updated = repositories::forum::update_reply(
        state.db(),
        &reply_id,
        &payload.content,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update reply"))?
    .ok_or_else(|| ApiError::NotFound("Reply not found".to_string()))?;

    Ok(Json(ReplyResponse::from_db(updated, None)))
}

async fn delete_reply(
    Path(reply_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let existing = repositories::forum::find_reply(state.db(), &reply_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch reply"))?
        .ok_or_else(|| ApiError::NotFound("Reply not found".to_string()))?;
    require_author(&user, &existing.author_id)?;

    repositories::forum::delete_reply(state.db(), &existing)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete reply"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests;
