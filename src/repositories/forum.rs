use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::{ForumCategory, ForumPost, ForumReply};

const POST_COLUMNS: &str = "p.id, p.title, p.content, p.language, p.author_id, p.course_id, \
                            p.category_id, p.is_pinned, p.is_locked, p.view_count, \
                            p.reply_count, p.last_reply_at, p.created_at, p.updated_at";
const REPLY_COLUMNS: &str =
    "id, post_id, author_id, parent_reply_id, content, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PostWithAuthor {
    #[sqlx(flatten)]
    pub(crate) post: ForumPost,
    pub(crate) author_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ReplyWithAuthor {
    #[sqlx(flatten)]
    pub(crate) reply: ForumReply,
    pub(crate) author_name: String,
}

#[derive(Debug, Default)]
pub(crate) struct PostFilter {
    pub(crate) course_id: Option<String>,
    pub(crate) category_id: Option<String>,
    pub(crate) language: Option<String>,
}

pub(crate) struct CreatePost<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) content: &'a str,
    pub(crate) language: &'a str,
    pub(crate) author_id: &'a str,
    pub(crate) course_id: Option<&'a str>,
    pub(crate) category_id: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdatePost {
    pub(crate) title: Option<String>,
    pub(crate) content: Option<String>,
    pub(crate) language: Option<String>,
    pub(crate) is_pinned: Option<bool>,
    pub(crate) is_locked: Option<bool>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) struct CreateReply<'a> {
    pub(crate) id: &'a str,
    pub(crate) post_id: &'a str,
    pub(crate) author_id: &'a str,
    pub(crate) parent_reply_id: Option<&'a str>,
    pub(crate) content: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn list_categories(pool: &PgPool) -> Result<Vec<ForumCategory>, sqlx::Error> {
    sqlx::query_as::<_, ForumCategory>(
        "SELECT id, name, description, color, order_index, is_active, created_at
         FROM forum_categories
         WHERE is_active
         ORDER BY order_index, name",
    )
    .fetch_all(pool)
    .await
}

pub(crate) async fn category_exists(pool: &PgPool, category_id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM forum_categories WHERE id = $1 AND is_active)",
    )
    .bind(category_id)
    .fetch_one(pool)
    .await
}

fn push_post_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a PostFilter) {
    if let Some(course_id) = filter.course_id.as_ref() {
        builder.push(" AND p.course_id = ").push_bind(course_id);
    }
    if let Some(category_id) = filter.category_id.as_ref() {
        builder.push(" AND p.category_id = ").push_bind(category_id);
    }
    if let Some(language) = filter.language.as_ref() {
        builder.push(" AND lower(p.language) = lower(").push_bind(language).push(")");
    }
}

/// Pinned posts first, then most recent activity.
pub(crate) async fn list_posts(
    pool: &PgPool,
    filter: &PostFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PostWithAuthor>, i64), sqlx::Error> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM forum_posts p WHERE TRUE");
    push_post_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {POST_COLUMNS}, u.full_name AS author_name \
         FROM forum_posts p JOIN users u ON u.id = p.author_id WHERE TRUE"
    ));
    push_post_filters(&mut builder, filter);
    builder.push(
        " ORDER BY p.is_pinned DESC, p.last_reply_at DESC NULLS LAST, p.created_at DESC, p.id",
    );
    builder.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);

    let posts = builder.build_query_as::<PostWithAuthor>().fetch_all(pool).await?;
    Ok((posts, total))
}

pub(crate) async fn create_post(
    pool: &PgPool,
    params: CreatePost<'_>,
) -> Result<ForumPost, sqlx::Error> {
    sqlx::query_as::<_, ForumPost>(
        "INSERT INTO forum_posts AS p (
            id, title, content, language, author_id, course_id, category_id,
            is_pinned, is_locked, view_count, reply_count, created_at, updated_at
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, FALSE, 0, 0, $8, $8)
         RETURNING p.*",
    )
    .bind(params.id)
    .bind(params.title)
    .bind(params.content)
    .bind(params.language)
    .bind(params.author_id)
    .bind(params.course_id)
    .bind(params.category_id)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_post(
    pool: &PgPool,
    post_id: &str,
) -> Result<Option<PostWithAuthor>, sqlx::Error> {
    sqlx::query_as::<_, PostWithAuthor>(&format!(
        "SELECT {POST_COLUMNS}, u.full_name AS author_name
         FROM forum_posts p JOIN users u ON u.id = p.author_id
         WHERE p.id = $1"
    ))
    .bind(post_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn increment_post_views(pool: &PgPool, post_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE forum_posts SET view_count = view_count + 1 WHERE id = $1")
        .bind(post_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn update_post(
    pool: &PgPool,
    post_id: &str,
    params: UpdatePost,
) -> Result<Option<ForumPost>, sqlx::Error> {
    sqlx::query_as::<_, ForumPost>(
        "UPDATE forum_posts AS p SET
            title = COALESCE($1, title),
            content = COALESCE($2, content),
            language = COALESCE($3, language),
            is_pinned = COALESCE($4, is_pinned),
            is_locked = COALESCE($5, is_locked),
            updated_at = $6
         WHERE p.id = $7
         RETURNING p.*",
    )
    .bind(params.title)
    .bind(params.content)
    .bind(params.language)
    .bind(params.is_pinned)
    .bind(params.is_locked)
    .bind(params.updated_at)
    .bind(post_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_post(pool: &PgPool, post_id: &str) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM forum_posts WHERE id = $1").bind(post_id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_replies(
    pool: &PgPool,
    post_id: &str,
) -> Result<Vec<ReplyWithAuthor>, sqlx::Error> {
    sqlx::query_as::<_, ReplyWithAuthor>(
        "SELECT r.id, r.post_id, r.author_id, r.parent_reply_id, r.content,
                r.created_at, r.updated_at, u.full_name AS author_name
         FROM forum_replies r JOIN users u ON u.id = r.author_id
         WHERE r.post_id = $1
         ORDER BY r.created_at, r.id",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_reply(
    pool: &PgPool,
    reply_id: &str,
) -> Result<Option<ForumReply>, sqlx::Error> {
    sqlx::query_as::<_, ForumReply>(&format!(
        "SELECT {REPLY_COLUMNS} FROM forum_replies WHERE id = $1"
    ))
    .bind(reply_id)
    .fetch_optional(pool)
    .await
}

/// Inserts the reply and bumps the post's counters in one transaction.
pub(crate) async fn create_reply(
    pool: &PgPool,
    params: CreateReply<'_>,
) -> Result<ForumReply, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let reply = sqlx::query_as::<_, ForumReply>(&format!(
        "INSERT INTO forum_replies (
            id, post_id, author_id, parent_reply_id, content, created_at, updated_at
         ) VALUES ($1, $2, $3, $4, $5, $6, $6)
         RETURNING {REPLY_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.post_id)
    .bind(params.author_id)
    .bind(params.parent_reply_id)
    .bind(params.content)
    .bind(params.created_at)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE forum_posts
         SET reply_count = reply_count + 1, last_reply_at = $2
         WHERE id = $1",
    )
    .bind(params.post_id)
    .bind(params.created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(reply)
}

pub(crate) async fn update_reply(
    pool: &PgPool,
    reply_id: &str,
    content: &str,
    updated_at: time::PrimitiveDateTime,
) -> Result<Option<ForumReply>, sqlx::Error> {
    sqlx::query_as::<_, ForumReply>(&format!(
        "UPDATE forum_replies SET content = $1, updated_at = $2 WHERE id = $3
         RETURNING {REPLY_COLUMNS}"
    ))
    .bind(content)
    .bind(updated_at)
    .bind(reply_id)
    .fetch_optional(pool)
    .await
}

/// Deleting a top-level reply cascades to its children, so the post's
/// counters are recomputed rather than decremented.
pub(crate) async fn delete_reply(pool: &PgPool, reply: &ForumReply) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM forum_replies WHERE id = $1")
        .bind(&reply.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "UPDATE forum_posts SET
            reply_count = (SELECT COUNT(*) FROM forum_replies WHERE post_id = $1),
            last_reply_at = (SELECT MAX(created_at) FROM forum_replies WHERE post_id = $1)
         WHERE id = $1",
    )
    .bind(&reply.post_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
