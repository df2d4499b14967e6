use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{deserialize_option_trimmed, deserialize_trimmed};

use crate::core::time::format_primitive;
use crate::db::models::{ForumCategory, ForumPost, ForumReply};
use crate::repositories::forum::{PostWithAuthor, ReplyWithAuthor};
use crate::services::forum_threads::Thread;

pub(crate) const DEFAULT_POST_LIMIT: i64 = 20;
pub(crate) const MAX_POST_LIMIT: i64 = 100;

#[derive(Debug, Serialize)]
pub(crate) struct CategoryResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) color: String,
    pub(crate) order_index: i32,
}

impl CategoryResponse {
    pub(crate) fn from_db(category: ForumCategory) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            color: category.color,
            order_index: category.order_index,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostListQuery {
    #[serde(default)]
    pub(crate) course_id: Option<String>,
    #[serde(default)]
    pub(crate) category_id: Option<String>,
    #[serde(default)]
    pub(crate) language: Option<String>,
    #[serde(default = "default_post_limit")]
    pub(crate) limit: i64,
    #[serde(default)]
    pub(crate) offset: i64,
}

fn default_post_limit() -> i64 {
    DEFAULT_POST_LIMIT
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PostCreate {
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 3, max = 200, message = "El título debe tener entre 3 y 200 caracteres"))]
    pub(crate) title: String,
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 1, message = "El contenido no puede estar vacío"))]
    pub(crate) content: String,
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 2, message = "El idioma es obligatorio"))]
    pub(crate) language: String,
    #[serde(default, alias = "courseId")]
    pub(crate) course_id: Option<String>,
    #[serde(default, alias = "categoryId")]
    pub(crate) category_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PostUpdate {
    #[serde(default, deserialize_with = "deserialize_option_trimmed")]
    #[validate(length(min = 3, max = 200, message = "El título debe tener entre 3 y 200 caracteres"))]
    pub(crate) title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_trimmed")]
    #[validate(length(min = 1, message = "El contenido no puede estar vacío"))]
    pub(crate) content: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_trimmed")]
    #[validate(length(min = 2, message = "El idioma es obligatorio"))]
    pub(crate) language: Option<String>,
    #[serde(default, alias = "isPinned")]
    pub(crate) is_pinned: Option<bool>,
    #[serde(default, alias = "isLocked")]
    pub(crate) is_locked: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ReplyCreate {
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 1, message = "La respuesta no puede estar vacía"))]
    pub(crate) content: String,
    #[serde(default, alias = "parentReplyId")]
    pub(crate) parent_reply_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ReplyUpdate {
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 1, message = "La respuesta no puede estar vacía"))]
    pub(crate) content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PostResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) language: String,
    pub(crate) author_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) author_name: Option<String>,
    pub(crate) course_id: Option<String>,
    pub(crate) category_id: Option<String>,
    pub(crate) is_pinned: bool,
    pub(crate) is_locked: bool,
    pub(crate) view_count: i32,
    pub(crate) reply_count: i32,
    pub(crate) last_reply_at: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl PostResponse {
    pub(crate) fn from_db(post: ForumPost, author_name: Option<String>) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            language: post.language,
            author_id: post.author_id,
            author_name,
            course_id: post.course_id,
            category_id: post.category_id,
            is_pinned: post.is_pinned,
            is_locked: post.is_locked,
            view_count: post.view_count,
            reply_count: post.reply_count,
            last_reply_at: post.last_reply_at.map(format_primitive),
            created_at: format_primitive(post.created_at),
            updated_at: format_primitive(post.updated_at),
        }
    }

    pub(crate) fn from_row(row: PostWithAuthor) -> Self {
        Self::from_db(row.post, Some(row.author_name))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PostPageResponse {
    pub(crate) items: Vec<PostResponse>,
    pub(crate) total_count: i64,
    pub(crate) limit: i64,
    pub(crate) offset: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReplyResponse {
    pub(crate) id: String,
    pub(crate) post_id: String,
    pub(crate) author_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) author_name: Option<String>,
    pub(crate) parent_reply_id: Option<String>,
    pub(crate) content: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ReplyResponse {
    pub(crate) fn from_db(reply: ForumReply, author_name: Option<String>) -> Self {
        Self {
            id: reply.id,
            post_id: reply.post_id,
            author_id: reply.author_id,
            author_name,
            parent_reply_id: reply.parent_reply_id,
            content: reply.content,
            created_at: format_primitive(reply.created_at),
            updated_at: format_primitive(reply.updated_at),
        }
    }

    fn from_row(row: ReplyWithAuthor) -> Self {
        Self::from_db(row.reply, Some(row.author_name))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ThreadResponse {
    #[serde(flatten)]
    pub(crate) reply: ReplyResponse,
    pub(crate) children: Vec<ReplyResponse>,
}

impl ThreadResponse {
    pub(crate) fn from_thread(thread: Thread<ReplyWithAuthor>) -> Self {
        Self {
            reply: ReplyResponse::from_row(thread.reply),
            children: thread.children.into_iter().map(ReplyResponse::from_row).collect(),
        }
    }
}
