use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Recording;

const COLUMNS: &str =
    "id, course_id, title, url, is_premium, view_count, expires_at, created_by, created_at";

pub(crate) struct CreateRecording<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) url: &'a str,
    pub(crate) is_premium: bool,
    pub(crate) expires_at: time::PrimitiveDateTime,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

/// Which recordings a caller may see. Admins get `Everything`.
#[derive(Debug, Clone)]
pub(crate) enum RecordingScope {
    Everything,
    TaughtBy(String),
    EnrolledStudent { student_id: String, include_premium: bool },
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateRecording<'_>,
) -> Result<Recording, sqlx::Error> {
    sqlx::query_as::<_, Recording>(&format!(
        "INSERT INTO recordings (
            id, course_id, title, url, is_premium, view_count, expires_at, created_by, created_at
         ) VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $8)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.title)
    .bind(params.url)
    .bind(params.is_premium)
    .bind(params.expires_at)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    recording_id: &str,
) -> Result<Option<Recording>, sqlx::Error> {
    sqlx::query_as::<_, Recording>(&format!("SELECT {COLUMNS} FROM recordings WHERE id = $1"))
        .bind(recording_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    scope: &RecordingScope,
    course_id: Option<&str>,
    now: time::PrimitiveDateTime,
) -> Result<Vec<Recording>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT r.id, r.course_id, r.title, r.url, r.is_premium, r.view_count, r.expires_at, \
         r.created_by, r.created_at FROM recordings r \
         JOIN courses c ON c.id = r.course_id WHERE TRUE",
    );

    match scope {
        RecordingScope::Everything => {}
        RecordingScope::TaughtBy(teacher_id) => {
            builder.push(" AND c.teacher_id = ").push_bind(teacher_id.clone());
        }
        RecordingScope::EnrolledStudent { student_id, include_premium } => {
            builder
                .push(
                    " AND EXISTS (SELECT 1 FROM enrollments e \
                     WHERE e.course_id = r.course_id AND e.status = 'active' AND e.student_id = ",
                )
                .push_bind(student_id.clone())
                .push(")");
            builder.push(" AND r.expires_at > ").push_bind(now);
            if !include_premium {
                builder.push(" AND r.is_premium = FALSE");
            }
        }
    }

    if let Some(course_id) = course_id {
        builder.push(" AND r.course_id = ").push_bind(course_id.to_string());
    }

    builder.push(" ORDER BY r.created_at DESC, r.id");
    builder.build_query_as::<Recording>().fetch_all(pool).await
}

pub(crate) async fn delete(pool: &PgPool, recording_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM recordings WHERE id = $1")
        .bind(recording_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Single-statement increment, so concurrent viewers never lose a count.
pub(crate) async fn increment_views(
    pool: &PgPool,
    recording_id: &str,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE recordings SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count",
    )
    .bind(recording_id)
    .fetch_optional(pool)
    .await
}
