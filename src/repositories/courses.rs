use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Course;
use crate::db::types::CourseLevel;

const COURSE_COLUMNS: &str = "id, title, description, language, level, teacher_id, schedule, \
                              max_students, is_active, created_at, updated_at";

/// A course row together with its active enrollment count and whether the
/// viewer holds one of those enrollments.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct CourseWithCount {
    #[sqlx(flatten)]
    pub(crate) course: Course,
    pub(crate) enrolled_count: i64,
    pub(crate) is_enrolled: bool,
}

pub(crate) struct CreateCourse<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) language: &'a str,
    pub(crate) level: CourseLevel,
    pub(crate) teacher_id: &'a str,
    pub(crate) schedule: &'a str,
    pub(crate) max_students: i32,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) struct UpdateCourse {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) language: Option<String>,
    pub(crate) level: Option<CourseLevel>,
    pub(crate) schedule: Option<String>,
    pub(crate) max_students: Option<i32>,
    pub(crate) is_active: Option<bool>,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

#[derive(Debug, Default)]
pub(crate) struct CourseFilter {
    pub(crate) language: Option<String>,
    pub(crate) level: Option<CourseLevel>,
    pub(crate) teacher_id: Option<String>,
    pub(crate) include_inactive: bool,
}

pub(crate) async fn create(pool: &PgPool, params: CreateCourse<'_>) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "INSERT INTO courses (
            id, title, description, language, level, teacher_id, schedule,
            max_students, is_active, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,TRUE,$9,$9)
         RETURNING {COURSE_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.language)
    .bind(params.level)
    .bind(params.teacher_id)
    .bind(params.schedule)
    .bind(params.max_students)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    course_id: &str,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"))
        .bind(course_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn update(
    pool: &PgPool,
    course_id: &str,
    params: UpdateCourse,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(&format!(
        "UPDATE courses SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            language = COALESCE($3, language),
            level = COALESCE($4, level),
            schedule = COALESCE($5, schedule),
            max_students = COALESCE($6, max_students),
            is_active = COALESCE($7, is_active),
            updated_at = $8
         WHERE id = $9
         RETURNING {COURSE_COLUMNS}"
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.language)
    .bind(params.level)
    .bind(params.schedule)
    .bind(params.max_students)
    .bind(params.is_active)
    .bind(params.updated_at)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, course_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1").bind(course_id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Lists courses with their active enrollment counts in one query.
pub(crate) async fn list_with_counts(
    pool: &PgPool,
    viewer_id: &str,
    filter: &CourseFilter,
) -> Result<Vec<CourseWithCount>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT c.id, c.title, c.description, c.language, c.level, c.teacher_id, c.schedule,
                c.max_students, c.is_active, c.created_at, c.updated_at,
                COUNT(e.id) AS enrolled_count,
                COALESCE(BOOL_OR(e.student_id = ",
    );
    builder.push_bind(viewer_id);
    builder.push(
        "), FALSE) AS is_enrolled
         FROM courses c
         LEFT JOIN enrollments e ON e.course_id = c.id AND e.status = 'active'
         WHERE TRUE",
    );

    if !filter.include_inactive {
        builder.push(" AND c.is_active");
    }
    if let Some(language) = filter.language.as_ref() {
        builder.push(" AND lower(c.language) = lower(").push_bind(language).push(")");
    }
    if let Some(level) = filter.level {
        builder.push(" AND c.level = ").push_bind(level);
    }
    if let Some(teacher_id) = filter.teacher_id.as_ref() {
        builder.push(" AND c.teacher_id = ").push_bind(teacher_id);
    }

    builder.push(" GROUP BY c.id ORDER BY c.created_at DESC, c.id");

    builder.build_query_as::<CourseWithCount>().fetch_all(pool).await
}

pub(crate) async fn find_with_count(
    pool: &PgPool,
    course_id: &str,
    viewer_id: &str,
) -> Result<Option<CourseWithCount>, sqlx::Error> {
    sqlx::query_as::<_, CourseWithCount>(
        "SELECT c.id, c.title, c.description, c.language, c.level, c.teacher_id, c.schedule,
                c.max_students, c.is_active, c.created_at, c.updated_at,
                COUNT(e.id) AS enrolled_count,
                COALESCE(BOOL_OR(e.student_id = $2), FALSE) AS is_enrolled
         FROM courses c
         LEFT JOIN enrollments e ON e.course_id = c.id AND e.status = 'active'
         WHERE c.id = $1
         GROUP BY c.id",
    )
    .bind(course_id)
    .bind(viewer_id)
    .fetch_optional(pool)
    .await
}
