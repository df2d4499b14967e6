use sqlx::PgPool;

use crate::db::models::{Course, Enrollment};
use crate::db::types::EnrollmentStatus;

const COLUMNS: &str = "id, student_id, course_id, status, enrolled_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SeatInfo {
    pub(crate) max_students: i32,
    pub(crate) is_active: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct EnrollmentWithCourse {
    pub(crate) enrollment_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) enrolled_at: time::PrimitiveDateTime,
    #[sqlx(flatten)]
    pub(crate) course: Course,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct EnrolledStudent {
    pub(crate) enrollment_id: String,
    pub(crate) course_id: String,
    pub(crate) course_title: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) enrolled_at: time::PrimitiveDateTime,
}

/// Locks the course row for the rest of the transaction so concurrent
/// enrollments into the same course serialize on it.
pub(crate) async fn lock_course_seats(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
) -> Result<Option<SeatInfo>, sqlx::Error> {
    sqlx::query_as::<_, SeatInfo>(
        "SELECT max_students, is_active FROM courses WHERE id = $1 FOR UPDATE",
    )
    .bind(course_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_active(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status = 'active'",
    )
    .bind(course_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_active_for(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    course_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {COLUMNS} FROM enrollments
         WHERE student_id = $1 AND course_id = $2 AND status = 'active'"
    ))
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn insert_active(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    student_id: &str,
    course_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "INSERT INTO enrollments (id, student_id, course_id, status, enrolled_at, updated_at)
         VALUES ($1, $2, $3, 'active', $4, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(student_id)
    .bind(course_id)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn set_status(
    executor: impl sqlx::PgExecutor<'_>,
    enrollment_id: &str,
    status: EnrollmentStatus,
    now: time::PrimitiveDateTime,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments SET status = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(status)
    .bind(now)
    .bind(enrollment_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    enrollment_id: &str,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!("SELECT {COLUMNS} FROM enrollments WHERE id = $1"))
        .bind(enrollment_id)
        .fetch_optional(executor)
        .await
}

/// Unenroll keeps the row for history and flips it to `inactive`.
pub(crate) async fn deactivate_for_student(
    pool: &PgPool,
    student_id: &str,
    course_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "UPDATE enrollments SET status = 'inactive', updated_at = $3
         WHERE student_id = $1 AND course_id = $2 AND status = 'active'
         RETURNING {COLUMNS}"
    ))
    .bind(student_id)
    .bind(course_id)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_active_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<EnrollmentWithCourse>, sqlx::Error> {
    sqlx::query_as::<_, EnrollmentWithCourse>(
        "SELECT e.id AS enrollment_id, e.status, e.enrolled_at,
                c.id, c.title, c.description, c.language, c.level, c.teacher_id, c.schedule,
                c.max_students, c.is_active, c.created_at, c.updated_at
         FROM enrollments e
         JOIN courses c ON c.id = e.course_id
         WHERE e.student_id = $1 AND e.status = 'active'
         ORDER BY e.enrolled_at DESC, e.id",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_active_students_for_course(
    pool: &PgPool,
    course_id: &str,
) -> Result<Vec<EnrolledStudent>, sqlx::Error> {
    sqlx::query_as::<_, EnrolledStudent>(
        "SELECT e.id AS enrollment_id, c.id AS course_id, c.title AS course_title,
                u.id AS student_id, u.full_name AS student_name, u.email AS student_email,
                e.enrolled_at
         FROM enrollments e
         JOIN courses c ON c.id = e.course_id
         JOIN users u ON u.id = e.student_id
         WHERE e.course_id = $1 AND e.status = 'active'
         ORDER BY u.full_name, e.enrolled_at",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_active_students_for_teacher(
    pool: &PgPool,
    teacher_id: &str,
) -> Result<Vec<EnrolledStudent>, sqlx::Error> {
    sqlx::query_as::<_, EnrolledStudent>(
        "SELECT e.id AS enrollment_id, c.id AS course_id, c.title AS course_title,
                u.id AS student_id, u.full_name AS student_name, u.email AS student_email,
                e.enrolled_at
         FROM enrollments e
         JOIN courses c ON c.id = e.course_id
         JOIN users u ON u.id = e.student_id
         WHERE c.teacher_id = $1 AND e.status = 'active'
         ORDER BY u.full_name, c.title",
    )
    .bind(teacher_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn has_active(
    pool: &PgPool,
    student_id: &str,
    course_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM enrollments
            WHERE student_id = $1 AND course_id = $2 AND status = 'active'
         )",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_one(pool)
    .await
}
