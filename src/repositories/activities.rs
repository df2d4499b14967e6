use sqlx::PgPool;

use crate::db::models::{ActivitySubmission, WeeklyActivity};

const SUBMISSION_COLUMNS: &str = "id, user_id, activity_id, file_url, file_name, file_size_bytes, \
                                  file_sha256, comments, grade, feedback, submitted_at, \
                                  graded_at, graded_by";

const ACTIVITY_SELECT: &str = "\
    SELECT a.id, a.course_id, a.title, a.description, a.due_date, a.max_file_size_mb, \
           a.allowed_file_types, a.is_active, a.created_by, a.created_at, \
           c.title AS course_title, c.teacher_id \
    FROM weekly_activities a \
    JOIN courses c ON c.id = a.course_id";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ActivityWithCourse {
    #[sqlx(flatten)]
    pub(crate) activity: WeeklyActivity,
    pub(crate) course_title: String,
    pub(crate) teacher_id: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SubmissionWithActivity {
    #[sqlx(flatten)]
    pub(crate) submission: ActivitySubmission,
    pub(crate) activity_title: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SubmissionWithStudent {
    #[sqlx(flatten)]
    pub(crate) submission: ActivitySubmission,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
}

pub(crate) struct CreateActivity<'a> {
    pub(crate) id: &'a str,
    pub(crate) course_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) due_date: time::PrimitiveDateTime,
    pub(crate) max_file_size_mb: i32,
    pub(crate) allowed_file_types: &'a [String],
    pub(crate) created_by: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) struct UpsertSubmission<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) activity_id: &'a str,
    pub(crate) file_url: &'a str,
    pub(crate) file_name: &'a str,
    pub(crate) file_size_bytes: i64,
    pub(crate) file_sha256: Option<&'a str>,
    pub(crate) comments: Option<&'a str>,
    pub(crate) submitted_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateActivity<'_>,
) -> Result<WeeklyActivity, sqlx::Error> {
    sqlx::query_as::<_, WeeklyActivity>(
        "INSERT INTO weekly_activities (
            id, course_id, title, description, due_date, max_file_size_mb,
            allowed_file_types, is_active, created_by, created_at
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, $9)
         RETURNING id, course_id, title, description, due_date, max_file_size_mb,
                   allowed_file_types, is_active, created_by, created_at",
    )
    .bind(params.id)
    .bind(params.course_id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.due_date)
    .bind(params.max_file_size_mb)
    .bind(params.allowed_file_types)
    .bind(params.created_by)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    activity_id: &str,
) -> Result<Option<ActivityWithCourse>, sqlx::Error> {
    sqlx::query_as::<_, ActivityWithCourse>(&format!("{ACTIVITY_SELECT} WHERE a.id = $1"))
        .bind(activity_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<ActivityWithCourse>, sqlx::Error> {
    sqlx::query_as::<_, ActivityWithCourse>(&format!(
        "{ACTIVITY_SELECT}
         WHERE a.is_active AND EXISTS (
            SELECT 1 FROM enrollments e
            WHERE e.course_id = a.course_id AND e.student_id = $1 AND e.status = 'active'
         )
         ORDER BY a.due_date, a.id"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_teacher(
    pool: &PgPool,
    teacher_id: Option<&str>,
) -> Result<Vec<ActivityWithCourse>, sqlx::Error> {
    sqlx::query_as::<_, ActivityWithCourse>(&format!(
        "{ACTIVITY_SELECT}
         WHERE a.is_active AND ($1::text IS NULL OR c.teacher_id = $1)
         ORDER BY a.due_date, a.id"
    ))
    .bind(teacher_id)
    .fetch_all(pool)
    .await
}

/// One row per (user, activity): a resubmission replaces the file and
/// clears any previous grade.
pub(crate) async fn upsert_submission(
    pool: &PgPool,
    params: UpsertSubmission<'_>,
) -> Result<ActivitySubmission, sqlx::Error> {
    sqlx::query_as::<_, ActivitySubmission>(&format!(
        "INSERT INTO activity_submissions (
            id, user_id, activity_id, file_url, file_name, file_size_bytes,
            file_sha256, comments, submitted_at
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (user_id, activity_id) DO UPDATE SET
            file_url = EXCLUDED.file_url,
            file_name = EXCLUDED.file_name,
            file_size_bytes = EXCLUDED.file_size_bytes,
            file_sha256 = EXCLUDED.file_sha256,
            comments = EXCLUDED.comments,
            submitted_at = EXCLUDED.submitted_at,
            grade = NULL,
            feedback = NULL,
            graded_at = NULL,
            graded_by = NULL
         RETURNING {SUBMISSION_COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.activity_id)
    .bind(params.file_url)
    .bind(params.file_name)
    .bind(params.file_size_bytes)
    .bind(params.file_sha256)
    .bind(params.comments)
    .bind(params.submitted_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_submissions_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<SubmissionWithActivity>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionWithActivity>(
        "SELECT s.id, s.user_id, s.activity_id, s.file_url, s.file_name, s.file_size_bytes,
                s.file_sha256, s.comments, s.grade, s.feedback, s.submitted_at,
                s.graded_at, s.graded_by, a.title AS activity_title
         FROM activity_submissions s
         JOIN weekly_activities a ON a.id = s.activity_id
         WHERE s.user_id = $1
         ORDER BY s.submitted_at DESC, s.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_submissions_for_activity(
    pool: &PgPool,
    activity_id: &str,
) -> Result<Vec<SubmissionWithStudent>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionWithStudent>(
        "SELECT s.id, s.user_id, s.activity_id, s.file_url, s.file_name, s.file_size_bytes,
                s.file_sha256, s.comments, s.grade, s.feedback, s.submitted_at,
                s.graded_at, s.graded_by,
                u.full_name AS student_name, u.email AS student_email
         FROM activity_submissions s
         JOIN users u ON u.id = s.user_id
         WHERE s.activity_id = $1
         ORDER BY s.submitted_at, s.id",
    )
    .bind(activity_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_submission(
    pool: &PgPool,
    submission_id: &str,
) -> Result<Option<ActivitySubmission>, sqlx::Error> {
    sqlx::query_as::<_, ActivitySubmission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM activity_submissions WHERE id = $1"
    ))
    .bind(submission_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn grade_submission(
    pool: &PgPool,
    submission_id: &str,
    grade: f64,
    feedback: Option<&str>,
    graded_by: &str,
    graded_at: time::PrimitiveDateTime,
) -> Result<Option<ActivitySubmission>, sqlx::Error> {
    sqlx::query_as::<_, ActivitySubmission>(&format!(
        "UPDATE activity_submissions
         SET grade = $1, feedback = $2, graded_by = $3, graded_at = $4
         WHERE id = $5
         RETURNING {SUBMISSION_COLUMNS}"
    ))
    .bind(grade)
    .bind(feedback)
    .bind(graded_by)
    .bind(graded_at)
    .bind(submission_id)
    .fetch_optional(pool)
    .await
}
