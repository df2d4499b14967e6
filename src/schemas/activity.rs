use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{ActivitySubmission, WeeklyActivity};
use crate::repositories::activities::{
    ActivityWithCourse, SubmissionWithActivity, SubmissionWithStudent,
};
use crate::schemas::{deserialize_datetime, deserialize_option_trimmed, deserialize_trimmed};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ActivityCreate {
    #[serde(alias = "courseId")]
    pub(crate) course_id: String,
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 3, message = "El título debe tener al menos 3 caracteres"))]
    pub(crate) title: String,
    #[serde(default, deserialize_with = "deserialize_trimmed")]
    pub(crate) description: String,
    #[serde(alias = "dueDate", deserialize_with = "deserialize_datetime")]
    pub(crate) due_date: time::PrimitiveDateTime,
    #[serde(default = "default_max_file_size_mb", alias = "maxFileSizeMb")]
    #[validate(range(min = 1, max = 100, message = "El tamaño máximo debe estar entre 1 y 100 MB"))]
    pub(crate) max_file_size_mb: i32,
    #[serde(default, alias = "allowedFileTypes")]
    pub(crate) allowed_file_types: Vec<String>,
}

fn default_max_file_size_mb() -> i32 {
    10
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmissionUpsert {
    #[serde(alias = "fileUrl", deserialize_with = "deserialize_trimmed")]
    #[validate(url(message = "La URL del archivo no es válida"))]
    pub(crate) file_url: String,
    #[serde(alias = "fileName", deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 1, message = "El nombre del archivo es obligatorio"))]
    pub(crate) file_name: String,
    #[serde(alias = "fileSize", alias = "fileSizeBytes")]
    #[validate(range(min = 0, message = "El tamaño del archivo no puede ser negativo"))]
    pub(crate) file_size_bytes: i64,
    #[serde(default, deserialize_with = "deserialize_option_trimmed")]
    pub(crate) comments: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GradeRequest {
    #[validate(range(min = 0.0, max = 100.0, message = "La calificación debe estar entre 0 y 100"))]
    pub(crate) grade: f64,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) activity_id: String,
    pub(crate) file_url: String,
    pub(crate) file_name: String,
    pub(crate) file_size_bytes: i64,
    pub(crate) file_sha256: Option<String>,
    pub(crate) comments: Option<String>,
    pub(crate) grade: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) submitted_at: String,
    pub(crate) graded_at: Option<String>,
    pub(crate) graded_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) activity_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) student_email: Option<String>,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: ActivitySubmission) -> Self {
        Self {
            id: submission.id,
            user_id: submission.user_id,
            activity_id: submission.activity_id,
            file_url: submission.file_url,
            file_name: submission.file_name,
            file_size_bytes: submission.file_size_bytes,
            file_sha256: submission.file_sha256,
            comments: submission.comments,
            grade: submission.grade,
            feedback: submission.feedback,
            submitted_at: format_primitive(submission.submitted_at),
            graded_at: submission.graded_at.map(format_primitive),
            graded_by: submission.graded_by,
            activity_title: None,
            student_name: None,
            student_email: None,
        }
    }

    pub(crate) fn with_activity(row: SubmissionWithActivity) -> Self {
        Self { activity_title: Some(row.activity_title), ..Self::from_db(row.submission) }
    }

    pub(crate) fn with_student(row: SubmissionWithStudent) -> Self {
        Self {
            student_name: Some(row.student_name),
            student_email: Some(row.student_email),
            ..Self::from_db(row.submission)
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ActivityResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) course_title: Option<String>,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) due_date: String,
    pub(crate) max_file_size_mb: i32,
    pub(crate) allowed_file_types: Vec<String>,
    pub(crate) is_active: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) submission: Option<SubmissionResponse>,
}

impl ActivityResponse {
    pub(crate) fn from_db(activity: WeeklyActivity, course_title: Option<String>) -> Self {
        Self {
            id: activity.id,
            course_id: activity.course_id,
            course_title,
            title: activity.title,
            description: activity.description,
            due_date: format_primitive(activity.due_date),
            max_file_size_mb: activity.max_file_size_mb,
            allowed_file_types: activity.allowed_file_types,
            is_active: activity.is_active,
            created_by: activity.created_by,
            created_at: format_primitive(activity.created_at),
            submission: None,
        }
    }

    pub(crate) fn from_row(row: ActivityWithCourse, submission: Option<SubmissionResponse>) -> Self {
        Self { submission, ..Self::from_db(row.activity, Some(row.course_title)) }
    }
}
