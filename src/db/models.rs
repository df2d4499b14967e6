use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{CourseLevel, EnrollmentStatus, SubscriptionStatus, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) avatar_url: Option<String>,
    pub(crate) subscription_status: SubscriptionStatus,
    pub(crate) subscription_expires_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Course {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) language: String,
    pub(crate) level: CourseLevel,
    pub(crate) teacher_id: String,
    pub(crate) schedule: String,
    pub(crate) max_students: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Enrollment {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) course_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) enrolled_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Recording {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) url: String,
    pub(crate) is_premium: bool,
    pub(crate) view_count: i32,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ForumCategory {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) color: String,
    pub(crate) order_index: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ForumPost {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) language: String,
    pub(crate) author_id: String,
    pub(crate) course_id: Option<String>,
    pub(crate) category_id: Option<String>,
    pub(crate) is_pinned: bool,
    pub(crate) is_locked: bool,
    pub(crate) view_count: i32,
    pub(crate) reply_count: i32,
    pub(crate) last_reply_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ForumReply {
    pub(crate) id: String,
    pub(crate) post_id: String,
    pub(crate) author_id: String,
    pub(crate) parent_reply_id: Option<String>,
    pub(crate) content: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct WeeklyActivity {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) due_date: PrimitiveDateTime,
    pub(crate) max_file_size_mb: i32,
    pub(crate) allowed_file_types: Vec<String>,
    pub(crate) is_active: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ActivitySubmission {
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
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
    pub(crate) graded_by: Option<String>,
}
