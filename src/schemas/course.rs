use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{deserialize_option_trimmed, deserialize_trimmed};

use crate::core::time::format_primitive;
use crate::db::models::{Course, Enrollment};
use crate::db::types::{CourseLevel, EnrollmentStatus};
use crate::repositories::courses::CourseWithCount;
use crate::repositories::enrollments::{EnrolledStudent, EnrollmentWithCourse};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseCreate {
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 3, message = "El título debe tener al menos 3 caracteres"))]
    pub(crate) title: String,
    #[serde(default, deserialize_with = "deserialize_option_trimmed")]
    pub(crate) description: Option<String>,
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 2, message = "El idioma es obligatorio"))]
    pub(crate) language: String,
    pub(crate) level: CourseLevel,
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 1, message = "El horario es obligatorio"))]
    pub(crate) schedule: String,
    #[serde(default = "default_max_students", alias = "maxStudents")]
    #[validate(range(min = 1, max = 500, message = "El cupo debe estar entre 1 y 500"))]
    pub(crate) max_students: i32,
}

fn default_max_students() -> i32 {
    10
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseUpdate {
    #[serde(default, deserialize_with = "deserialize_option_trimmed")]
    #[validate(length(min = 3, message = "El título debe tener al menos 3 caracteres"))]
    pub(crate) title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_trimmed")]
    pub(crate) description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_trimmed")]
    #[validate(length(min = 2, message = "El idioma es obligatorio"))]
    pub(crate) language: Option<String>,
    #[serde(default)]
    pub(crate) level: Option<CourseLevel>,
    #[serde(default, deserialize_with = "deserialize_option_trimmed")]
    #[validate(length(min = 1, message = "El horario es obligatorio"))]
    pub(crate) schedule: Option<String>,
    #[serde(default, alias = "maxStudents")]
    #[validate(range(min = 1, max = 500, message = "El cupo debe estar entre 1 y 500"))]
    pub(crate) max_students: Option<i32>,
    #[serde(default, alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CourseListQuery {
    #[serde(default)]
    pub(crate) language: Option<String>,
    #[serde(default)]
    pub(crate) level: Option<CourseLevel>,
    #[serde(default)]
    pub(crate) teacher_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) language: String,
    pub(crate) level: CourseLevel,
    pub(crate) teacher_id: String,
    pub(crate) schedule: String,
    pub(crate) max_students: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl CourseResponse {
    pub(crate) fn from_db(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            language: course.language,
            level: course.level,
            teacher_id: course.teacher_id,
            schedule: course.schedule,
            max_students: course.max_students,
            is_active: course.is_active,
            created_at: format_primitive(course.created_at),
            updated_at: format_primitive(course.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseSummaryResponse {
    #[serde(flatten)]
    pub(crate) course: CourseResponse,
    pub(crate) enrolled_count: i64,
    pub(crate) available_spots: i64,
    pub(crate) is_enrolled: bool,
}

impl CourseSummaryResponse {
    pub(crate) fn from_db(row: CourseWithCount) -> Self {
        let available_spots = (i64::from(row.course.max_students) - row.enrolled_count).max(0);
        Self {
            course: CourseResponse::from_db(row.course),
            enrolled_count: row.enrolled_count,
            available_spots,
            is_enrolled: row.is_enrolled,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AddStudentRequest {
    #[validate(email(message = "Correo electrónico inválido"))]
    pub(crate) email: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentResponse {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) course_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) enrolled_at: String,
    pub(crate) updated_at: String,
}

impl EnrollmentResponse {
    pub(crate) fn from_db(enrollment: Enrollment) -> Self {
        Self {
            id: enrollment.id,
            student_id: enrollment.student_id,
            course_id: enrollment.course_id,
            status: enrollment.status,
            enrolled_at: format_primitive(enrollment.enrolled_at),
            updated_at: format_primitive(enrollment.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MyEnrollmentResponse {
    pub(crate) id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) enrolled_at: String,
    pub(crate) course: CourseResponse,
}

impl MyEnrollmentResponse {
    pub(crate) fn from_db(row: EnrollmentWithCourse) -> Self {
        Self {
            id: row.enrollment_id,
            status: row.status,
            enrolled_at: format_primitive(row.enrolled_at),
            course: CourseResponse::from_db(row.course),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrolledStudentResponse {
    pub(crate) enrollment_id: String,
    pub(crate) course_id: String,
    pub(crate) course_title: String,
    pub(crate) student_id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) enrolled_at: String,
}

impl EnrolledStudentResponse {
    pub(crate) fn from_db(row: EnrolledStudent) -> Self {
        Self {
            enrollment_id: row.enrollment_id,
            course_id: row.course_id,
            course_title: row.course_title,
            student_id: row.student_id,
            full_name: row.student_name,
            email: row.student_email,
            enrolled_at: format_primitive(row.enrolled_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollmentStatusUpdate {
    pub(crate) status: EnrollmentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;

    fn course(max_students: i32) -> Course {
        let now = primitive_now_utc();
        Course {
            id: "c1".into(),
            title: "Inglés conversacional".into(),
            description: None,
            language: "Inglés".into(),
            level: CourseLevel::Beginner,
            teacher_id: "t1".into(),
            schedule: "Lun y Mié 18:00".into(),
            max_students,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn available_spots_never_negative() {
        let summary = CourseSummaryResponse::from_db(CourseWithCount {
            course: course(5),
            enrolled_count: 7,
            is_enrolled: false,
        });
        assert_eq!(summary.available_spots, 0);

        let summary = CourseSummaryResponse::from_db(CourseWithCount {
            course: course(5),
            enrolled_count: 2,
            is_enrolled: true,
        });
        assert_eq!(summary.available_spots, 3);
    }

    #[test]
    fn summary_flattens_course_fields() {
        let summary = CourseSummaryResponse::from_db(CourseWithCount {
            course: course(10),
            enrolled_count: 1,
            is_enrolled: true,
        });
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["id"], "c1");
        assert_eq!(json["level"], "beginner");
        assert_eq!(json["enrolled_count"], 1);
        assert_eq!(json["is_enrolled"], true);
    }
}
