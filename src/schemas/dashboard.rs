use serde::Serialize;

use crate::schemas::course::{CourseSummaryResponse, MyEnrollmentResponse};
use crate::schemas::user::UserResponse;

#[derive(Debug, Serialize)]
pub(crate) struct StudentDashboardResponse {
    pub(crate) user: UserResponse,
    pub(crate) enrollments: Vec<MyEnrollmentResponse>,
    pub(crate) available_courses: Vec<CourseSummaryResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeacherStudentResponse {
    pub(crate) student_id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) courses: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TeacherDashboardResponse {
    pub(crate) user: UserResponse,
    pub(crate) courses: Vec<CourseSummaryResponse>,
    pub(crate) students: Vec<TeacherStudentResponse>,
}
