use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentTeacher, CurrentUser};
use crate::core::state::AppState;
use crate::repositories;
use crate::repositories::courses::CourseFilter;
use crate::repositories::enrollments::EnrolledStudent;
use crate::schemas::course::{CourseSummaryResponse, MyEnrollmentResponse};
use crate::schemas::dashboard::{
    StudentDashboardResponse, TeacherDashboardResponse, TeacherStudentResponse,
};
use crate::schemas::user::UserResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/student", get(student_dashboard))
        .route("/teacher", get(teacher_dashboard))
}

async fn student_dashboard(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<StudentDashboardResponse>, ApiError> {
    let enrollments = repositories::enrollments::list_active_for_student(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list enrollments"))?;

    let available_courses =
        repositories::courses::list_with_counts(state.db(), &user.id, &CourseFilter::default())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list courses"))?
            .into_iter()
            .filter(|row| !row.is_enrolled)
            .map(CourseSummaryResponse::from_db)
            .collect();

    Ok(Json(StudentDashboardResponse {
        user: UserResponse::from_db(user),
        enrollments: enrollments.into_iter().map(MyEnrollmentResponse::from_db).collect(),
        available_courses,
    }))
}

async fn teacher_dashboard(
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<TeacherDashboardResponse>, ApiError> {
    let filter = CourseFilter {
        teacher_id: Some(user.id.clone()),
        include_inactive: true,
        ..CourseFilter::default()
    };
    let courses = repositories::courses::list_with_counts(state.db(), &user.id, &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    let students =
        repositories::enrollments::list_active_students_for_teacher(state.db(), &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    Ok(Json(TeacherDashboardResponse {
        user: UserResponse::from_db(user),
        courses: courses.into_iter().map(CourseSummaryResponse::from_db).collect(),
        students: group_students(students),
    }))
}

/// One entry per student, keeping the first-seen order of the rows.
fn group_students(rows: Vec<EnrolledStudent>) -> Vec<TeacherStudentResponse> {
    let mut grouped: Vec<TeacherStudentResponse> = Vec::new();
    for row in rows {
        match grouped.iter_mut().find(|entry| entry.student_id == row.student_id) {
            Some(entry) => entry.courses.push(row.course_title),
            None => grouped.push(TeacherStudentResponse {
                student_id: row.student_id,
                full_name: row.student_name,
                email: row.student_email,
                courses: vec![row.course_title],
            }),
        }
    }
    grouped
}
