use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::Enrollment;
use crate::db::types::EnrollmentStatus;
use crate::repositories::enrollments;

#[derive(Debug, Error)]
pub(crate) enum EnrollmentError {
    #[error("course not found")]
    CourseNotFound,
    #[error("course is full ({max_students} seats)")]
    CourseFull { max_students: i32 },
    #[error("student already has an active enrollment in this course")]
    AlreadyEnrolled,
    #[error("enrollment not found")]
    EnrollmentNotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl EnrollmentError {
    /// Label used for the enrollment outcome counter.
    pub(crate) fn outcome(&self) -> &'static str {
        match self {
            EnrollmentError::CourseNotFound => "course_not_found",
            EnrollmentError::CourseFull { .. } => "course_full",
            EnrollmentError::AlreadyEnrolled => "already_enrolled",
            EnrollmentError::EnrollmentNotFound => "enrollment_not_found",
            EnrollmentError::Database(_) => "error",
        }
    }
}

/// Seat snapshot taken while the course row is locked.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SeatCheck {
    pub(crate) course_active: bool,
    pub(crate) max_students: i32,
    pub(crate) active_count: i64,
    pub(crate) already_enrolled: bool,
}

pub(crate) fn check_seat(seat: SeatCheck) -> Result<(), EnrollmentError> {
    if !seat.course_active {
        return Err(EnrollmentError::CourseNotFound);
    }
    if seat.already_enrolled {
        return Err(EnrollmentError::AlreadyEnrolled);
    }
    if seat.active_count >= i64::from(seat.max_students) {
        return Err(EnrollmentError::CourseFull { max_students: seat.max_students });
    }
    Ok(())
}

/// Creates an active enrollment. The course row stays locked from the seat
/// count until commit, so two concurrent calls cannot both take the last seat.
pub(crate) async fn enroll(
    pool: &PgPool,
    course_id: &str,
    student_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<Enrollment, EnrollmentError> {
    let mut tx = pool.begin().await?;

    let seats = enrollments::lock_course_seats(&mut *tx, course_id)
        .await?
        .ok_or(EnrollmentError::CourseNotFound)?;
    let active_count = enrollments::count_active(&mut *tx, course_id).await?;
    let existing = enrollments::find_active_for(&mut *tx, student_id, course_id).await?;

    check_seat(SeatCheck {
        course_active: seats.is_active,
        max_students: seats.max_students,
        active_count,
        already_enrolled: existing.is_some(),
    })?;

    let enrollment = enrollments::insert_active(
        &mut *tx,
        &Uuid::new_v4().to_string(),
        student_id,
        course_id,
        now,
    )
    .await
    .map_err(map_unique_violation)?;

    tx.commit().await?;
    Ok(enrollment)
}

/// Changes an enrollment's status; moving to `active` takes a seat under the
/// same rules as [`enroll`].
pub(crate) async fn change_status(
    pool: &PgPool,
    enrollment_id: &str,
    status: EnrollmentStatus,
    now: time::PrimitiveDateTime,
) -> Result<Enrollment, EnrollmentError> {
    let mut tx = pool.begin().await?;

    let current = enrollments::find_by_id(&mut *tx, enrollment_id)
        .await?
        .ok_or(EnrollmentError::EnrollmentNotFound)?;

    if status == EnrollmentStatus::Active && current.status != EnrollmentStatus::Active {
        let seats = enrollments::lock_course_seats(&mut *tx, &current.course_id)
            .await?
            .ok_or(EnrollmentError::CourseNotFound)?;
        let active_count = enrollments::count_active(&mut *tx, &current.course_id).await?;
        let existing =
            enrollments::find_active_for(&mut *tx, &current.student_id, &current.course_id)
                .await?;

        check_seat(SeatCheck {
            course_active: seats.is_active,
            max_students: seats.max_students,
            active_count,
            already_enrolled: existing.is_some(),
        })?;
    }

    let updated = enrollments::set_status(&mut *tx, enrollment_id, status, now)
        .await
        .map_err(map_unique_violation)?
        .ok_or(EnrollmentError::EnrollmentNotFound)?;

    tx.commit().await?;
    Ok(updated)
}

fn map_unique_violation(error: sqlx::Error) -> EnrollmentError {
    if crate::db::is_unique_violation(&error) {
        EnrollmentError::AlreadyEnrolled
    } else {
        EnrollmentError::Database(error)
    }
}
