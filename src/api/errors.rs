use std::collections::BTreeMap;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::enrollment::EnrollmentError;

/// Per-field validation messages, keyed by request field name.
pub(crate) type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    code: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    Validation(FieldErrors),
    NotFound(String),
    Conflict(String),
    CourseFull(String),
    TooManyRequests(&'static str),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    /// Stable machine-readable code; clients branch on this, never on `detail`.
    pub(crate) fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "auth",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::BadRequest(_) | ApiError::Validation(_) => "validation",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::CourseFull(_) => "course_full",
            ApiError::TooManyRequests(_) => "rate_limited",
            ApiError::ServiceUnavailable(_) => "unavailable",
            ApiError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::CourseFull(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|error| {
                        error
                            .message
                            .as_ref()
                            .map(|message| message.to_string())
                            .unwrap_or_else(|| error.code.to_string())
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        ApiError::Validation(fields)
    }
}

impl From<EnrollmentError> for ApiError {
    fn from(error: EnrollmentError) -> Self {
        match error {
            EnrollmentError::CourseNotFound => ApiError::NotFound("Course not found".to_string()),
            EnrollmentError::EnrollmentNotFound => {
                ApiError::NotFound("Enrollment not found".to_string())
            }
            EnrollmentError::CourseFull { max_students } => ApiError::CourseFull(format!(
                "El curso está lleno ({max_students} lugares)"
            )),
            EnrollmentError::AlreadyEnrolled => {
                ApiError::Conflict("Ya existe una inscripción activa en este curso".to_string())
            }
            EnrollmentError::Database(e) => ApiError::internal(e, "Failed to enroll"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (detail, fields) = match self {
            ApiError::Unauthorized(message) | ApiError::Forbidden(message) => {
                (message.to_string(), None)
            }
            ApiError::TooManyRequests(message) => (message.to_string(), None),
            ApiError::Validation(fields) => ("Validation failed".to_string(), Some(fields)),
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                (message, None)
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (message, None)
            }
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::CourseFull(message) => (message, None),
        };

        let mut response =
            (status, Json(ErrorResponse { status: status.as_u16(), code, detail, fields }))
                .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}
