use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Recording;
use crate::schemas::{deserialize_datetime, deserialize_trimmed};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RecordingCreate {
    #[serde(alias = "courseId")]
    pub(crate) course_id: String,
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 3, message = "El título debe tener al menos 3 caracteres"))]
    pub(crate) title: String,
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(url(message = "La URL de la grabación no es válida"))]
    pub(crate) url: String,
    #[serde(alias = "expiresAt", deserialize_with = "deserialize_datetime")]
    pub(crate) expires_at: time::PrimitiveDateTime,
    #[serde(default, alias = "isPremium")]
    pub(crate) is_premium: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordingListQuery {
    #[serde(default)]
    pub(crate) course_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RecordingResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) url: String,
    pub(crate) is_premium: bool,
    pub(crate) view_count: i32,
    pub(crate) expires_at: String,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
}

impl RecordingResponse {
    pub(crate) fn from_db(recording: Recording) -> Self {
        Self {
            id: recording.id,
            course_id: recording.course_id,
            title: recording.title,
            url: recording.url,
            is_premium: recording.is_premium,
            view_count: recording.view_count,
            expires_at: format_primitive(recording.expires_at),
            created_by: recording.created_by,
            created_at: format_primitive(recording.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ViewCountResponse {
    pub(crate) id: String,
    pub(crate) view_count: i32,
}
