use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schemas::deserialize_trimmed;
use crate::schemas::user::UserResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RegisterRequest {
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(email(message = "Correo electrónico inválido"))]
    pub(crate) email: String,
    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres"))]
    pub(crate) password: String,
    #[serde(alias = "fullName", alias = "name", deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 2, message = "El nombre debe tener al menos 2 caracteres"))]
    pub(crate) full_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LoginRequest {
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(email(message = "Correo electrónico inválido"))]
    pub(crate) email: String,
    #[validate(length(min = 1, message = "La contraseña es obligatoria"))]
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AuthResponse {
    pub(crate) token: String,
    pub(crate) token_type: &'static str,
    pub(crate) user: UserResponse,
}
