use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ContactRequest {
    #[validate(length(min = 2, message = "El nombre debe tener al menos 2 caracteres"))]
    pub(crate) name: String,
    #[validate(email(message = "Correo electrónico inválido"))]
    pub(crate) email: String,
    #[validate(length(min = 10, message = "El mensaje debe tener al menos 10 caracteres"))]
    pub(crate) message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ContactResponse {
    pub(crate) mailto_url: String,
    pub(crate) whatsapp_url: String,
}
