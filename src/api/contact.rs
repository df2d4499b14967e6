use axum::{extract::State, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::metrics;
use crate::core::redis::CONTACT_RATE_LIMIT;
use crate::core::state::AppState;
use crate::schemas::contact::{ContactRequest, ContactResponse};
use crate::services::contact_links::{self, ContactMessage};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(contact))
}

async fn contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<ContactResponse>, ApiError> {
    payload.validate()?;

    if !state.redis().allow("contact", &payload.email, CONTACT_RATE_LIMIT).await {
        metrics::record_contact("rate_limited");
        return Err(ApiError::TooManyRequests("Demasiados mensajes, intenta más tarde"));
    }

    let message = ContactMessage {
        name: &payload.name,
        email: &payload.email,
        message: &payload.message,
    };
    let contact = state.settings().contact();

    let mailto = contact_links::mailto_url(&contact.email, &message)
        .map_err(|e| ApiError::internal(e, "Failed to build mailto link"))?;
    let whatsapp = contact_links::whatsapp_url(&contact.whatsapp_number, &message)
        .map_err(|e| ApiError::internal(e, "Failed to build WhatsApp link"))?;

    metrics::record_contact("generated");
    tracing::info!(action = "contact", "Contact links generated");

    Ok(Json(ContactResponse {
        mailto_url: mailto.to_string(),
        whatsapp_url: whatsapp.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::core::config::Settings;
    use crate::test_support;

    #[tokio::test]
    async fn contact_form_returns_outbound_links() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let app = test_support::offline_app(Settings::load().expect("settings"));

        let response = app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/contact",
                None,
                Some(json!({
                    "name": "Ana López",
                    "email": "ana@example.com",
                    "message": "Quiero información del curso de inglés"
                })),
            ))
            .await
            .expect("contact");

        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        let mailto = body["mailto_url"].as_str().expect("mailto");
        assert!(mailto.starts_with("mailto:clubpoliglotamx@gmail.com?subject="));
        let whatsapp = body["whatsapp_url"].as_str().expect("whatsapp");
        assert!(whatsapp.starts_with("https://wa.me/526143977741?text="));
    }

    #[tokio::test]
    async fn short_message_is_rejected_per_field() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let app = test_support::offline_app(Settings::load().expect("settings"));

        let response = app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/contact",
                None,
                Some(json!({"name": "A", "email": "ana@example.com", "message": "hola"})),
            ))
            .await
            .expect("contact");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = test_support::read_json(response).await;
        assert_eq!(body["fields"]["message"][0], "El mensaje debe tener al menos 10 caracteres");
        assert!(body["fields"]["name"].is_array());
    }
}
