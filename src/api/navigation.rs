use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};

use crate::api::guards::bearer_token;
use crate::core::{security, state::AppState};
use crate::repositories;
use crate::schemas::navigation::{NavigationQuery, NavigationResponse};
use crate::services::route_guard::{self, SessionState};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(navigate))
}

/// Never fails: a missing or invalid token is an anonymous visitor and a
/// failed role lookup is a session without a known role.
async fn navigate(
    Query(params): Query<NavigationQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Json<NavigationResponse> {
    let session = session_state(&state, &headers).await;
    let decision = route_guard::decide(&params.path, session);

    tracing::debug!(path = %params.path, ?session, ?decision, "Navigation decision");

    Json(NavigationResponse { decision, path: params.path })
}

async fn session_state(state: &AppState, headers: &HeaderMap) -> SessionState {
    let Some(token) = bearer_token(headers) else {
        return SessionState::Anonymous;
    };
    let Ok(claims) = security::verify_token(token, state.settings()) else {
        return SessionState::Anonymous;
    };

    match repositories::users::find_role_by_id(state.db(), &claims.sub).await {
        Ok(Some(role)) => SessionState::Authenticated { role: Some(role) },
        Ok(None) => SessionState::Anonymous,
        Err(error) => {
            tracing::warn!(error = %error, user_id = %claims.sub, "Role lookup failed");
            SessionState::Authenticated { role: None }
        }
    }
}
