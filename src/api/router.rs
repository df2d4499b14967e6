use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
    http::{HeaderName, Method, Request, Response},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::api::{
    activities, auth, contact, courses, dashboard, enrollments, forum, handlers, navigation,
    recordings, users,
};
use crate::core::{config::Settings, state::AppState};

/// Multipart framing on top of the largest accepted upload.
const BODY_LIMIT_SLACK_BYTES: usize = 1024 * 1024;
const REQUEST_ID_HEADER: &str = "x-request-id";

pub(crate) fn router(state: AppState) -> Router {
    let cors = build_cors_layer(state.settings());
    let api_prefix = state.settings().api().api_prefix.clone();
    let body_limit = upload_body_limit(state.settings());

    let api = Router::new()
        .route("/config", get(handlers::client_config))
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/courses", courses::router())
        .nest("/enrollments", enrollments::router())
        .nest("/recordings", recordings::router())
        .nest("/forum", forum::router())
        .nest("/activities", activities::router())
        .nest("/dashboard", dashboard::router())
        .nest("/navigation", navigation::router())
        .nest("/contact", contact::router());

    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(request_span).on_response(record_response);

    let mut router: Router<AppState> = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz).head(handlers::healthz))
        .nest(&api_prefix, api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(trace_layer)
        .layer(cors);

    if state.settings().telemetry().prometheus_enabled {
        router = router.route("/metrics", get(handlers::metrics));
    }

    router.with_state(state)
}

fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id
    )
}

fn record_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    let status = response.status();
    let class = match status.as_u16() {
        500.. => "5xx",
        400..=499 => "4xx",
        _ => "ok",
    };
    metrics::counter!(
        "http_requests_total",
        "status" => status.as_u16().to_string(),
        "class" => class
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "class" => class)
        .record(latency.as_secs_f64());
}

fn upload_body_limit(settings: &Settings) -> usize {
    let upload_bytes = settings.storage().max_upload_size_mb.saturating_mul(1024 * 1024);
    usize::try_from(upload_bytes).unwrap_or(usize::MAX).saturating_add(BODY_LIMIT_SLACK_BYTES)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins = settings
        .cors()
        .origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            ORIGIN,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() {
        // Wildcard origin cannot be combined with allow_credentials
        base.allow_origin(Any)
    } else {
        base.allow_credentials(true).allow_origin(AllowOrigin::list(origins))
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use crate::core::{config::Settings, metrics};
    use crate::test_support;

    #[tokio::test]
    async fn root_returns_banner() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let app = test_support::offline_app(Settings::load().expect("settings"));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let json = test_support::read_json(response).await;
        assert_eq!(json["message"], "Club Políglota API");
        assert_eq!(json["api_prefix"], "/api");
    }

    #[tokio::test]
    async fn client_config_exposes_contact_info() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("CONTACT_WHATSAPP", "6140001122");
        let app = test_support::offline_app(Settings::load().expect("settings"));

        let response = app
            .oneshot(Request::builder().uri("/api/config").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = test_support::read_json(response).await;
        assert_eq!(json["api_prefix"], "/api");
        assert_eq!(json["whatsapp_number"], "6140001122");
        assert_eq!(json["contact_email"], "clubpoliglotamx@gmail.com");
        std::env::remove_var("CONTACT_WHATSAPP");
    }

    #[tokio::test]
    async fn metrics_disabled_returns_404() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let app = test_support::offline_app(Settings::load().expect("settings"));

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_enabled_returns_200() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("PROMETHEUS_ENABLED", "1");

        let settings = Settings::load().expect("settings");
        metrics::init(&settings).expect("metrics init");
        let app = test_support::offline_app(settings);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        std::env::set_var("PROMETHEUS_ENABLED", "0");
    }
}
