//! Chairbook booking server library.
//!
//! Exposes the router and its building blocks so the binary and the
//! integration tests serve the same application.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, middleware as axum_middleware, routing::get};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
                user_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;
    use tower::ServiceExt;
    use url::Url;

    use crate::config::{IdentityConfig, ServerConfig};

    /// An app whose pool never connects: nothing listens on port 1.
    fn test_app() -> Router {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(2))
            .connect_lazy("postgres://127.0.0.1:1/chairbook_unused")
            .unwrap();
        let config = ServerConfig {
            database_url: SecretString::from("postgres://localhost/chairbook_unused"),
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            identity: IdentityConfig {
                base_url: Url::parse("http://127.0.0.1:9/").unwrap(),
                session_cookie: "__session".to_string(),
                cache_ttl: Duration::from_secs(60),
                request_timeout: Duration::from_secs(1),
            },
            default_daily_capacity: 32,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        app(AppState::new(config, pool).unwrap())
    }

    async fn send(method: Method, uri: &str) -> axum::response::Response {
        test_app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("x-forwarded-for", "203.0.113.7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let resp = send(Method::GET, "/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_check_rejects_missing_date() {
        let resp = send(Method::GET, "/availability/check?shopId=1").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_check_answers_all_open_without_database() {
        let resp = send(Method::GET, "/availability/check?shopId=1&date=2024-06-10").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let day: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(day["isAvailable"], true);
        let slots = day["availableTimes"].as_array().unwrap();
        assert_eq!(slots.len(), 16);
        assert!(slots.iter().all(|s| s["available"] == true));
    }

    #[tokio::test]
    async fn test_month_rejects_malformed_dates() {
        let resp = send(
            Method::GET,
            "/shops/1/availability/month?startDate=June&endDate=2024-06-30",
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_appointments_require_a_session() {
        assert_eq!(
            send(Method::GET, "/appointments").await.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            send(Method::DELETE, "/appointments/1").await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let resp = send(Method::GET, "/nope").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
