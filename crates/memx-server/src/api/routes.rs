use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::{
    businesses, emails, health, mailing_address, payments, requests, signups,
};
use crate::api::middleware::auth;
use crate::AppState;

async fn fallback() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "code": "not_found",
                "message": "The requested endpoint does not exist"
            }
        })),
    )
}

pub fn build(state: Arc<AppState>) -> Router {
    // Attachment spooling and per-recipient relay calls need more than the
    // standard request budget, so bulk send carries its own timeout.
    let email_send = Router::new()
        .route("/emails", post(emails::send))
        .layer(TimeoutLayer::new(Duration::from_secs(60)));

    let protected = Router::new()
        .route("/requests", post(requests::submit))
        .route("/requests", get(requests::list))
        .route("/requests/approve", post(requests::approve))
        .route("/requests/deny", post(requests::deny))
        .route("/requests/history/:id", get(requests::get_history))
        .route("/requests/:id", get(requests::get))
        .route("/signups", post(signups::submit))
        .route("/signups", get(signups::list))
        .route("/signups/approve", post(signups::approve))
        .route("/signups/deny", post(signups::deny))
        .route("/signups/:id", get(signups::get))
        .route("/businesses", get(businesses::list))
        .route("/businesses/me", get(businesses::me))
        .route("/businesses/:id", get(businesses::get))
        .route("/businesses/:id", patch(businesses::update))
        .route("/mailing-address", get(mailing_address::get))
        .route("/mailing-address", patch(mailing_address::update))
        .route("/emails/history", post(emails::log_message))
        .route("/emails/history", get(emails::history))
        .route("/payments/checkout", post(payments::checkout))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .merge(email_send)
        .layer(from_fn_with_state(state.clone(), auth::middleware));

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/payments/webhook", post(payments::webhook))
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    let api = Router::new()
        .nest("/v1", protected)
        .merge(public)
        .fallback(fallback);

    api.with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
}
