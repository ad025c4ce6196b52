use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Extension, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::auth::AuthContext;
use crate::domain::{verify_event, PaymentEvent};
use crate::error::{AppError, Result};
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "x-payment-signature";

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub amount_cents: i64,
    pub title: String,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

/// Creates a membership-payment checkout link. The caller's user id rides
/// along as the payment note so the completion webhook can locate the
/// business.
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    if req.amount_cents <= 0 {
        return Err(AppError::Validation("amount must be positive".into()));
    }
    if req.title.is_empty() {
        return Err(AppError::Validation("title is required".into()));
    }

    let url = state
        .payments
        .create_payment_link(&req.title, req.amount_cents, &auth.user_id)
        .await
        .map_err(|e| AppError::Payments(e.to_string()))?;

    Ok(Json(CheckoutResponse { url }))
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub message: &'static str,
}

/// Payment-provider webhook. Signature-authenticated instead of
/// session-authenticated; must read the raw body, since the signature
/// covers the exact bytes.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;

    if !verify_event(
        &state.config.payments_notification_url,
        &body,
        &state.config.payments_signature_key,
        signature,
    ) {
        return Err(AppError::InvalidSignature);
    }

    let event: PaymentEvent = serde_json::from_slice(&body)
        .map_err(|_| AppError::Validation("malformed event payload".into()))?;

    if event.event_type != "payment.updated" {
        return Err(AppError::Validation(format!(
            "unsupported event type: {}",
            event.event_type
        )));
    }

    let payment = event.data.object.payment;
    if payment.status != "COMPLETED" {
        return Ok(Json(WebhookResponse {
            message: "payment not completed",
        }));
    }

    let user_id = payment
        .note
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("payment note missing user id".into()))?;

    let now = Utc::now();
    let updated = sqlx::query(
        r#"
        UPDATE businesses
        SET membership_expiry_date = $2, last_pay_date = $3, updated_at = $3
        WHERE user_id = $1
        "#,
    )
    .bind(&user_id)
    .bind(now + Duration::days(365))
    .bind(now)
    .execute(&state.db)
    .await?;

    if updated.rows_affected() == 0 {
        tracing::warn!(user_id = %user_id, "completed payment for unknown business");
        return Err(AppError::BusinessNotFound);
    }

    Ok(Json(WebhookResponse {
        message: "payment processed",
    }))
}
