use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::auth::AuthContext;
use crate::clients::is_default_object;
use crate::domain::{
    diff, history_expiry, Business, ChangeRequest, Decision, NotificationKind,
    NotificationParams, ProfilePatch, RequestHistory, RequestStatus,
};
use crate::error::{AppError, Result};
use crate::AppState;

use super::businesses::save_profile;

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub request_id: Option<Uuid>,
    #[serde(flatten)]
    pub patch: ProfilePatch,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SubmitRequest>,
) -> Result<impl IntoResponse> {
    if req.patch.is_empty() {
        return Err(AppError::Validation("no profile fields provided".into()));
    }

    let existing: Option<ChangeRequest> = match req.request_id {
        Some(id) => {
            let request: ChangeRequest =
                sqlx::query_as("SELECT * FROM change_requests WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&state.db)
                    .await?
                    .ok_or(AppError::RequestNotFound(id))?;

            if request.user_id != auth.user_id {
                return Err(AppError::NotRequestOwner);
            }
            if request.status != RequestStatus::Open {
                return Err(AppError::RequestClosed(id));
            }
            Some(request)
        }
        None => {
            sqlx::query_as(
                "SELECT * FROM change_requests WHERE user_id = $1 AND status = 'open'",
            )
            .bind(&auth.user_id)
            .fetch_optional(&state.db)
            .await?
        }
    };

    match existing {
        Some(mut request) => {
            request.new.0.merge(req.patch);

            let updated: ChangeRequest = sqlx::query_as(
                r#"
                UPDATE change_requests
                SET new = $2, updated_at = $3
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(request.id)
            .bind(&request.new)
            .bind(Utc::now())
            .fetch_one(&state.db)
            .await?;

            Ok((StatusCode::OK, Json(updated)))
        }
        None => {
            let business: Business = sqlx::query_as("SELECT * FROM businesses WHERE user_id = $1")
                .bind(&auth.user_id)
                .fetch_optional(&state.db)
                .await?
                .ok_or(AppError::BusinessNotFound)?;

            let now = Utc::now();
            let created: ChangeRequest = sqlx::query_as(
                r#"
                INSERT INTO change_requests (id, user_id, old, new, status, submitted_at, updated_at)
                VALUES ($1, $2, $3, $4, 'open', $5, $5)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&auth.user_id)
            .bind(sqlx::types::Json(ProfilePatch::snapshot(&business.profile)))
            .bind(sqlx::types::Json(req.patch))
            .bind(now)
            .fetch_one(&state.db)
            .await?;

            Ok((StatusCode::CREATED, Json(created)))
        }
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_status")]
    status: String,
    #[serde(default = "default_limit")]
    limit: i64,
    offset: Option<i64>,
}

fn default_status() -> String {
    "open".into()
}

fn default_limit() -> i64 {
    50
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let offset = query.offset.unwrap_or(0);

    match query.status.as_str() {
        "open" => {
            let requests: Vec<ChangeRequest> = if auth.is_admin() {
                sqlx::query_as(
                    "SELECT * FROM change_requests ORDER BY submitted_at DESC LIMIT $1 OFFSET $2",
                )
                .bind(query.limit)
                .bind(offset)
                .fetch_all(&state.db)
                .await?
            } else {
                sqlx::query_as(
                    r#"
                    SELECT * FROM change_requests
                    WHERE user_id = $1
                    ORDER BY submitted_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(&auth.user_id)
                .bind(query.limit)
                .bind(offset)
                .fetch_all(&state.db)
                .await?
            };
            Ok(Json(requests).into_response())
        }
        "closed" => {
            let history: Vec<RequestHistory> = if auth.is_admin() {
                sqlx::query_as(
                    "SELECT * FROM request_history ORDER BY decided_at DESC LIMIT $1 OFFSET $2",
                )
                .bind(query.limit)
                .bind(offset)
                .fetch_all(&state.db)
                .await?
            } else {
                sqlx::query_as(
                    r#"
                    SELECT * FROM request_history
                    WHERE user_id = $1
                    ORDER BY decided_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(&auth.user_id)
                .bind(query.limit)
                .bind(offset)
                .fetch_all(&state.db)
                .await?
            };
            Ok(Json(history).into_response())
        }
        other => Err(AppError::Validation(format!("unknown status: {other}"))),
    }
}

#[derive(Serialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: ChangeRequest,
    pub changes: BTreeMap<String, bool>,
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestDetail>> {
    auth.require_admin()?;

    let request: ChangeRequest = sqlx::query_as("SELECT * FROM change_requests WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::RequestNotFound(id))?;

    let changes = diff::change_set(&request.old.0, &request.new.0);
    Ok(Json(RequestDetail { request, changes }))
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub request_id: Uuid,
    pub denial_message: Option<String>,
}

#[derive(Serialize)]
pub struct DecisionResponse {
    pub message: &'static str,
    pub history_id: Uuid,
}

pub async fn approve(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>> {
    auth.require_admin()?;

    let request: ChangeRequest = sqlx::query_as("SELECT * FROM change_requests WHERE id = $1")
        .bind(req.request_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::RequestNotFound(req.request_id))?;

    let mut business: Business = sqlx::query_as("SELECT * FROM businesses WHERE user_id = $1")
        .bind(&request.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::BusinessNotFound)?;

    let replaced = request.new.0.apply_to(&mut business.profile);

    let mut tx = state.db.begin().await?;
    let now = Utc::now();

    save_profile(&mut *tx, business.id, &business.profile, now).await?;

    let history_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO request_history
            (id, request_id, user_id, old, new, decision, denial_message,
             submitted_at, decided_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, NULL, $7, $8, $9)
        "#,
    )
    .bind(history_id)
    .bind(request.id)
    .bind(&request.user_id)
    .bind(&request.old)
    .bind(&request.new)
    .bind(Decision::Approved)
    .bind(request.submitted_at)
    .bind(now)
    .bind(history_expiry(now))
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM change_requests WHERE id = $1")
        .bind(request.id)
        .execute(&mut *tx)
        .await?;

    if let Some(email) = business.contact_email() {
        enqueue_notification(
            &mut tx,
            NotificationKind::BusinessApproved,
            email,
            &NotificationParams {
                business_name: business.profile.business_name.clone(),
                denial_message: None,
            },
        )
        .await?;
    }

    tx.commit().await?;

    // Stale images are cleaned up outside the transaction; a storage
    // failure must not undo an already-committed approval.
    for stale in [replaced.logo, replaced.banner].into_iter().flatten() {
        if is_default_object(&stale) {
            continue;
        }
        if let Err(e) = state.storage.delete_object(&stale).await {
            tracing::warn!(url = %stale, error = %e, "failed to delete replaced image");
        }
    }

    Ok(Json(DecisionResponse {
        message: "request approved",
        history_id,
    }))
}

pub async fn deny(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>> {
    auth.require_admin()?;

    let request: ChangeRequest = sqlx::query_as("SELECT * FROM change_requests WHERE id = $1")
        .bind(req.request_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::RequestNotFound(req.request_id))?;

    let mut tx = state.db.begin().await?;
    let now = Utc::now();

    let history_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO request_history
            (id, request_id, user_id, old, new, decision, denial_message,
             submitted_at, decided_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(history_id)
    .bind(request.id)
    .bind(&request.user_id)
    .bind(&request.old)
    .bind(&request.new)
    .bind(Decision::Denied)
    .bind(&req.denial_message)
    .bind(request.submitted_at)
    .bind(now)
    .bind(history_expiry(now))
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM change_requests WHERE id = $1")
        .bind(request.id)
        .execute(&mut *tx)
        .await?;

    let recipient = request
        .new
        .0
        .contact_email()
        .or_else(|| request.old.0.contact_email());
    if let Some(email) = recipient {
        let business_name = request
            .new
            .0
            .business_name
            .as_deref()
            .or(request.old.0.business_name.as_deref())
            .unwrap_or_default()
            .to_string();
        enqueue_notification(
            &mut tx,
            NotificationKind::BusinessDenied,
            email,
            &NotificationParams {
                business_name,
                denial_message: req.denial_message.clone(),
            },
        )
        .await?;
    }

    tx.commit().await?;

    Ok(Json(DecisionResponse {
        message: "request denied",
        history_id,
    }))
}

#[derive(Serialize)]
pub struct HistoryDetail {
    #[serde(flatten)]
    pub history: RequestHistory,
    pub changes: BTreeMap<String, bool>,
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryDetail>> {
    auth.require_admin()?;

    let history: RequestHistory = sqlx::query_as("SELECT * FROM request_history WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::HistoryNotFound(id))?;

    let changes = diff::change_set(&history.old.0, &history.new.0);
    Ok(Json(HistoryDetail { history, changes }))
}

pub(crate) async fn enqueue_notification(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    kind: NotificationKind,
    recipient: &str,
    params: &NotificationParams,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO email_outbox
            (id, kind, recipient, params, status, attempts, max_attempts, next_attempt_at, created_at)
        VALUES ($1, $2, $3, $4, 'pending', 0, 5, NOW(), NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(kind)
    .bind(recipient)
    .bind(sqlx::types::Json(params))
    .execute(&mut **tx)
    .await?;

    Ok(())
}
