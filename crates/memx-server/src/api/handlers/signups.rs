use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as Jsonb;
use uuid::Uuid;

use crate::api::middleware::auth::AuthContext;
use crate::domain::{
    validate_signup, Address, Contact, NotificationKind, NotificationParams, Profile,
    ProfilePatch, RequestStatus, SignupRequest,
};
use crate::error::{AppError, Result};
use crate::AppState;

use super::requests::enqueue_notification;

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(profile): Json<ProfilePatch>,
) -> Result<impl IntoResponse> {
    let errors = validate_signup(&profile);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors.join("; ")));
    }

    let existing: Option<SignupRequest> = sqlx::query_as(
        "SELECT * FROM signup_requests WHERE user_id = $1 AND status = 'open'",
    )
    .bind(&auth.user_id)
    .fetch_optional(&state.db)
    .await?;

    match existing {
        Some(signup) => {
            let updated: SignupRequest = sqlx::query_as(
                r#"
                UPDATE signup_requests
                SET profile = $2, updated_at = $3
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(signup.id)
            .bind(Jsonb(&profile))
            .bind(Utc::now())
            .fetch_one(&state.db)
            .await?;

            Ok((StatusCode::OK, Json(updated)))
        }
        None => {
            let created: SignupRequest = sqlx::query_as(
                r#"
                INSERT INTO signup_requests (id, user_id, profile, status, submitted_at, updated_at)
                VALUES ($1, $2, $3, 'open', $4, $4)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&auth.user_id)
            .bind(Jsonb(&profile))
            .bind(Utc::now())
            .fetch_one(&state.db)
            .await?;

            Ok((StatusCode::CREATED, Json(created)))
        }
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    status: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
    offset: Option<i64>,
}

fn default_limit() -> i64 {
    50
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SignupRequest>>> {
    auth.require_admin()?;

    let signups: Vec<SignupRequest> = match query.status.as_deref() {
        Some(status @ ("open" | "closed")) => {
            sqlx::query_as(
                r#"
                SELECT * FROM signup_requests
                WHERE status = $1
                ORDER BY submitted_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(status)
            .bind(query.limit)
            .bind(query.offset.unwrap_or(0))
            .fetch_all(&state.db)
            .await?
        }
        Some(other) => return Err(AppError::Validation(format!("unknown status: {other}"))),
        None => {
            sqlx::query_as(
                "SELECT * FROM signup_requests ORDER BY submitted_at DESC LIMIT $1 OFFSET $2",
            )
            .bind(query.limit)
            .bind(query.offset.unwrap_or(0))
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(Json(signups))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<SignupRequest>> {
    auth.require_admin()?;

    let signup: SignupRequest = sqlx::query_as("SELECT * FROM signup_requests WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::SignupNotFound(id))?;

    Ok(Json(signup))
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub request_id: Uuid,
    pub denial_message: Option<String>,
}

#[derive(Serialize)]
pub struct ApproveResponse {
    pub message: &'static str,
    pub business_id: Uuid,
}

pub async fn approve(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<ApproveResponse>> {
    auth.require_admin()?;

    let signup: SignupRequest = sqlx::query_as("SELECT * FROM signup_requests WHERE id = $1")
        .bind(req.request_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::SignupNotFound(req.request_id))?;

    if signup.status != RequestStatus::Open {
        return Err(AppError::RequestClosed(signup.id));
    }

    let profile = profile_from_signup(&signup.profile.0)?;

    let mut tx = state.db.begin().await?;
    let now = Utc::now();
    let business_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO businesses
            (id, user_id, business_name, business_owner, organization_type, business_type,
             business_scale, number_of_employees, gender, website, description,
             physical_address, mailing_address, point_of_contact, social_handles,
             logo_url, banner_url, membership_start_date, membership_expiry_date,
             last_pay_date, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, NULL, $20, $20)
        "#,
    )
    .bind(business_id)
    .bind(&signup.user_id)
    .bind(&profile.business_name)
    .bind(&profile.business_owner)
    .bind(&profile.organization_type)
    .bind(&profile.business_type)
    .bind(&profile.business_scale)
    .bind(&profile.number_of_employees)
    .bind(&profile.gender)
    .bind(&profile.website)
    .bind(&profile.description)
    .bind(&profile.physical_address)
    .bind(&profile.mailing_address)
    .bind(&profile.point_of_contact)
    .bind(&profile.social_handles)
    .bind(&profile.logo_url)
    .bind(&profile.banner_url)
    .bind(now)
    .bind(now + Duration::days(365))
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE signup_requests
        SET status = 'closed', decision = 'approved', updated_at = $2
        WHERE id = $1
        "#,
    )
    .bind(signup.id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let contact_email = profile.point_of_contact.0.email.clone();
    if !contact_email.is_empty() {
        enqueue_notification(
            &mut tx,
            NotificationKind::SignupApproved,
            &contact_email,
            &NotificationParams {
                business_name: profile.business_name.clone(),
                denial_message: None,
            },
        )
        .await?;
    }

    tx.commit().await?;

    // Role promotion happens against the identity provider after commit;
    // the membership itself is already in effect.
    if let Err(e) = state.identity.set_role(&signup.user_id, "business").await {
        tracing::warn!(user_id = %signup.user_id, error = %e, "failed to promote account role");
    }

    Ok(Json(ApproveResponse {
        message: "signup approved",
        business_id,
    }))
}

pub async fn deny(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<serde_json::Value>> {
    auth.require_admin()?;

    let signup: SignupRequest = sqlx::query_as("SELECT * FROM signup_requests WHERE id = $1")
        .bind(req.request_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::SignupNotFound(req.request_id))?;

    if signup.status != RequestStatus::Open {
        return Err(AppError::RequestClosed(signup.id));
    }

    // Fails closed: the backing account must be gone before the request is
    // marked denied, so an error here leaves the signup open and untouched.
    state
        .identity
        .delete_user(&signup.user_id)
        .await
        .map_err(|e| AppError::Identity(e.to_string()))?;

    let mut tx = state.db.begin().await?;

    sqlx::query(
        r#"
        UPDATE signup_requests
        SET status = 'closed', decision = 'denied', denial_message = $2, updated_at = $3
        WHERE id = $1
        "#,
    )
    .bind(signup.id)
    .bind(&req.denial_message)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    if let Some(email) = signup.profile.0.contact_email() {
        enqueue_notification(
            &mut tx,
            NotificationKind::SignupDenied,
            email,
            &NotificationParams {
                business_name: signup
                    .profile
                    .0
                    .business_name
                    .clone()
                    .unwrap_or_default(),
                denial_message: req.denial_message.clone(),
            },
        )
        .await?;
    }

    tx.commit().await?;

    Ok(Json(serde_json::json!({ "message": "signup denied" })))
}

fn profile_from_signup(patch: &ProfilePatch) -> Result<Profile> {
    let required = |field: &Option<String>, name: &str| -> Result<String> {
        field
            .clone()
            .ok_or_else(|| AppError::Validation(format!("signup payload missing {name}")))
    };

    let address = |patch: &Option<crate::domain::AddressPatch>, name: &str| -> Result<Address> {
        let patch = patch
            .as_ref()
            .ok_or_else(|| AppError::Validation(format!("signup payload missing {name}")))?;
        Ok(Address {
            street: required(&patch.street, name)?,
            city: required(&patch.city, name)?,
            state: required(&patch.state, name)?,
            zip: required(&patch.zip, name)?,
        })
    };

    let contact_patch = patch
        .point_of_contact
        .as_ref()
        .ok_or_else(|| AppError::Validation("signup payload missing point of contact".into()))?;

    Ok(Profile {
        business_name: required(&patch.business_name, "business name")?,
        business_owner: required(&patch.business_owner, "business owner")?,
        organization_type: required(&patch.organization_type, "organization type")?,
        business_type: patch.business_type.clone(),
        business_scale: patch.business_scale.clone(),
        number_of_employees: patch.number_of_employees.clone(),
        gender: patch.gender.clone(),
        website: patch.website.clone(),
        description: required(&patch.description, "description")?,
        physical_address: Jsonb(address(&patch.physical_address, "physical address")?),
        mailing_address: Jsonb(address(&patch.mailing_address, "mailing address")?),
        point_of_contact: Jsonb(Contact {
            name: required(&contact_patch.name, "contact name")?,
            phone_number: required(&contact_patch.phone_number, "contact phone")?,
            email: required(&contact_patch.email, "contact email")?,
        }),
        social_handles: patch.social_handles.clone().map(Jsonb),
        logo_url: patch.logo_url.clone(),
        banner_url: patch.banner_url.clone(),
    })
}
