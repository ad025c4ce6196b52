use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::auth::AuthContext;
use crate::domain::{Business, Profile, ProfilePatch};
use crate::error::{AppError, Result};
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    offset: Option<i64>,
    business_type: Option<String>,
}

fn default_limit() -> i64 {
    50
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Business>>> {
    auth.require_admin()?;

    let businesses: Vec<Business> = match &query.business_type {
        Some(business_type) => {
            sqlx::query_as(
                r#"
                SELECT * FROM businesses
                WHERE business_type = $1
                ORDER BY created_at DESC
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(business_type)
            .bind(query.limit)
            .bind(query.offset.unwrap_or(0))
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM businesses ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                .bind(query.limit)
                .bind(query.offset.unwrap_or(0))
                .fetch_all(&state.db)
                .await?
        }
    };

    Ok(Json(businesses))
}

/// The caller's own business record.
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Business>> {
    let business: Business = sqlx::query_as("SELECT * FROM businesses WHERE user_id = $1")
        .bind(&auth.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::BusinessNotFound)?;

    Ok(Json(business))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Business>> {
    auth.require_admin()?;

    let business: Business = sqlx::query_as("SELECT * FROM businesses WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::BusinessNotFound)?;

    Ok(Json(business))
}

/// Direct admin edit, bypassing the request workflow. Only supplied
/// fields are written, with the same merge rules as an approval.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<Business>> {
    auth.require_admin()?;

    let mut business: Business = sqlx::query_as("SELECT * FROM businesses WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::BusinessNotFound)?;

    patch.apply_to(&mut business.profile);

    let now = Utc::now();
    save_profile(&state.db, business.id, &business.profile, now).await?;
    business.updated_at = now;

    Ok(Json(business))
}

/// Writes every profile column of a business row. Shared by the request
/// approval path and direct admin edits.
pub(crate) async fn save_profile<'e, E>(
    executor: E,
    business_id: Uuid,
    profile: &Profile,
    now: DateTime<Utc>,
) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE businesses
        SET business_name = $2,
            business_owner = $3,
            organization_type = $4,
            business_type = $5,
            business_scale = $6,
            number_of_employees = $7,
            gender = $8,
            website = $9,
            description = $10,
            physical_address = $11,
            mailing_address = $12,
            point_of_contact = $13,
            social_handles = $14,
            logo_url = $15,
            banner_url = $16,
            updated_at = $17
        WHERE id = $1
        "#,
    )
    .bind(business_id)
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
    .execute(executor)
    .await?;

    Ok(())
}
