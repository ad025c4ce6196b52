use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use crate::api::middleware::auth::AuthContext;
use crate::domain::{AddressPatch, MailingAddress};
use crate::error::{AppError, Result};
use crate::AppState;

pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MailingAddress>> {
    auth.require_admin()?;

    let address: MailingAddress =
        sqlx::query_as("SELECT * FROM admin_mailing_address ORDER BY updated_at DESC LIMIT 1")
            .fetch_optional(&state.db)
            .await?
            .ok_or(AppError::MailingAddressNotSet)?;

    Ok(Json(address))
}

/// Partial update; creates the singleton row on first write.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(patch): Json<AddressPatch>,
) -> Result<Json<MailingAddress>> {
    auth.require_admin()?;

    let existing: Option<MailingAddress> =
        sqlx::query_as("SELECT * FROM admin_mailing_address ORDER BY updated_at DESC LIMIT 1")
            .fetch_optional(&state.db)
            .await?;

    let updated: MailingAddress = match existing {
        Some(record) => {
            let mut address = record.address.0.clone();
            if let Some(street) = patch.street {
                address.street = street;
            }
            if let Some(city) = patch.city {
                address.city = city;
            }
            if let Some(state_field) = patch.state {
                address.state = state_field;
            }
            if let Some(zip) = patch.zip {
                address.zip = zip;
            }

            sqlx::query_as(
                r#"
                UPDATE admin_mailing_address
                SET address = $2, updated_at = $3
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(record.id)
            .bind(sqlx::types::Json(address))
            .bind(Utc::now())
            .fetch_one(&state.db)
            .await?
        }
        None => {
            let address = crate::domain::Address {
                street: patch.street.unwrap_or_default(),
                city: patch.city.unwrap_or_default(),
                state: patch.state.unwrap_or_default(),
                zip: patch.zip.unwrap_or_default(),
            };

            sqlx::query_as(
                r#"
                INSERT INTO admin_mailing_address (id, address, updated_at)
                VALUES ($1, $2, $3)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(sqlx::types::Json(address))
            .bind(Utc::now())
            .fetch_one(&state.db)
            .await?
        }
    };

    Ok(Json(updated))
}
