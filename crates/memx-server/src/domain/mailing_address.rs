use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use uuid::Uuid;

use super::profile::Address;

/// Singleton record of the association's physical mailing address.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MailingAddress {
    pub id: Uuid,
    pub address: Json<Address>,
    pub updated_at: DateTime<Utc>,
}
