use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// Who a bulk email went to: a direct address, a business-type audience, or
/// both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directly_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
}

impl Recipient {
    pub fn is_empty(&self) -> bool {
        self.directly_to.is_none() && self.business_type.is_none()
    }
}

/// Append-only log row for the admin communications history view.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SentMessage {
    pub id: Uuid,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<String>,
    pub recipient: Json<Recipient>,
    pub created_at: DateTime<Utc>,
}
