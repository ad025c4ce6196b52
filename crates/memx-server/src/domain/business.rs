use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::profile::Profile;

/// Canonical member record. `user_id` is the identity-provider id of the
/// account that owns this business and is unique across the table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Business {
    pub id: Uuid,
    pub user_id: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub profile: Profile,
    pub membership_start_date: DateTime<Utc>,
    pub membership_expiry_date: DateTime<Utc>,
    pub last_pay_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Business {
    pub fn contact_email(&self) -> Option<&str> {
        let email = self.profile.point_of_contact.0.email.as_str();
        (!email.is_empty()).then_some(email)
    }
}
