use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use super::profile::ProfilePatch;

/// Days a closed request stays in `request_history` before the sweeper
/// removes it.
pub const HISTORY_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Denied,
}

/// A pending change proposal for one business. At most one open request
/// exists per business; submissions while one is open merge into it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChangeRequest {
    pub id: Uuid,
    pub user_id: String,
    pub old: Json<ProfilePatch>,
    pub new: Json<ProfilePatch>,
    pub status: RequestStatus,
    pub decision: Option<Decision>,
    pub denial_message: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable archive of a resolved request; expires
/// [`HISTORY_RETENTION_DAYS`] after the decision.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RequestHistory {
    pub id: Uuid,
    pub request_id: Uuid,
    pub user_id: String,
    pub old: Json<ProfilePatch>,
    pub new: Json<ProfilePatch>,
    pub decision: Decision,
    pub denial_message: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub decided_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub fn history_expiry(decided_at: DateTime<Utc>) -> DateTime<Utc> {
    decided_at + Duration::days(HISTORY_RETENTION_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_expires_thirty_days_after_decision() {
        let decided_at = Utc::now();
        let expires = history_expiry(decided_at);
        assert_eq!(expires - decided_at, Duration::days(30));
    }
}
