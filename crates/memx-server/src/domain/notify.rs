use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// Lifecycle email templates. The variants mirror the four request/signup
/// decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BusinessApproved,
    BusinessDenied,
    SignupApproved,
    SignupDenied,
}

/// Template parameters, stored alongside the outbox row so delivery can be
/// retried without re-reading lifecycle state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationParams {
    pub business_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denial_message: Option<String>,
}

/// A queued lifecycle notification. Inserted in the same transaction as the
/// decision it announces; drained by the notification worker.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmailOutbox {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub recipient: String,
    pub params: Json<NotificationParams>,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Rendered subject/body pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

const SIGNATURE: &str = "- The Business Association Team";

pub fn render(kind: NotificationKind, params: &NotificationParams) -> RenderedEmail {
    let name = &params.business_name;
    match kind {
        NotificationKind::BusinessApproved => RenderedEmail {
            subject: "Your business change request has been approved!".into(),
            body: format!(
                "Hello,\n\nYour request to update information for \"{name}\" has been \
                 approved and the changes are now live.\n\nThank you for keeping your \
                 business information up to date!\n\n{SIGNATURE}"
            ),
        },
        NotificationKind::BusinessDenied => {
            let reason = params
                .denial_message
                .as_deref()
                .filter(|m| !m.is_empty())
                .map(|m| format!("\n\nReason: {m}"))
                .unwrap_or_default();
            RenderedEmail {
                subject: "Your business change request was denied".into(),
                body: format!(
                    "Hello,\n\nUnfortunately, your request to update information for \
                     \"{name}\" was denied.{reason}\n\nIf you have questions, please \
                     contact us.\n\n{SIGNATURE}"
                ),
            }
        }
        NotificationKind::SignupApproved => RenderedEmail {
            subject: "Your business signup has been approved!".into(),
            body: format!(
                "Congratulations!\n\nYour signup request for \"{name}\" has been \
                 approved. You are now a member of the association.\n\nWelcome \
                 aboard!\n\n{SIGNATURE}"
            ),
        },
        NotificationKind::SignupDenied => RenderedEmail {
            subject: "Your business signup was denied".into(),
            body: format!(
                "Hello,\n\nUnfortunately, your signup request for \"{name}\" was \
                 denied.\n\nIf you have questions or believe this was a mistake, \
                 please contact us.\n\n{SIGNATURE}"
            ),
        },
    }
}
