use std::path::Path as FilePath;
use std::sync::Arc;

use axum::extract::{Extension, Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::middleware::auth::AuthContext;
use crate::clients::Attachment;
use crate::domain::{Recipient, SentMessage};
use crate::error::{AppError, Result};
use crate::AppState;

#[derive(Serialize)]
pub struct SendResponse {
    pub message: String,
    pub sent: usize,
}

/// Bulk send. Multipart form: `to_addresses` (JSON array string),
/// `subject`, `body`, and any number of `attachment` file parts.
pub async fn send(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    mut form: Multipart,
) -> Result<Json<SendResponse>> {
    auth.require_admin()?;

    let mut to_addresses: Option<Vec<String>> = None;
    let mut subject: Option<String> = None;
    let mut body: Option<String> = None;
    let mut attachments: Vec<Attachment> = Vec::new();

    let outcome = async {
        while let Some(field) = form
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("malformed form: {e}")))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("to_addresses") => {
                    let raw = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(e.to_string()))?;
                    let parsed: Vec<String> = serde_json::from_str(&raw)
                        .map_err(|_| AppError::Validation("invalid to_addresses format".into()))?;
                    to_addresses = Some(parsed);
                }
                Some("subject") => {
                    subject = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| AppError::Validation(e.to_string()))?,
                    );
                }
                Some("body") => {
                    body = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| AppError::Validation(e.to_string()))?,
                    );
                }
                Some("attachment") => {
                    let filename = field
                        .file_name()
                        .map(sanitize_filename)
                        .unwrap_or_else(|| "attachment".into());
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(e.to_string()))?;
                    if bytes.is_empty() {
                        continue;
                    }

                    let path =
                        std::env::temp_dir().join(format!("memx-{}-{}", Uuid::new_v4(), filename));
                    tokio::fs::write(&path, &bytes)
                        .await
                        .map_err(|e| AppError::Internal(e.into()))?;
                    attachments.push(Attachment { filename, path });
                }
                _ => {}
            }
        }

        let to_addresses = to_addresses
            .take()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Validation("to_addresses is required".into()))?;
        let subject = subject
            .take()
            .ok_or_else(|| AppError::Validation("subject is required".into()))?;
        let body = body
            .take()
            .ok_or_else(|| AppError::Validation("body is required".into()))?;

        let mut sent = 0;
        for to in &to_addresses {
            state
                .mailer
                .send(to, &subject, &body, &attachments)
                .await
                .map_err(AppError::Internal)?;
            sent += 1;
        }

        Ok(SendResponse {
            message: format!("sent to {sent} recipients"),
            sent,
        })
    }
    .await;

    cleanup_attachments(&attachments).await;

    outcome.map(Json)
}

/// Spooled attachments are transient; removal failures are logged and
/// otherwise ignored.
async fn cleanup_attachments(attachments: &[Attachment]) {
    for attachment in attachments {
        if let Err(e) = tokio::fs::remove_file(&attachment.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %attachment.path.display(), error = %e, "failed to remove temp attachment");
            }
        }
    }
}

fn sanitize_filename(name: &str) -> String {
    FilePath::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".into())
}

#[derive(Deserialize)]
pub struct LogMessageRequest {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub recipient: Recipient,
}

pub async fn log_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<LogMessageRequest>,
) -> Result<Json<SentMessage>> {
    auth.require_admin()?;

    if req.subject.is_empty() || req.body.is_empty() || req.recipient.is_empty() {
        return Err(AppError::Validation(
            "subject, body and recipient are required".into(),
        ));
    }

    let message: SentMessage = sqlx::query_as(
        r#"
        INSERT INTO sent_messages (id, subject, body, attachments, recipient, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&req.subject)
    .bind(&req.body)
    .bind(&req.attachments)
    .bind(sqlx::types::Json(&req.recipient))
    .fetch_one(&state.db)
    .await?;

    Ok(Json(message))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    offset: Option<i64>,
}

fn default_limit() -> i64 {
    50
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<SentMessage>>> {
    auth.require_admin()?;

    let messages: Vec<SentMessage> =
        sqlx::query_as("SELECT * FROM sent_messages ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(query.limit)
            .bind(query.offset.unwrap_or(0))
            .fetch_all(&state.db)
            .await?;

    Ok(Json(messages))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_stripped_to_their_base_name() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("dir/nested/file.txt"), "file.txt");
    }
}
