use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::error;
use uuid::Uuid;

use crate::clients::MailerClient;
use crate::domain::{render, EmailOutbox};

/// Drains the lifecycle-notification outbox. Rows are written in the same
/// transaction as the decision they announce; delivery happens here, with
/// retries, so a relay outage never blocks an approval or denial.
pub struct NotificationProcessor {
    pool: PgPool,
    mailer: MailerClient,
    handle: Option<JoinHandle<()>>,
}

impl NotificationProcessor {
    pub fn new(pool: PgPool, mailer: MailerClient) -> Self {
        Self {
            pool,
            mailer,
            handle: None,
        }
    }

    pub fn start(&mut self) {
        let pool = self.pool.clone();
        let mailer = self.mailer.clone();

        let handle = tokio::spawn(async move {
            loop {
                if let Err(e) = process_batch(&pool, &mailer).await {
                    error!(error = %e, "notification processing error");
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        });

        self.handle = Some(handle);
    }
}

async fn process_batch(pool: &PgPool, mailer: &MailerClient) -> anyhow::Result<()> {
    let pending: Vec<EmailOutbox> = sqlx::query_as(
        r#"
        SELECT * FROM email_outbox
        WHERE status IN ('pending', 'retrying')
        AND next_attempt_at <= NOW()
        ORDER BY created_at
        LIMIT 50
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .fetch_all(pool)
    .await?;

    for notification in pending {
        match deliver(mailer, &notification).await {
            Ok(_) => mark_sent(pool, notification.id).await?,
            Err(e) => schedule_retry(pool, notification.id, &e.to_string()).await?,
        }
    }

    Ok(())
}

async fn deliver(mailer: &MailerClient, notification: &EmailOutbox) -> anyhow::Result<()> {
    let rendered = render(notification.kind, &notification.params.0);
    mailer
        .send(&notification.recipient, &rendered.subject, &rendered.body, &[])
        .await
}

async fn mark_sent(pool: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("UPDATE email_outbox SET status = 'sent', processed_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn schedule_retry(pool: &PgPool, id: Uuid, error: &str) -> anyhow::Result<()> {
    let notification: Option<EmailOutbox> =
        sqlx::query_as("SELECT * FROM email_outbox WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    let notification = match notification {
        Some(n) => n,
        None => return Ok(()),
    };

    let next_attempt = notification.attempts + 1;

    if next_attempt >= notification.max_attempts {
        sqlx::query("UPDATE email_outbox SET status = 'failed', last_error = $1 WHERE id = $2")
            .bind(error)
            .bind(id)
            .execute(pool)
            .await?;
    } else {
        let delay_secs = 2i64.pow(next_attempt as u32).min(3600);
        let jitter = rand::random::<i64>() % 1000;
        let next_attempt_at = Utc::now() + chrono::Duration::seconds(delay_secs + jitter / 1000);

        sqlx::query(
            "UPDATE email_outbox SET status = 'retrying', attempts = $1, next_attempt_at = $2, last_error = $3 WHERE id = $4",
        )
        .bind(next_attempt)
        .bind(next_attempt_at)
        .bind(error)
        .bind(id)
        .execute(pool)
        .await?;
    }

    Ok(())
}
