use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info};

const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Enforces the retention window on `request_history`: rows past their
/// `expires_at` are deleted on a fixed cadence.
pub struct HistorySweeper {
    pool: PgPool,
    handle: Option<JoinHandle<()>>,
}

impl HistorySweeper {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, handle: None }
    }

    pub fn start(&mut self) {
        let pool = self.pool.clone();

        let handle = tokio::spawn(async move {
            loop {
                match sweep(&pool).await {
                    Ok(0) => {}
                    Ok(swept) => info!(swept, "expired request history removed"),
                    Err(e) => error!(error = %e, "history sweep error"),
                }
                tokio::time::sleep(SWEEP_INTERVAL).await;
            }
        });

        self.handle = Some(handle);
    }
}

async fn sweep(pool: &PgPool) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM request_history WHERE expires_at <= NOW()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
