pub mod api;
pub mod clients;
pub mod config;
pub mod domain;
pub mod error;
pub mod telemetry;
pub mod workers;

use anyhow::Result;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::routes;
use crate::clients::{IdentityClient, MailerClient, PaymentsClient, StorageClient};
use crate::config::Config;
use crate::workers::history_sweeper::HistorySweeper;
use crate::workers::notification_processor::NotificationProcessor;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub identity: IdentityClient,
    pub storage: StorageClient,
    pub mailer: MailerClient,
    pub payments: PaymentsClient,
}

pub struct App {
    state: Arc<AppState>,
    _notification_processor: NotificationProcessor,
    _history_sweeper: HistorySweeper,
}

impl App {
    pub fn db(&self) -> &PgPool {
        &self.state.db
    }

    pub async fn new(config: Config) -> Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&db).await?;

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let identity = IdentityClient::new(
            http_client.clone(),
            &config.identity_api_url,
            &config.identity_api_key,
        );
        let storage = StorageClient::new(
            http_client.clone(),
            &config.storage_api_url,
            &config.storage_api_key,
        );
        let mailer = MailerClient::new(
            http_client.clone(),
            &config.mailer_api_url,
            &config.mailer_api_key,
            &config.mailer_from,
        );
        let payments = PaymentsClient::new(
            http_client,
            &config.payments_api_url,
            &config.payments_access_token,
            &config.payments_location_id,
        );

        let state = Arc::new(AppState {
            db: db.clone(),
            config: config.clone(),
            identity,
            storage,
            mailer: mailer.clone(),
            payments,
        });

        let mut notification_processor = NotificationProcessor::new(db.clone(), mailer);
        notification_processor.start();

        let mut history_sweeper = HistorySweeper::new(db);
        history_sweeper.start();

        Ok(Self {
            state,
            _notification_processor: notification_processor,
            _history_sweeper: history_sweeper,
        })
    }

    pub fn router(&self) -> Router {
        routes::build(self.state.clone())
    }
}
