use anyhow::{Context, Result};
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub db_max_connections: u32,
    pub otlp_endpoint: Option<String>,

    /// HS256 secret for session bearer tokens issued by the auth frontend.
    pub session_secret: String,

    pub identity_api_url: String,
    pub identity_api_key: String,

    pub storage_api_url: String,
    pub storage_api_key: String,

    pub mailer_api_url: String,
    pub mailer_api_key: String,
    pub mailer_from: String,

    pub payments_api_url: String,
    pub payments_access_token: String,
    pub payments_location_id: String,
    pub payments_signature_key: String,
    pub payments_notification_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL required")?,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".into())
                .parse()?,
            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),

            session_secret: env::var("SESSION_SECRET").context("SESSION_SECRET required")?,

            identity_api_url: env::var("IDENTITY_API_URL").context("IDENTITY_API_URL required")?,
            identity_api_key: env::var("IDENTITY_API_KEY").context("IDENTITY_API_KEY required")?,

            storage_api_url: env::var("STORAGE_API_URL").context("STORAGE_API_URL required")?,
            storage_api_key: env::var("STORAGE_API_KEY").context("STORAGE_API_KEY required")?,

            mailer_api_url: env::var("MAILER_API_URL").context("MAILER_API_URL required")?,
            mailer_api_key: env::var("MAILER_API_KEY").context("MAILER_API_KEY required")?,
            mailer_from: env::var("MAILER_FROM").context("MAILER_FROM required")?,

            payments_api_url: env::var("PAYMENTS_API_URL").context("PAYMENTS_API_URL required")?,
            payments_access_token: env::var("PAYMENTS_ACCESS_TOKEN")
                .context("PAYMENTS_ACCESS_TOKEN required")?,
            payments_location_id: env::var("PAYMENTS_LOCATION_ID")
                .context("PAYMENTS_LOCATION_ID required")?,
            payments_signature_key: env::var("PAYMENTS_SIGNATURE_KEY")
                .context("PAYMENTS_SIGNATURE_KEY required")?,
            payments_notification_url: env::var("PAYMENTS_NOTIFICATION_URL")
                .context("PAYMENTS_NOTIFICATION_URL required")?,
        })
    }
}
