use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;

/// Placeholder assets shipped with the frontend. They are shared across
/// businesses and must never be deleted when a profile replaces them.
const DEFAULT_PREFIX: &str = "Default_";

/// Object-storage client. Uploads happen in the frontend against
/// pre-signed URLs; the server only deletes objects displaced by approved
/// profile changes.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl StorageClient {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Deletes the object behind a public URL. Callers treat failures as
    /// log-only; an approval never fails because of a stale image.
    pub async fn delete_object(&self, public_url: &str) -> Result<()> {
        let Some(key) = object_key(public_url) else {
            return Err(anyhow!("no object key in url: {public_url}"));
        };
        if is_default_object(public_url) {
            return Ok(());
        }

        let url = format!("{}/objects/{}", self.base_url, key);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("object deletion failed: {}", response.status()));
        }
        Ok(())
    }
}

/// Extracts the object key (final path segment) from a public URL.
pub fn object_key(public_url: &str) -> Option<&str> {
    let without_query = public_url.split(['?', '#']).next().unwrap_or(public_url);
    let key = without_query.rsplit('/').next()?;
    (!key.is_empty() && key != without_query).then_some(key)
}

pub fn is_default_object(public_url: &str) -> bool {
    object_key(public_url).is_some_and(|key| key.starts_with(DEFAULT_PREFIX))
}
