use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::json;

/// Management client for the external identity provider. Session
/// verification happens locally against the shared secret; this client only
/// covers account administration.
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl IdentityClient {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Deletes the backing account. Signup denial depends on this
    /// succeeding; callers must treat an error as fatal to the denial.
    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        let url = format!("{}/users/{}", self.base_url, user_id);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("account deletion failed: {}", response.status()));
        }
        Ok(())
    }

    /// Promotes the account's role claim. Best-effort after signup
    /// approval.
    pub async fn set_role(&self, user_id: &str, role: &str) -> Result<()> {
        let url = format!("{}/users/{}/metadata", self.base_url, user_id);
        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "public_metadata": { "role": role } }))
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("role update failed: {}", response.status()));
        }
        Ok(())
    }
}
