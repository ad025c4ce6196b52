use anyhow::{bail, Context, Result};
use reqwest::multipart::Form;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::Config;

pub struct ApiClient {
    client: Client,
    base_url: String,
    session_token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.server.trim_end_matches('/').to_string(),
            session_token: config.session_token.clone(),
        }
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session_token {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let req = self.authorized(self.client.get(&url));
        let resp = req.send().await.context("request failed")?;
        self.handle_response(resp).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let req = self.authorized(self.client.post(&url).json(body));
        let resp = req.send().await.context("request failed")?;
        self.handle_response(resp).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let req = self.authorized(self.client.patch(&url).json(body));
        let resp = req.send().await.context("request failed")?;
        self.handle_response(resp).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let req = self.authorized(self.client.post(&url).multipart(form));
        let resp = req.send().await.context("request failed")?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        let text = resp.text().await.context("failed to read response body")?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<serde_json::Value>(&text) {
                if let Some(message) = error["error"]["message"].as_str() {
                    bail!("{} ({})", message, status);
                }
            }
            bail!("request failed with {}: {}", status, text);
        }

        serde_json::from_str(&text).context("failed to parse response body")
    }
}
