use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::Serialize;

/// A file spooled to transient storage for the duration of a send.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    attachments: Vec<RelayAttachment>,
}

#[derive(Serialize)]
struct RelayAttachment {
    filename: String,
    content: String,
}

/// Client for the mail relay's HTTP API.
#[derive(Clone)]
pub struct MailerClient {
    client: Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl MailerClient {
    pub fn new(client: Client, base_url: &str, api_key: &str, from: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }

    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        text: &str,
        attachments: &[Attachment],
    ) -> Result<()> {
        let mut relay_attachments = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let bytes = tokio::fs::read(&attachment.path).await?;
            relay_attachments.push(RelayAttachment {
                filename: attachment.filename.clone(),
                content: STANDARD.encode(bytes),
            });
        }

        let message = RelayMessage {
            from: &self.from,
            to,
            subject,
            text,
            attachments: relay_attachments,
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&message)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("mail relay rejected message: {}", response.status()));
        }
        Ok(())
    }
}
