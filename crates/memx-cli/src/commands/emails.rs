use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::config::Config;
use crate::output::{self, Format};

#[derive(Subcommand)]
pub enum Commands {
    /// Send a bulk email to one or more addresses
    Send {
        #[arg(long = "to", required = true, help = "Recipient address (repeatable)")]
        to: Vec<String>,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        #[arg(long = "attachment", help = "File to attach (repeatable)")]
        attachments: Vec<PathBuf>,
        #[arg(long, help = "Business type to record as the audience")]
        business_type: Option<String>,
    },
    /// List previously sent messages
    History {
        #[arg(long, default_value = "50")]
        limit: i64,
        #[arg(long)]
        offset: Option<i64>,
    },
}

#[derive(Debug, Serialize, Deserialize, Tabled)]
pub struct MessageRow {
    pub subject: String,
    pub recipient: String,
    pub attachments: usize,
    pub created_at: String,
}

fn rows_from_list(items: Vec<serde_json::Value>) -> Vec<MessageRow> {
    items
        .into_iter()
        .map(|item| MessageRow {
            subject: item["subject"].as_str().unwrap_or("-").to_string(),
            recipient: item["recipient"]["directly_to"]
                .as_str()
                .or(item["recipient"]["business_type"].as_str())
                .unwrap_or("-")
                .to_string(),
            attachments: item["attachments"].as_array().map_or(0, Vec::len),
            created_at: item["created_at"].as_str().unwrap_or("-").to_string(),
        })
        .collect()
}

pub async fn run(cmd: Commands, config: &Config, format: Format) -> Result<()> {
    let client = ApiClient::new(config);

    match cmd {
        Commands::Send {
            to,
            subject,
            body,
            attachments,
            business_type,
        } => {
            let mut form = Form::new()
                .text("to_addresses", serde_json::to_string(&to)?)
                .text("subject", subject.clone())
                .text("body", body.clone());

            let mut attachment_names = Vec::new();
            for path in &attachments {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "attachment".into());
                attachment_names.push(filename.clone());
                form = form.part("attachment", Part::bytes(bytes).file_name(filename));
            }

            let response: serde_json::Value = client.post_multipart("/v1/emails", form).await?;
            output::print_success(response["message"].as_str().unwrap_or("sent"));

            // Record the send in the communications history.
            let recipient = match (&business_type, to.first()) {
                (Some(kind), _) => json!({ "business_type": kind }),
                (None, Some(first)) if to.len() == 1 => json!({ "directly_to": first }),
                _ => json!({ "directly_to": to.join(", ") }),
            };
            let _: serde_json::Value = client
                .post(
                    "/v1/emails/history",
                    &json!({
                        "subject": subject,
                        "body": body,
                        "attachments": attachment_names,
                        "recipient": recipient,
                    }),
                )
                .await?;
        }
        Commands::History { limit, offset } => {
            let mut url = format!("/v1/emails/history?limit={}", limit);
            if let Some(off) = offset {
                url.push_str(&format!("&offset={}", off));
            }
            let items: Vec<serde_json::Value> = client.get(&url).await?;
            match format {
                Format::Json => output::print_json(&items),
                Format::Table => output::print_items(rows_from_list(items), format),
            }
        }
    }

    Ok(())
}
