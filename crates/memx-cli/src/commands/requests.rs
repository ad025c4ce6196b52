use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::Tabled;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::config::Config;
use crate::output::{self, display_option, Format};

#[derive(Subcommand)]
pub enum Commands {
    /// List change requests
    List {
        #[arg(long, default_value = "open")]
        status: String,
        #[arg(long, default_value = "50")]
        limit: i64,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Show one request with its change map
    Get {
        #[arg(help = "Request ID")]
        id: Uuid,
    },
    /// Approve a change request
    Approve {
        #[arg(help = "Request ID")]
        id: Uuid,
    },
    /// Deny a change request
    Deny {
        #[arg(help = "Request ID")]
        id: Uuid,
        #[arg(long, help = "Reason shown to the business")]
        message: Option<String>,
    },
    /// Show one archived request
    History {
        #[arg(help = "History ID")]
        id: Uuid,
    },
}

#[derive(Debug, Serialize, Deserialize, Tabled)]
pub struct RequestRow {
    pub id: Uuid,
    pub user_id: String,
    pub status: String,
    #[serde(default)]
    #[tabled(display_with = "display_option")]
    pub decision: Option<String>,
    pub submitted_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct DecisionResponse {
    message: String,
    history_id: Uuid,
}

fn rows_from_list(items: Vec<serde_json::Value>) -> Vec<RequestRow> {
    items
        .into_iter()
        .filter_map(|item| {
            Some(RequestRow {
                id: item["id"].as_str()?.parse().ok()?,
                user_id: item["user_id"].as_str()?.to_string(),
                status: item["status"].as_str().unwrap_or("closed").to_string(),
                decision: item["decision"].as_str().map(String::from),
                submitted_at: item["submitted_at"].as_str().unwrap_or("-").to_string(),
            })
        })
        .collect()
}

pub async fn run(cmd: Commands, config: &Config, format: Format) -> Result<()> {
    let client = ApiClient::new(config);

    match cmd {
        Commands::List {
            status,
            limit,
            offset,
        } => {
            let mut url = format!("/v1/requests?status={}&limit={}", status, limit);
            if let Some(off) = offset {
                url.push_str(&format!("&offset={}", off));
            }
            let items: Vec<serde_json::Value> = client.get(&url).await?;
            match format {
                Format::Json => output::print_json(&items),
                Format::Table => output::print_items(rows_from_list(items), format),
            }
        }
        Commands::Get { id } => {
            let detail: serde_json::Value = client.get(&format!("/v1/requests/{}", id)).await?;
            output::print_json(&detail);
        }
        Commands::Approve { id } => {
            let response: DecisionResponse = client
                .post("/v1/requests/approve", &json!({ "request_id": id }))
                .await?;
            output::print_success(&format!(
                "{} (history {})",
                response.message, response.history_id
            ));
        }
        Commands::Deny { id, message } => {
            let response: DecisionResponse = client
                .post(
                    "/v1/requests/deny",
                    &json!({ "request_id": id, "denial_message": message }),
                )
                .await?;
            output::print_success(&format!(
                "{} (history {})",
                response.message, response.history_id
            ));
        }
        Commands::History { id } => {
            let detail: serde_json::Value =
                client.get(&format!("/v1/requests/history/{}", id)).await?;
            output::print_json(&detail);
        }
    }

    Ok(())
}
