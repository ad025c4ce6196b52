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
    /// List signup applications
    List {
        #[arg(long, help = "open or closed; omit for all")]
        status: Option<String>,
        #[arg(long, default_value = "50")]
        limit: i64,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Show one application
    Get {
        #[arg(help = "Signup ID")]
        id: Uuid,
    },
    /// Approve an application and provision the business
    Approve {
        #[arg(help = "Signup ID")]
        id: Uuid,
    },
    /// Deny an application and remove the backing account
    Deny {
        #[arg(help = "Signup ID")]
        id: Uuid,
        #[arg(long, help = "Reason shown to the applicant")]
        message: Option<String>,
    },
}

#[derive(Debug, Serialize, Deserialize, Tabled)]
pub struct SignupRow {
    pub id: Uuid,
    pub user_id: String,
    pub business_name: String,
    pub status: String,
    #[serde(default)]
    #[tabled(display_with = "display_option")]
    pub decision: Option<String>,
}

fn rows_from_list(items: Vec<serde_json::Value>) -> Vec<SignupRow> {
    items
        .into_iter()
        .filter_map(|item| {
            Some(SignupRow {
                id: item["id"].as_str()?.parse().ok()?,
                user_id: item["user_id"].as_str()?.to_string(),
                business_name: item["profile"]["business_name"]
                    .as_str()
                    .unwrap_or("-")
                    .to_string(),
                status: item["status"].as_str().unwrap_or("-").to_string(),
                decision: item["decision"].as_str().map(String::from),
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
            let mut url = format!("/v1/signups?limit={}", limit);
            if let Some(status) = status {
                url.push_str(&format!("&status={}", status));
            }
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
            let detail: serde_json::Value = client.get(&format!("/v1/signups/{}", id)).await?;
            output::print_json(&detail);
        }
        Commands::Approve { id } => {
            let response: serde_json::Value = client
                .post("/v1/signups/approve", &json!({ "request_id": id }))
                .await?;
            output::print_success(response["message"].as_str().unwrap_or("signup approved"));
        }
        Commands::Deny { id, message } => {
            let response: serde_json::Value = client
                .post(
                    "/v1/signups/deny",
                    &json!({ "request_id": id, "denial_message": message }),
                )
                .await?;
            output::print_success(response["message"].as_str().unwrap_or("signup denied"));
        }
    }

    Ok(())
}
