use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::config::Config;
use crate::output::{self, display_option, Format};

#[derive(Subcommand)]
pub enum Commands {
    /// List member businesses
    List {
        #[arg(long, help = "Filter by business type")]
        business_type: Option<String>,
        #[arg(long, default_value = "50")]
        limit: i64,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Show one business
    Get {
        #[arg(help = "Business ID")]
        id: Uuid,
    },
}

#[derive(Debug, Serialize, Deserialize, Tabled)]
pub struct BusinessRow {
    pub id: Uuid,
    pub business_name: String,
    #[serde(default)]
    #[tabled(display_with = "display_option")]
    pub business_type: Option<String>,
    pub business_owner: String,
    pub membership_expiry_date: String,
}

fn rows_from_list(items: Vec<serde_json::Value>) -> Vec<BusinessRow> {
    items
        .into_iter()
        .filter_map(|item| {
            Some(BusinessRow {
                id: item["id"].as_str()?.parse().ok()?,
                business_name: item["business_name"].as_str()?.to_string(),
                business_type: item["business_type"].as_str().map(String::from),
                business_owner: item["business_owner"].as_str().unwrap_or("-").to_string(),
                membership_expiry_date: item["membership_expiry_date"]
                    .as_str()
                    .unwrap_or("-")
                    .to_string(),
            })
        })
        .collect()
}

pub async fn run(cmd: Commands, config: &Config, format: Format) -> Result<()> {
    let client = ApiClient::new(config);

    match cmd {
        Commands::List {
            business_type,
            limit,
            offset,
        } => {
            let mut url = format!("/v1/businesses?limit={}", limit);
            if let Some(kind) = business_type {
                url.push_str(&format!("&business_type={}", kind));
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
            let business: serde_json::Value =
                client.get(&format!("/v1/businesses/{}", id)).await?;
            output::print_json(&business);
        }
    }

    Ok(())
}
