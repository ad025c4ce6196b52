use anyhow::Result;
use clap::Subcommand;
use serde_json::json;

use crate::client::ApiClient;
use crate::config::Config;
use crate::output;

#[derive(Subcommand)]
pub enum Commands {
    /// Show the association's mailing address
    Show,
    /// Update mailing address fields (only provided flags change)
    Set {
        #[arg(long)]
        street: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        zip: Option<String>,
    },
}

pub async fn run(cmd: Commands, config: &Config) -> Result<()> {
    let client = ApiClient::new(config);

    match cmd {
        Commands::Show => {
            let address: serde_json::Value = client.get("/v1/mailing-address").await?;
            output::print_json(&address);
        }
        Commands::Set {
            street,
            city,
            state,
            zip,
        } => {
            let mut patch = serde_json::Map::new();
            if let Some(street) = street {
                patch.insert("street".into(), json!(street));
            }
            if let Some(city) = city {
                patch.insert("city".into(), json!(city));
            }
            if let Some(state) = state {
                patch.insert("state".into(), json!(state));
            }
            if let Some(zip) = zip {
                patch.insert("zip".into(), json!(zip));
            }

            let updated: serde_json::Value = client
                .patch("/v1/mailing-address", &serde_json::Value::Object(patch))
                .await?;
            output::print_success("mailing address updated");
            output::print_json(&updated);
        }
    }

    Ok(())
}
