mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{address, businesses, emails, requests, signups};

#[derive(Parser)]
#[command(name = "memx")]
#[command(about = "memx CLI - Administer the membership management service")]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "API server URL")]
    server: Option<String>,

    #[arg(long, global = true, help = "Session token for authentication")]
    session_token: Option<String>,

    #[arg(long, global = true, help = "Output format", default_value = "table")]
    format: output::Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure CLI settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Review change requests
    #[command(alias = "req")]
    Request {
        #[command(subcommand)]
        command: requests::Commands,
    },
    /// Review signup applications
    Signup {
        #[command(subcommand)]
        command: signups::Commands,
    },
    /// Browse member businesses
    #[command(alias = "biz")]
    Business {
        #[command(subcommand)]
        command: businesses::Commands,
    },
    /// Send and review bulk email
    Email {
        #[command(subcommand)]
        command: emails::Commands,
    },
    /// Manage the association mailing address
    Address {
        #[command(subcommand)]
        command: address::Commands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration values
    Set {
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        session_token: Option<String>,
    },
    /// Show current configuration
    Show,
    /// Get config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::Config::load()?;
    if let Some(server) = cli.server {
        config.server = server;
    }
    if let Some(token) = cli.session_token {
        config.session_token = Some(token);
    }

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Set {
                server,
                session_token,
            } => {
                if let Some(server) = server {
                    config.server = server;
                }
                if let Some(token) = session_token {
                    config.session_token = Some(token);
                }
                config.save()?;
                output::print_success("configuration saved");
            }
            ConfigCommands::Show => {
                println!("server: {}", config.server);
                println!(
                    "session_token: {}",
                    config
                        .session_token
                        .as_deref()
                        .map(|_| "(set)")
                        .unwrap_or("(not set)")
                );
            }
            ConfigCommands::Path => {
                println!("{}", config::config_path()?.display());
            }
        },
        Commands::Request { command } => requests::run(command, &config, cli.format).await?,
        Commands::Signup { command } => signups::run(command, &config, cli.format).await?,
        Commands::Business { command } => businesses::run(command, &config, cli.format).await?,
        Commands::Email { command } => emails::run(command, &config, cli.format).await?,
        Commands::Address { command } => address::run(command, &config).await?,
    }

    Ok(())
}
