use anyhow::Result;
use aura_node::{api, config::NodeConfig, logging, AuraNode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "aura")]
#[command(about = "Aura Core - reputation ledger and group lifecycle service", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the aura service
    Start {
        /// Port for the HTTP API
        #[arg(long)]
        api_port: Option<u16>,
    },

    /// Write a default configuration file
    Init {
        /// Output path for the configuration
        #[arg(short, long, default_value = "aura.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Commands::Start { api_port } => {
            let mut config = match &cli.config {
                Some(path) => NodeConfig::from_file(path)?,
                None => {
                    let mut config = NodeConfig::default();
                    config.apply_env_overrides();
                    config
                }
            };
            if let Some(port) = api_port {
                config.api.port = port;
            }

            let port = config.api.port;
            let node = Arc::new(AuraNode::new(config));
            let server = api::start_api_server(node, port);

            tokio::signal::ctrl_c().await?;
            info!("Shutting down");
            server.abort();
            Ok(())
        }
        Commands::Init { output } => {
            let config = NodeConfig::default();
            config.save(&output)?;
            info!("Wrote default configuration to {}", output.display());
            Ok(())
        }
    }
}
