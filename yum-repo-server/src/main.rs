//! `yummy` - yum repository server binary.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use yum_repo_server::{run_server, Config};

#[derive(Parser)]
#[command(name = "yummy")]
#[command(about = "Yum repository server with upload, delete and automatic reindexing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the first .yummy.yaml found)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the repository server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },

    /// Validate the configuration and print the effective settings
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = yum_logging::init_subscriber();

    let cli = Cli::parse();
    let (mut config, source) = Config::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            info!(version = env!("CARGO_PKG_VERSION"), "Starting yummy");
            run_server(config).await
        }
        Commands::Check => {
            let config = config.validate()?;
            match &source {
                Some(path) => println!("# config file: {}", path.display()),
                None => println!("# config file: none, using defaults"),
            }
            print!("{}", config.redacted().to_yaml()?);
            Ok(())
        }
    }
}
