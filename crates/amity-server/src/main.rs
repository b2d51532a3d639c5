//! Amity server binary
//!
//! Reads a TOML config when one is given, applies command-line overrides,
//! and serves the relationship API.

use amity_server::{config::ServerConfig, start_server, ServerError};
use clap::Parser;
use std::process;

/// Friend, subscription and block management over HTTP
#[derive(Debug, Parser)]
#[command(name = "amity-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML config file; an in-memory database is used without one
    #[arg(short, long, env = "AMITY_CONFIG")]
    config: Option<String>,

    /// SQLite file, or `:memory:`
    #[arg(short, long)]
    database: Option<String>,

    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// Port to bind
    #[arg(short, long)]
    port: Option<u16>,
}

impl Args {
    fn server_config(&self) -> Result<ServerConfig, ServerError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default_test_config(),
        };

        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }
        if let Some(bind) = &self.bind {
            config.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            config.bind_port = port;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let result = match args.server_config() {
        Ok(config) => start_server(config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
