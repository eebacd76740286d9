use keeper::{KeeperClient, ServiceConfig};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Commands, ConnectionArgs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("keeper=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = KeeperClient::new(service_config(&cli.connection)?)?;

    match &cli.command {
        Commands::Ping => commands::ping::run(&client).await,
        Commands::Keys(args) => commands::keys::run(&client, args).await,
        Commands::Get(args) => commands::get::run(&client, args).await,
        Commands::Put(args) => commands::put::run(&client, args).await,
        Commands::Push(args) => commands::push::run(&client, args).await,
    }
}

/// Translate the connection flags into a client configuration.
fn service_config(args: &ConnectionArgs) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    let host = args
        .url
        .host_str()
        .ok_or_else(|| format!("keeper URL '{}' has no host", args.url))?;
    let port = args
        .url
        .port_or_known_default()
        .ok_or_else(|| format!("keeper URL '{}' has no port", args.url))?;

    Ok(ServiceConfig {
        protocol: args.url.scheme().to_string(),
        host: host.to_string(),
        port,
        base_path: args.base_path.clone(),
        timeout_secs: args.timeout,
        ..ServiceConfig::default()
    })
}
