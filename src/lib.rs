pub mod cli;
pub mod config;
pub mod history;
pub mod llm;
pub mod models;
pub mod server;
pub mod session;

use cli::Args;
use config::ChatConfig;
use llm::ChatClient;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("WebSocket Address: {}", args.server_addr);
    info!("HTTP Port: {}", args.http_port);
    info!("Model: {}", args.model);
    info!("Endpoint URL: {}", args.url.as_deref().unwrap_or("unset"));
    info!("API Key: {}", if args.api_key.is_some() { "set" } else { "unset" });
    info!("Request Timeout (s): {}", args.request_timeout_secs);
    info!("-------------------------");

    let config = Arc::new(ChatConfig::from_args(&args)?);
    let client = Arc::new(ChatClient::new(config)?);
    let server = Server::new(client, &args)?;
    server.run().await?;

    Ok(())
}
