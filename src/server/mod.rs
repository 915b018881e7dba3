pub mod api;
pub mod websocket;

use crate::cli::Args;
use crate::llm::ChatClient;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct Server {
    ws_addr: SocketAddr,
    http_port: u16,
    client: Arc<ChatClient>,
}

impl Server {
    pub fn new(client: Arc<ChatClient>, args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let ws_addr = args.server_addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid server address '{}': {}", args.server_addr, e))?;

        Ok(Self {
            ws_addr,
            http_port: args.http_port,
            client,
        })
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.start_http_server().await?;
        self.start_ws_server().await?;
        Ok(())
    }

    async fn start_http_server(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(
            self.http_port,
            self.client.clone(),
            self.ws_addr.port(),
        ).await
    }

    async fn start_ws_server(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        websocket::start_ws_server(self.ws_addr, self.client.clone()).await
    }
}
