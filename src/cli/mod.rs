use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Endpoint Args ---
    /// Bearer token for the chat-completions endpoint.
    #[arg(long, env = "API_KEY")]
    pub api_key: Option<String>,

    /// Full URL of the chat-completions endpoint (e.g., https://api.example.com/v1/chat/completions)
    #[arg(long, env = "URL")]
    pub url: Option<String>,

    /// Model identifier sent with every request.
    #[arg(long, env = "MODEL", default_value = "your-model-id")]
    pub model: String,

    /// Seconds to wait for the response head and between body reads. 0 waits forever.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "120")]
    pub request_timeout_secs: u64,

    // --- Default Generation Parameters ---
    /// Initial maximum output tokens for new sessions (1-4096).
    #[arg(long, env = "DEFAULT_MAX_TOKENS", default_value = "4096")]
    pub max_tokens: u32,

    /// Initial sampling temperature for new sessions (0.00-2.00).
    #[arg(long, env = "DEFAULT_TEMPERATURE", default_value = "0.7")]
    pub temperature: f32,

    /// Initial nucleus sampling value for new sessions (0.01-1.00).
    #[arg(long, env = "DEFAULT_TOP_P", default_value = "0.95")]
    pub top_p: f32,

    /// Initial top-k value for new sessions (1-100).
    #[arg(long, env = "DEFAULT_TOP_K", default_value = "50")]
    pub top_k: u32,

    /// Initial frequency penalty for new sessions (-2.00-2.00).
    #[arg(long, env = "DEFAULT_FREQUENCY_PENALTY", default_value = "0.0", allow_hyphen_values = true)]
    pub frequency_penalty: f32,

    /// Initial presence penalty for new sessions (-2.00-2.00).
    #[arg(long, env = "DEFAULT_PRESENCE_PENALTY", default_value = "0.0", allow_hyphen_values = true)]
    pub presence_penalty: f32,

    // --- Server Args ---
    /// Host address and port for the WebSocket chat server.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Port for the HTTP server that serves the chat page and JSON API.
    #[arg(long, env = "HTTP_PORT", default_value = "8080")]
    pub http_port: u16,
}
