use crate::llm::ChatClient;
use crate::models::chat::{ GenerationParams, ParamLimits, PARAM_LIMITS };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::get,
    Router,
    extract::State,
    response::{ Html, IntoResponse },
    Json,
};
use serde::Serialize;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error };

const INDEX_HTML: &str = include_str!("../../assets/index.html");

#[derive(Serialize)]
struct ConfigResponse {
    model: String,
    ws_port: u16,
    url_configured: bool,
    api_key_configured: bool,
    defaults: GenerationParams,
    limits: ParamLimits,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Clone)]
struct AppState {
    client: Arc<ChatClient>,
    ws_port: u16,
}

fn router(client: Arc<ChatClient>, ws_port: u16) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/api/config", get(config_handler))
        .route("/api/health", get(health_handler))
        .layer(cors)
        .with_state(AppState { client, ws_port })
}

pub async fn start_http_server(
    http_port: u16,
    client: Arc<ChatClient>,
    ws_port: u16,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = format!("0.0.0.0:{}", http_port).parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(addr).await
        .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e))?;
    info!("Starting HTTP server on: http://{}", addr);

    let app = router(client, ws_port);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            error!("HTTP server error: {}", e);
        }
    });

    Ok(())
}

async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

async fn config_handler(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.client.config();
    Json(ConfigResponse {
        model: config.model.clone(),
        ws_port: state.ws_port,
        url_configured: config.url.is_some(),
        api_key_configured: config.has_api_key,
        defaults: config.default_params,
        limits: PARAM_LIMITS,
    })
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
