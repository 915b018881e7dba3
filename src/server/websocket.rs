use crate::llm::ChatClient;
use crate::models::chat::Message as ChatMessage;
use crate::models::websocket::{ ClientMessage, ServerMessage };
use crate::session::{ ChatSession, Presenter };

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::SplitSink;
use futures::{ SinkExt, StreamExt };
use log::{ info, warn, error };
use tokio::io::{ AsyncRead, AsyncWrite };
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{ accept_async, WebSocketStream };

const MAX_MESSAGE_SIZE: usize = 1 * 1024 * 1024;

type WsSink<S> = SplitSink<WebSocketStream<S>, Message>;

/// Forwards session output to one browser socket as JSON frames.
struct SocketPresenter<'a, S> {
    peer: SocketAddr,
    sink: &'a mut WsSink<S>,
}

impl<'a, S> SocketPresenter<'a, S>
    where S: AsyncRead + AsyncWrite + Unpin + Send
{
    async fn send(&mut self, msg: ServerMessage) -> bool {
        send_server_message(&mut *self.sink, self.peer, &msg).await
    }
}

#[async_trait]
impl<'a, S> Presenter for SocketPresenter<'a, S>
    where S: AsyncRead + AsyncWrite + Unpin + Send
{
    async fn show_message(&mut self, message: &ChatMessage) {
        self.send(ServerMessage::Message {
            role: message.role,
            content: message.content.clone(),
        }).await;
    }

    async fn update_partial(&mut self, content: &str) {
        self.send(ServerMessage::Partial { content: content.to_string() }).await;
    }

    async fn warn(&mut self, message: &str) {
        self.send(ServerMessage::Warning { message: message.to_string() }).await;
    }

    async fn error(&mut self, message: &str) {
        self.send(ServerMessage::Error { message: message.to_string() }).await;
    }

    async fn render_conversation(&mut self, messages: &[ChatMessage]) {
        self.send(ServerMessage::Conversation {
            messages: messages.to_vec(),
            timestamp: Utc::now().timestamp(),
        }).await;
    }
}

async fn send_server_message<S>(sink: &mut WsSink<S>, peer: SocketAddr, msg: &ServerMessage) -> bool
    where S: AsyncRead + AsyncWrite + Unpin
{
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize message for {}: {}", peer, e);
            return false;
        }
    };
    match sink.send(Message::Text(json)).await {
        Ok(()) => true,
        Err(e) => {
            error!("Error sending message to {}: {}", peer, e);
            false
        }
    }
}

pub async fn start_ws_server(
    addr: SocketAddr,
    client: Arc<ChatClient>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!("WS server listening on: {}", addr);
    serve(listener, client).await
}

async fn serve(listener: TcpListener, client: Arc<ChatClient>) -> Result<(), Box<dyn Error + Send + Sync>> {
    loop {
        let (stream, peer) = listener.accept().await?;
        info!("Incoming connection from: {}", peer);
        let client_clone = Arc::clone(&client);

        tokio::spawn(async move {
            match accept_async(stream).await {
                Ok(ws) => handle_connection(peer, ws, client_clone).await,
                Err(e) => error!("Handshake failed for {}: {}", peer, e),
            }
        });
    }
}

/// Serves one browser tab. The session lives exactly as long as the socket,
/// and each frame is handled to completion before the next is read.
pub async fn handle_connection<S>(
    peer: SocketAddr,
    websocket: WebSocketStream<S>,
    client: Arc<ChatClient>
)
    where S: AsyncRead + AsyncWrite + Unpin + Send
{
    let (mut tx, mut rx) = websocket.split();
    let mut session = ChatSession::new(client.config().default_params);
    info!("Assigned session ID {} to {}", session.id(), peer);

    while let Some(msg) = rx.next().await {
        match msg {
            Ok(message) => {
                if message.len() > MAX_MESSAGE_SIZE {
                    warn!(
                        "Message from {} exceeds size limit ({} > {})",
                        peer,
                        message.len(),
                        MAX_MESSAGE_SIZE
                    );
                    let error_msg = ServerMessage::Error {
                        message: "Message too large".to_string(),
                    };
                    send_server_message(&mut tx, peer, &error_msg).await;
                    break;
                }

                match message {
                    Message::Text(text) => {
                        let parsed = serde_json::from_str::<ClientMessage>(&text);
                        let mut presenter = SocketPresenter { peer, sink: &mut tx };

                        match parsed {
                            Ok(ClientMessage::Chat { content, system_prompt, params }) => {
                                if let Some(params) = params {
                                    if let Err(e) = session.set_params(params) {
                                        warn!("Rejected generation parameters from {}: {}", peer, e);
                                        presenter.error(&e.to_string()).await;
                                        continue;
                                    }
                                }
                                if system_prompt.is_some() {
                                    session.set_system_prompt(system_prompt);
                                }

                                if !presenter.send(ServerMessage::Processing).await {
                                    break;
                                }

                                if let Err(e) = session.submit(&client, &content, &mut presenter).await {
                                    error!("Chat turn failed for {}: {}", peer, e);
                                }
                            }
                            Ok(ClientMessage::Clear) => {
                                session.clear(&mut presenter).await;
                            }
                            Ok(ClientMessage::History) => {
                                presenter.render_conversation(&session.conversation()).await;
                            }
                            Err(e) => {
                                error!("Failed to parse message from {}: {}", peer, e);
                                presenter.error(&format!("Failed to parse message: {}", e)).await;
                            }
                        }
                    }
                    Message::Close(_) => {
                        info!("Received close frame from {}", peer);
                        break;
                    }
                    Message::Ping(ping_data) => {
                        if tx.send(Message::Pong(ping_data)).await.is_err() {
                            error!("Failed to send pong to {}", peer);
                            break;
                        }
                    }
                    Message::Pong(_) => {}
                    Message::Binary(_) => {
                        warn!("Ignoring binary message from {}", peer);
                    }
                    Message::Frame(_) => {}
                }
            }
            Err(e) => {
                match e {
                    | tokio_tungstenite::tungstenite::Error::ConnectionClosed
                    | tokio_tungstenite::tungstenite::Error::Protocol(_)
                    | tokio_tungstenite::tungstenite::Error::Utf8 => {
                        info!("WebSocket connection closed or protocol error for {}: {}", peer, e);
                    }
                    tokio_tungstenite::tungstenite::Error::Io(ref io_err) if
                        io_err.kind() == std::io::ErrorKind::ConnectionReset
                    => {
                        info!("WebSocket connection reset by peer {}", peer);
                    }
                    _ => {
                        error!("Error receiving message from {}: {}", peer, e);
                    }
                }
                break;
            }
        }
    }
    info!("WebSocket connection closed for {} (Session ID: {})", peer, session.id());
}
