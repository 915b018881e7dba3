pub mod openai;

use futures::{ Future, Stream, StreamExt };
use log::{ debug, info, warn };
use reqwest::Client as HttpClient;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::error::ChatError;
use super::sse::{ parse_line, LineDecoder, StreamLine };
use crate::config::ChatConfig;
use crate::models::chat::{ GenerationParams, Message };

pub use self::openai::{ build_messages, build_payload, ChatRequest };

/// One step of a streamed reply. A stream ends with exactly one `Done` or `Failed`.
#[derive(Debug)]
pub enum StreamEvent {
    /// Everything received so far, not just the newest piece.
    Fragment(String),
    Done(String),
    Failed(ChatError),
}

pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

#[derive(Clone)]
pub struct ChatClient {
    http: HttpClient,
    config: Arc<ChatConfig>,
}

impl ChatClient {
    pub fn new(config: Arc<ChatConfig>) -> Result<Self, ChatError> {
        let mut builder = HttpClient::builder().default_headers(config.headers.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn request(&self, messages: Vec<Message>, params: &GenerationParams) -> ChatRequest {
        build_payload(&self.config.model, messages, params)
    }

    /// Starts the request in the background and returns its events as they arrive.
    pub fn stream_chat(&self, request: ChatRequest) -> EventStream {
        let (tx, rx) = mpsc::channel(32);
        let http = self.http.clone();
        let config = Arc::clone(&self.config);

        tokio::spawn(async move {
            let terminal = match run_stream(&http, &config, &request, &tx).await {
                Ok(text) => StreamEvent::Done(text),
                Err(e) => StreamEvent::Failed(e),
            };
            let _ = tx.send(terminal).await;
        });

        Box::pin(ReceiverStream::new(rx))
    }
}

async fn with_deadline<F: Future>(deadline: Option<Duration>, fut: F) -> Result<F::Output, ChatError> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| ChatError::Timeout(limit)),
        None => Ok(fut.await),
    }
}

async fn run_stream(
    http: &HttpClient,
    config: &ChatConfig,
    request: &ChatRequest,
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<String, ChatError> {
    let url = config.url
        .clone()
        .ok_or_else(|| ChatError::Config("URL is not set".to_string()))?;
    let deadline = config.request_timeout;

    let resp = with_deadline(deadline, http.post(url).json(request).send()).await??;

    let status = resp.status();
    if !status.is_success() {
        let body = with_deadline(deadline, resp.text()).await??;
        warn!("Upstream returned {}: {}", status, body);
        return Err(ChatError::Status { status: status.as_u16(), body });
    }

    let mut body = resp.bytes_stream();
    let mut decoder = LineDecoder::new();
    let mut text = String::new();

    loop {
        match with_deadline(deadline, body.next()).await? {
            Some(chunk) => {
                let lines = decoder.push(&chunk?)?;
                if consume_lines(&lines, &mut text, tx).await? {
                    break;
                }
            }
            None => {
                let tail: Vec<String> = decoder.finish()?.into_iter().collect();
                consume_lines(&tail, &mut text, tx).await?;
                break;
            }
        }
    }

    info!("Stream finished with {} characters", text.chars().count());
    Ok(text)
}

/// Applies decoded lines to the buffer. Returns `true` once the stream should stop.
async fn consume_lines(
    lines: &[String],
    text: &mut String,
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<bool, ChatError> {
    for line in lines {
        if line.is_empty() {
            continue;
        }
        debug!("stream line: {}", line);

        match parse_line(line)? {
            StreamLine::Done => return Ok(true),
            StreamLine::Delta(Some(fragment)) => {
                text.push_str(&fragment);
                if tx.send(StreamEvent::Fragment(text.clone())).await.is_err() {
                    // receiver dropped
                    return Ok(true);
                }
            }
            StreamLine::Delta(None) | StreamLine::Ignored => {}
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{ AsyncReadExt, AsyncWriteExt };
    use tokio::net::TcpListener;
    use url::Url;
    use wiremock::matchers::{ body_partial_json, header, method, path };
    use wiremock::{ Mock, MockServer, ResponseTemplate };

    fn sse_body(deltas: &[&str]) -> String {
        let mut body = String::new();
        for delta in deltas {
            let chunk = serde_json::json!({"choices": [{"delta": {"content": delta}}]});
            body.push_str(&format!("data: {}\n\n", chunk));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    fn client_for(server: &MockServer, timeout: Option<Duration>) -> ChatClient {
        let url = Url::parse(&format!("{}/v1/chat/completions", server.uri())).unwrap();
        let config = ChatConfig::new(Some(url), Some("test-key"), "test-model")
            .unwrap()
            .with_timeout(timeout);
        ChatClient::new(Arc::new(config)).unwrap()
    }

    async fn collect(mut events: EventStream) -> Vec<StreamEvent> {
        let mut out = Vec::new();
        while let Some(event) = events.next().await {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn streams_cumulative_fragments_then_done() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(header("Accept", "application/json"))
            .and(body_partial_json(serde_json::json!({"model": "test-model", "stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/event-stream")
                    .set_body_string(sse_body(&["Hel", "lo"]))
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let request = client.request(vec![Message::user("Hi")], &GenerationParams::default());
        let events = collect(client.stream_chat(request)).await;

        let fragments: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Fragment(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(fragments, ["Hel", "Hello"]);
        assert!(matches!(events.last(), Some(StreamEvent::Done(text)) if text == "Hello"));
    }

    #[tokio::test]
    async fn lines_after_done_are_not_read() {
        let server = MockServer::start().await;
        let mut body = sse_body(&["A"]);
        body.push_str("data: {\"choices\":[{\"delta\":{\"content\":\"B\"}}]}\n\n");
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let request = client.request(vec![Message::user("Hi")], &GenerationParams::default());
        let events = collect(client.stream_chat(request)).await;

        assert!(matches!(events.last(), Some(StreamEvent::Done(text)) if text == "A"));
    }

    #[tokio::test]
    async fn body_without_sentinel_still_completes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("data: {\"choices\":[{\"delta\":{\"content\":\"end\"}}]}")
            )
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let request = client.request(vec![Message::user("Hi")], &GenerationParams::default());
        let events = collect(client.stream_chat(request)).await;

        assert!(matches!(events.last(), Some(StreamEvent::Done(text)) if text == "end"));
    }

    #[tokio::test]
    async fn non_success_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string(r#"{"error":"rate limited"}"#))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let request = client.request(vec![Message::user("Hi")], &GenerationParams::default());
        let events = collect(client.stream_chat(request)).await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Failed(ChatError::Status { status, body }) => {
                assert_eq!(*status, 429);
                assert_eq!(body, r#"{"error":"rate limited"}"#);
            }
            other => panic!("expected status failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_increment_fails_the_stream() {
        let server = MockServer::start().await;
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n\ndata: {oops\n\n";
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let request = client.request(vec![Message::user("Hi")], &GenerationParams::default());
        let events = collect(client.stream_chat(request)).await;

        assert!(matches!(events.first(), Some(StreamEvent::Fragment(text)) if text == "par"));
        assert!(matches!(events.last(), Some(StreamEvent::Failed(ChatError::Json(_)))));
    }

    #[tokio::test]
    async fn stalled_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(sse_body(&["late"]))
                    .set_delay(Duration::from_secs(5))
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Some(Duration::from_millis(200)));
        let request = client.request(vec![Message::user("Hi")], &GenerationParams::default());
        let events = collect(client.stream_chat(request)).await;

        assert!(matches!(events.as_slice(), [StreamEvent::Failed(ChatError::Timeout(_))]));
    }

    #[tokio::test]
    async fn stall_between_body_reads_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 8192];
            let _ = socket.read(&mut request).await.unwrap();

            let chunk = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"cho";
            let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\n\r\n";
            let response = format!("{}{:x}\r\n{}\r\n", head, chunk.len(), chunk);
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();

            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let url = Url::parse(&format!("http://{}/v1/chat/completions", addr)).unwrap();
        let config = ChatConfig::new(Some(url), Some("test-key"), "test-model")
            .unwrap()
            .with_timeout(Some(Duration::from_millis(300)));
        let client = ChatClient::new(Arc::new(config)).unwrap();
        let request = client.request(vec![Message::user("Hi")], &GenerationParams::default());
        let events = collect(client.stream_chat(request)).await;

        assert!(matches!(
            events.as_slice(),
            [StreamEvent::Fragment(text), StreamEvent::Failed(ChatError::Timeout(_))] if text == "Hel"
        ));
    }

    #[tokio::test]
    async fn missing_url_is_a_config_error() {
        let config = ChatConfig::new(None, Some("k"), "m").unwrap();
        let client = ChatClient::new(Arc::new(config)).unwrap();
        let request = client.request(vec![Message::user("Hi")], &GenerationParams::default());
        let events = collect(client.stream_chat(request)).await;

        assert!(matches!(events.as_slice(), [StreamEvent::Failed(ChatError::Config(_))]));
    }
}
