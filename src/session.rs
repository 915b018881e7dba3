use async_trait::async_trait;
use futures::StreamExt;
use log::{ debug, error, info, warn };
use uuid::Uuid;

use crate::history::{ format_history_for_log, ConversationStore };
use crate::llm::chat::build_messages;
use crate::llm::{ ChatClient, ChatError, StreamEvent };
use crate::models::chat::{ GenerationParams, Message };

/// What the chat page can be asked to do while a turn runs.
#[async_trait]
pub trait Presenter: Send {
    async fn show_message(&mut self, message: &Message);

    /// Replaces the in-progress assistant text with `content`.
    async fn update_partial(&mut self, content: &str);

    async fn warn(&mut self, message: &str);

    async fn error(&mut self, message: &str);

    async fn render_conversation(&mut self, messages: &[Message]);
}

/// Conversation state for one connected client.
pub struct ChatSession {
    id: String,
    store: ConversationStore,
    params: GenerationParams,
    system_prompt: Option<String>,
}

impl ChatSession {
    pub fn new(params: GenerationParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            store: ConversationStore::new(),
            params,
            system_prompt: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn set_params(&mut self, params: GenerationParams) -> Result<(), ChatError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn set_system_prompt(&mut self, prompt: Option<String>) {
        self.system_prompt = prompt.filter(|p| !p.is_empty());
    }

    pub fn conversation(&self) -> Vec<Message> {
        self.store.snapshot()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub async fn clear<P: Presenter + ?Sized>(&mut self, presenter: &mut P) {
        self.store.clear();
        info!("Session {} cleared", self.id);
        presenter.render_conversation(&[]).await;
    }

    /// Runs one chat turn.
    ///
    /// The user message is stored and shown before the request is sent. The
    /// assistant reply is stored only when the stream completes; on any failure
    /// the partial text is dropped and the failure is reported to `presenter`.
    pub async fn submit<P: Presenter + ?Sized>(
        &mut self,
        client: &ChatClient,
        query: &str,
        presenter: &mut P
    ) -> Result<Message, ChatError> {
        let user = Message::user(query);
        self.store.append(user.clone())?;
        presenter.show_message(&user).await;

        let messages = build_messages(self.system_prompt.as_deref(), &self.store.snapshot());
        let request = client.request(messages, &self.params);
        let mut events = client.stream_chat(request);

        while let Some(event) = events.next().await {
            match event {
                StreamEvent::Fragment(text) => presenter.update_partial(&text).await,
                StreamEvent::Done(text) => {
                    let reply = Message::assistant(text);
                    self.store.append(reply.clone())?;
                    info!("Session {} completed turn ({} messages stored)", self.id, self.store.len());
                    debug!("Session {} conversation:\n{}", self.id, format_history_for_log(&self.store.snapshot()));
                    presenter.render_conversation(&self.store.snapshot()).await;
                    return Ok(reply);
                }
                StreamEvent::Failed(e) => {
                    report_failure(&self.id, &e, presenter).await;
                    return Err(e);
                }
            }
        }

        let e = ChatError::Interrupted;
        report_failure(&self.id, &e, presenter).await;
        Err(e)
    }
}

async fn report_failure<P: Presenter + ?Sized>(session_id: &str, e: &ChatError, presenter: &mut P) {
    if e.is_warning() {
        warn!("Session {} turn rejected upstream: {}", session_id, e);
        presenter.warn(&e.to_string()).await;
    } else {
        error!("Session {} turn failed: {}", session_id, e);
        presenter.error(&format!("Response Error: {}", e)).await;
    }
}
