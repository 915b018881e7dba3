use serde::Serialize;

use crate::models::chat::{ GenerationParams, Message };

/// Body of a streaming chat-completions request.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub stream: bool,
}

/// Prepends the system instruction, if any, to the conversation.
pub fn build_messages(system_prompt: Option<&str>, conversation: &[Message]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(conversation.len() + 1);
    if let Some(inst) = system_prompt.filter(|s| !s.is_empty()) {
        messages.push(Message::system(inst));
    }
    messages.extend_from_slice(conversation);
    messages
}

pub fn build_payload(model: &str, messages: Vec<Message>, params: &GenerationParams) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages,
        max_tokens: params.max_tokens,
        temperature: params.temperature,
        top_p: params.top_p,
        top_k: params.top_k,
        frequency_penalty: params.frequency_penalty,
        presence_penalty: params.presence_penalty,
        stream: true,
    }
}
