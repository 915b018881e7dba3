use crate::llm::error::ChatError;
use crate::models::chat::{ Message, Role };

/// In-memory conversation for one session. Grows only at the end; `clear`
/// is the only way to remove messages.
#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// System instructions travel with each request and are never stored.
    pub fn append(&mut self, message: Message) -> Result<(), ChatError> {
        if message.role == Role::System {
            return Err(ChatError::InvalidMessage(
                "system messages are passed per request, not stored".to_string()
            ));
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub fn format_history_for_log(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|msg| format!("{}: {}", msg.role, msg.content))
        .collect::<Vec<_>>()
        .join("\n")
}
