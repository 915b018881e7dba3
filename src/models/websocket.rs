use serde::{ Serialize, Deserialize };

use super::chat::{ GenerationParams, Message, Role };

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "chat")] Chat {
        content: String,
        #[serde(default)]
        system_prompt: Option<String>,
        #[serde(default)]
        params: Option<GenerationParams>,
    },
    #[serde(rename = "clear")]
    Clear,
    #[serde(rename = "history")]
    History,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "message")] Message {
        role: Role,
        content: String,
    },
    #[serde(rename = "partial")] Partial {
        content: String,
    },
    #[serde(rename = "conversation")] Conversation {
        messages: Vec<Message>,
        timestamp: i64,
    },
    #[serde(rename = "warning")] Warning {
        message: String,
    },
    #[serde(rename = "error")] Error {
        message: String,
    },
    #[serde(rename = "processing")]
    Processing,
}
