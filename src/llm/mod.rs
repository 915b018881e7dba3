pub mod chat;
pub mod error;
pub mod sse;

pub use self::chat::{ ChatClient, ChatRequest, EventStream, StreamEvent };
pub use self::error::ChatError;
