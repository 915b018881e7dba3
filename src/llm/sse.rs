//! Decoding of `text/event-stream` style chat-completion bodies.
//!
//! The body arrives as arbitrary byte chunks. [`LineDecoder`] reassembles them
//! into whole lines and [`parse_line`] turns each line into a [`StreamLine`].

use serde::Deserialize;

use super::error::ChatError;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Deserialize, Debug)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize, Debug)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize, Debug)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum StreamLine {
    /// `data: [DONE]`; nothing after it is read.
    Done,
    /// A parsed increment. `None` when the first choice carried no content.
    Delta(Option<String>),
    /// Empty lines, comments, `event:`/`id:` fields and increments with no choices.
    Ignored,
}

pub fn parse_line(line: &str) -> Result<StreamLine, ChatError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(StreamLine::Ignored);
    }

    let payload = match line.strip_prefix(DATA_PREFIX) {
        Some(rest) => rest.trim(),
        None => return Ok(StreamLine::Ignored),
    };

    if payload == DONE_SENTINEL {
        return Ok(StreamLine::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(payload)?;
    match chunk.choices.into_iter().next() {
        Some(choice) => Ok(StreamLine::Delta(choice.delta.content)),
        None => Ok(StreamLine::Ignored),
    }
}

/// Splits a chunked byte stream on `\n`, independent of where the chunks end.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one transport chunk and returns every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, ChatError> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            lines.push(decode_line(&raw[..newline_pos])?);
        }
        Ok(lines)
    }

    /// Returns the trailing line of a body that did not end with a newline.
    pub fn finish(&mut self) -> Result<Option<String>, ChatError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let raw = std::mem::take(&mut self.buffer);
        decode_line(&raw).map(Some)
    }
}

fn decode_line(raw: &[u8]) -> Result<String, ChatError> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8(raw.to_vec()).map_err(|e| ChatError::Decode(e.to_string()))
}
