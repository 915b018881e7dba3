use serde::{ Serialize, Deserialize };
use std::fmt;

use crate::llm::error::ChatError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Inclusive bounds for one numeric generation parameter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ParamLimits {
    pub max_tokens: Range,
    pub temperature: Range,
    pub top_p: Range,
    pub top_k: Range,
    pub frequency_penalty: Range,
    pub presence_penalty: Range,
}

pub const PARAM_LIMITS: ParamLimits = ParamLimits {
    max_tokens: Range { min: 1.0, max: 4096.0 },
    temperature: Range { min: 0.0, max: 2.0 },
    top_p: Range { min: 0.01, max: 1.0 },
    top_k: Range { min: 1.0, max: 100.0 },
    frequency_penalty: Range { min: -2.0, max: 2.0 },
    presence_penalty: Range { min: -2.0, max: 2.0 },
};

/// Sampling knobs sent with every request. Read fresh for each turn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
            top_p: 0.95,
            top_k: 50,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

fn check(name: &'static str, value: f64, range: Range) -> Result<(), ChatError> {
    // NaN fails both comparisons, so test for containment rather than exclusion.
    if value >= range.min && value <= range.max {
        Ok(())
    } else {
        Err(ChatError::InvalidParameter {
            name,
            value,
            min: range.min,
            max: range.max,
        })
    }
}

impl GenerationParams {
    pub fn validate(&self) -> Result<(), ChatError> {
        let limits = &PARAM_LIMITS;
        check("max_tokens", self.max_tokens as f64, limits.max_tokens)?;
        check("temperature", self.temperature as f64, limits.temperature)?;
        check("top_p", self.top_p as f64, limits.top_p)?;
        check("top_k", self.top_k as f64, limits.top_k)?;
        check("frequency_penalty", self.frequency_penalty as f64, limits.frequency_penalty)?;
        check("presence_penalty", self.presence_penalty as f64, limits.presence_penalty)?;
        Ok(())
    }
}
