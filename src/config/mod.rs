pub mod headers;

use log::{ info, warn };
use reqwest::header::HeaderMap;
use std::time::Duration;
use url::Url;

use crate::cli::Args;
use crate::llm::error::ChatError;
use crate::models::chat::GenerationParams;
use self::headers::build_headers;

/// Upstream settings, built once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub url: Option<Url>,
    pub model: String,
    pub has_api_key: bool,
    pub headers: HeaderMap,
    pub request_timeout: Option<Duration>,
    pub default_params: GenerationParams,
}

impl ChatConfig {
    pub fn new(url: Option<Url>, api_key: Option<&str>, model: impl Into<String>) -> Result<Self, ChatError> {
        Ok(Self {
            url,
            model: model.into(),
            has_api_key: api_key.is_some(),
            headers: build_headers(api_key)?,
            request_timeout: None,
            default_params: GenerationParams::default(),
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_default_params(mut self, params: GenerationParams) -> Result<Self, ChatError> {
        params.validate()?;
        self.default_params = params;
        Ok(self)
    }

    /// A missing key or URL only warns here; the first chat turn reports it.
    pub fn from_args(args: &Args) -> Result<Self, ChatError> {
        let api_key = args.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty());
        if api_key.is_none() {
            warn!("API_KEY is not set. Requests will be sent without an Authorization header.");
        }

        let url = match args.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(raw) => Some(
                Url::parse(raw).map_err(|e| ChatError::Config(format!("Invalid URL '{}': {}", raw, e)))?
            ),
            None => {
                warn!("URL is not set. Chat turns will fail until it is configured.");
                None
            }
        };

        let timeout = match args.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let params = GenerationParams {
            max_tokens: args.max_tokens,
            temperature: args.temperature,
            top_p: args.top_p,
            top_k: args.top_k,
            frequency_penalty: args.frequency_penalty,
            presence_penalty: args.presence_penalty,
        };

        let config = Self::new(url, api_key, args.model.clone())?
            .with_timeout(timeout)
            .with_default_params(params)?;

        info!(
            "Chat endpoint configured: Model={}, URL={}, Timeout={:?}",
            config.model,
            config.url.as_ref().map(Url::as_str).unwrap_or("unset"),
            config.request_timeout
        );
        Ok(config)
    }
}
