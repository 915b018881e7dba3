use reqwest::header::{ HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE };

use crate::llm::error::ChatError;

/// Static headers sent with every chat-completion request.
///
/// Without a key the `Authorization` header is left out and the upstream
/// rejects the call, which surfaces as a status warning on the first turn.
pub fn build_headers(api_key: Option<&str>) -> Result<HeaderMap, ChatError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(key) = api_key {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|e| ChatError::Config(format!("Invalid API key format: {}", e)))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}
