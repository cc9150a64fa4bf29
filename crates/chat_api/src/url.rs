use url::Url;

use crate::error::ChatApiError;

/// Default base URL for the chat service.
pub const DEFAULT_CHAT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Path of the streaming chat endpoint.
pub const STREAM_PATH: &str = "/ollama/stream";

/// Path of the login endpoint.
pub const LOGIN_PATH: &str = "/api/auth/login";

/// Normalize a base URL: empty input falls back to the default, and a
/// trailing slash is removed so path joining stays predictable.
#[must_use]
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_CHAT_BASE_URL
    } else {
        input.trim()
    };

    base.trim_end_matches('/').to_string()
}

/// Builds the stream endpoint URL with the message percent-encoded as
/// a query parameter.
pub fn stream_url(base_url: &str, message: &str) -> Result<Url, ChatApiError> {
    let base = normalize_base_url(base_url);
    let mut url = Url::parse(&format!("{base}{STREAM_PATH}"))
        .map_err(|error| ChatApiError::InvalidBaseUrl(format!("{base}: {error}")))?;
    url.query_pairs_mut().append_pair("message", message);
    Ok(url)
}

/// Builds the login endpoint URL with credentials as query parameters.
pub fn login_url(base_url: &str, username: &str, password: &str) -> Result<Url, ChatApiError> {
    let base = normalize_base_url(base_url);
    let mut url = Url::parse(&format!("{base}{LOGIN_PATH}"))
        .map_err(|error| ChatApiError::InvalidBaseUrl(format!("{base}: {error}")))?;
    url.query_pairs_mut()
        .append_pair("username", username)
        .append_pair("password", password);
    Ok(url)
}
