use std::collections::BTreeMap;

use crate::error::ChatApiError;

pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Media type of the inbound stream: newline-delimited JSON payloads.
pub const STREAM_ACCEPT: &str = "application/x-ndjson";

/// Build a deterministic header map for a stream request.
///
/// The bearer token must be non-empty: the service treats a missing
/// credential as an auth failure mid-stream, so refusing to connect
/// here keeps that failure synchronous and local.
pub fn build_headers(
    token: &str,
    user_agent: Option<&str>,
) -> Result<BTreeMap<String, String>, ChatApiError> {
    if token.trim().is_empty() {
        return Err(ChatApiError::MissingBearerToken);
    }

    let mut headers = BTreeMap::new();
    headers.insert(
        HEADER_AUTHORIZATION.to_owned(),
        format!("Bearer {}", token.trim()),
    );
    headers.insert(HEADER_ACCEPT.to_owned(), STREAM_ACCEPT.to_owned());

    if let Some(user_agent) = user_agent {
        if !user_agent.trim().is_empty() {
            headers.insert(HEADER_USER_AGENT.to_owned(), user_agent.trim().to_owned());
        }
    }

    Ok(headers)
}
