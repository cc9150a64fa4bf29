use serde::{Deserialize, Serialize};

/// Stream event dispatched to the session in arrival order.
///
/// `Opened` is synthesized by the client once the transport handshake
/// succeeds and always precedes any `Content`/`AuthError` event.
/// `Content` fragments are concatenated by the caller in receipt order
/// to assemble the full assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    Opened,
    Content { text: String },
    AuthError { message: String },
}

impl ChatStreamEvent {
    /// True when the service has rejected the credential mid-stream.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthError { .. })
    }
}
