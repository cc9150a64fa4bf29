use serde::{Deserialize, Serialize};

/// Persisted credential record.
///
/// The bearer token is the only client state that survives a reload.
/// The token value is opaque; validity is decided by the service, never
/// checked locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialRecord {
    pub token: String,
    pub saved_at: String,
}

impl CredentialRecord {
    #[must_use]
    pub fn new(token: impl Into<String>, saved_at: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            saved_at: saved_at.into(),
        }
    }
}
