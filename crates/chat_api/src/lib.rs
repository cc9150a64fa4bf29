//! Transport-only streaming chat client primitives.
//!
//! This crate owns connection building, header construction, and
//! newline-delimited JSON stream parsing for the chat endpoints. It
//! holds no session state: transcript assembly, busy tracking, and the
//! auth-failure recovery protocol live with the caller.
//!
//! The wire contract guarantees exactly two inbound payload shapes:
//! `{"error": "..."}` and `{"result":{"output":{"content":"..."}}}`.
//! Anything else is surfaced as [`ChatApiError::MalformedPayload`]
//! rather than silently dropped, so protocol drift is diagnosable.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod ndjson;
pub mod url;

pub use client::{CancellationSignal, ChatApiClient};
pub use config::ChatApiConfig;
pub use error::ChatApiError;
pub use events::ChatStreamEvent;
pub use ndjson::NdjsonStreamParser;
pub use url::{login_url, normalize_base_url, stream_url, DEFAULT_CHAT_BASE_URL};
