use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use crate::config::ChatApiConfig;
use crate::error::ChatApiError;
use crate::events::ChatStreamEvent;
use crate::headers::build_headers;
use crate::ndjson::NdjsonStreamParser;
use crate::url::stream_url;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ChatApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub fn build_request_headers(&self, token: &str) -> Result<HeaderMap, ChatApiError> {
        let headers = build_headers(token, self.config.user_agent.as_deref())?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ChatApiError::Unknown(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    ChatApiError::Unknown(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_stream_request(
        &self,
        message: &str,
        token: &str,
    ) -> Result<reqwest::RequestBuilder, ChatApiError> {
        let url = stream_url(&self.config.base_url, message)?;
        let headers = self.build_request_headers(token)?;
        Ok(self.http.get(url).headers(headers))
    }

    /// Opens one server-push connection for `message` and dispatches
    /// events as they arrive.
    ///
    /// [`ChatStreamEvent::Opened`] fires exactly once, after the
    /// handshake and before any other event. Returning `Ok` means the
    /// service closed the stream normally; any `Err` is a stream
    /// failure distinct from the application-level
    /// [`ChatStreamEvent::AuthError`].
    pub async fn stream_with_handler<F>(
        &self,
        message: &str,
        token: &str,
        cancellation: Option<&CancellationSignal>,
        mut on_event: F,
    ) -> Result<(), ChatApiError>
    where
        F: FnMut(ChatStreamEvent),
    {
        let request = self.build_stream_request(message, token)?;
        let response = await_or_cancel(request.send(), cancellation)
            .await?
            .map_err(ChatApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = await_or_cancel(response.text(), cancellation)
                .await?
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(ChatApiError::Status(status, body));
        }

        on_event(ChatStreamEvent::Opened);

        let mut bytes = response.bytes_stream();
        let mut parser = NdjsonStreamParser::default();

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            let chunk = chunk.map_err(ChatApiError::from)?;
            for event in parser.feed(&chunk)? {
                on_event(event);
            }
        }

        if let Some(trailing) = parser.finish()? {
            on_event(trailing);
        }

        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        Ok(())
    }

    /// Collects the full event sequence of one stream.
    pub async fn stream(
        &self,
        message: &str,
        token: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Vec<ChatStreamEvent>, ChatApiError> {
        let mut events = Vec::new();
        self.stream_with_handler(message, token, cancellation, |event| {
            events.push(event);
        })
        .await?;

        Ok(events)
    }
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ChatApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
