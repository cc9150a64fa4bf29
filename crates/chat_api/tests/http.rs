use chat_api::{ChatApiClient, ChatApiConfig, ChatApiError, ChatStreamEvent};

#[test]
fn stream_request_targets_stream_endpoint_with_auth_header() {
    let client =
        ChatApiClient::new(ChatApiConfig::new("http://127.0.0.1:8080")).expect("client");
    let request = client
        .build_stream_request("hello world", "opaque-token")
        .expect("build request")
        .build()
        .expect("request");

    assert_eq!(request.method(), "GET");
    assert_eq!(request.url().path(), "/ollama/stream");
    assert_eq!(request.url().query(), Some("message=hello+world"));
    assert_eq!(
        request
            .headers()
            .get("authorization")
            .and_then(|value| value.to_str().ok()),
        Some("Bearer opaque-token")
    );
}

#[test]
fn stream_request_with_empty_token_fails_locally() {
    let client =
        ChatApiClient::new(ChatApiConfig::new("http://127.0.0.1:8080")).expect("client");
    let error = client
        .build_stream_request("hello", "")
        .expect_err("empty token must not produce a request");
    assert!(matches!(error, ChatApiError::MissingBearerToken));
}

#[test]
fn stream_event_wire_names_are_stable() {
    let content = ChatStreamEvent::Content {
        text: "fragment".to_string(),
    };
    let content_json = serde_json::to_value(&content).expect("serialize content event");
    assert_eq!(content_json["type"], "content");
    assert_eq!(content_json["text"], "fragment");

    let auth_error = ChatStreamEvent::AuthError {
        message: "token expired".to_string(),
    };
    let auth_json = serde_json::to_value(&auth_error).expect("serialize auth error event");
    assert_eq!(auth_json["type"], "auth_error");
    assert_eq!(auth_json["message"], "token expired");
}

#[test]
fn stream_failure_classification_excludes_auth_and_cancel() {
    assert!(ChatApiError::MalformedPayload("{}".to_string()).is_stream_failure());
    assert!(!ChatApiError::Cancelled.is_stream_failure());
    assert!(!ChatApiError::MissingBearerToken.is_stream_failure());

    let invalid = ChatApiError::InvalidCredentials(reqwest::StatusCode::UNAUTHORIZED);
    assert!(invalid.is_invalid_credentials());
    assert!(!invalid.is_stream_failure());
}
