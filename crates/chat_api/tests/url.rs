use chat_api::{login_url, normalize_base_url, stream_url, DEFAULT_CHAT_BASE_URL};

#[test]
fn normalize_defaults_empty_input() {
    assert_eq!(normalize_base_url(""), DEFAULT_CHAT_BASE_URL);
    assert_eq!(normalize_base_url("   "), DEFAULT_CHAT_BASE_URL);
}

#[test]
fn normalize_strips_trailing_slash() {
    assert_eq!(
        normalize_base_url("http://chat.example.com/"),
        "http://chat.example.com"
    );
}

#[test]
fn stream_url_percent_encodes_message() {
    let url = stream_url("http://127.0.0.1:8080", "hello world & more")
        .expect("stream url should build");
    assert_eq!(url.path(), "/ollama/stream");
    assert_eq!(
        url.query(),
        Some("message=hello+world+%26+more")
    );
}

#[test]
fn stream_url_round_trips_message_query() {
    let url = stream_url("http://127.0.0.1:8080", "what is 2+2?").expect("stream url");
    let message = url
        .query_pairs()
        .find(|(key, _)| key == "message")
        .map(|(_, value)| value.into_owned());
    assert_eq!(message, Some("what is 2+2?".to_string()));
}

#[test]
fn login_url_carries_credentials_as_query_params() {
    let url = login_url("http://127.0.0.1:8080", "alice", "s3cret&").expect("login url");
    assert_eq!(url.path(), "/api/auth/login");

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("username".to_string(), "alice".to_string()),
            ("password".to_string(), "s3cret&".to_string()),
        ]
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    let error = stream_url("not a url", "hi").expect_err("unparseable base must fail");
    assert!(error.to_string().contains("invalid base URL"));
}
