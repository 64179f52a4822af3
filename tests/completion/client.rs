use std::time::Duration;

use flipflop::{
    alignment::CompletionErrorKind,
    completion::{
        ChatClient, CredentialRef,
        client::map_http_error,
        types::{ChatMessage, ChatRequest},
    },
};

use crate::fixture::{CannedResponse, MockChatServer, completion_config};

fn request(max_output_tokens: Option<u64>) -> ChatRequest {
    ChatRequest {
        model: "m1".to_string(),
        messages: vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("short: Explain memory"),
        ],
        max_output_tokens,
    }
}

#[tokio::test]
async fn chat_posts_openai_payload_and_parses_reply() {
    let server = MockChatServer::with_queue(vec![CannedResponse::reply("  transient trace  ")]).await;
    let mut config = completion_config(server.endpoint());
    config.credential = CredentialRef::InlineToken {
        token: "sk-fixture".to_string(),
    };
    let client = ChatClient::new(&config).expect("client should build");

    let reply = client
        .chat(request(Some(64)))
        .await
        .expect("chat should succeed");

    assert_eq!(reply.text, "transient trace");
    let usage = reply.usage.expect("usage should be parsed");
    assert_eq!(usage.input_tokens, Some(11));
    assert_eq!(usage.output_tokens, Some(7));
    assert_eq!(usage.total_tokens, Some(18));

    let recorded = server.requests();
    assert_eq!(recorded.len(), 1);
    let sent = &recorded[0];
    assert_eq!(sent.path, "/v1/chat/completions");
    assert_eq!(sent.header("authorization"), Some("Bearer sk-fixture"));
    assert_eq!(sent.header("x-request-id"), Some(reply.request_id.as_str()));
    assert_eq!(sent.body["model"], "m1");
    assert_eq!(sent.body["max_tokens"], 64);
    assert_eq!(
        sent.messages(),
        vec![
            ("system".to_string(), "be brief".to_string()),
            ("user".to_string(), "short: Explain memory".to_string()),
        ]
    );
}

#[tokio::test]
async fn chat_omits_optional_fields_when_unset() {
    let server = MockChatServer::with_queue(vec![CannedResponse::reply("ok")]).await;
    let client = ChatClient::new(&completion_config(server.endpoint())).expect("client");

    client.chat(request(None)).await.expect("chat should succeed");

    let sent = &server.requests()[0];
    assert!(sent.header("authorization").is_none());
    assert!(sent.body.get("max_tokens").is_none());
}

#[tokio::test]
async fn rate_limit_carries_reset_header_hint() {
    let server = MockChatServer::with_queue(vec![
        CannedResponse::status(429, r#"{"error":{"message":"slow down"}}"#)
            .with_header("x-ratelimit-reset-tokens", "0.2s"),
    ])
    .await;
    let client = ChatClient::new(&completion_config(server.endpoint())).expect("client");

    let err = client
        .chat(request(None))
        .await
        .expect_err("429 should fail");

    assert_eq!(err.kind, CompletionErrorKind::RateLimited);
    assert!(err.retryable);
    assert_eq!(err.http_status, Some(429));
    assert_eq!(err.retry_after, Some(Duration::from_millis(200)));
    assert!(err.message.contains("slow down"), "{}", err.message);
}

#[tokio::test]
async fn oversized_request_is_reported_as_context_overflow() {
    let server = MockChatServer::with_queue(vec![CannedResponse::status(
        429,
        r#"{"error":{"message":"Request too large for o3 on tokens per min"}}"#,
    )])
    .await;
    let client = ChatClient::new(&completion_config(server.endpoint())).expect("client");

    let err = client
        .chat(request(None))
        .await
        .expect_err("oversized request should fail");

    assert_eq!(err.kind, CompletionErrorKind::ContextOverflow);
    assert!(!err.retryable);
}

#[tokio::test]
async fn server_error_is_transient() {
    let server =
        MockChatServer::with_queue(vec![CannedResponse::status(502, "bad gateway")]).await;
    let client = ChatClient::new(&completion_config(server.endpoint())).expect("client");

    let err = client
        .chat(request(None))
        .await
        .expect_err("502 should fail");

    assert_eq!(err.kind, CompletionErrorKind::BackendTransient);
    assert!(err.retryable);
    assert_eq!(err.http_status, Some(502));
}

#[tokio::test]
async fn reply_without_choices_is_a_protocol_violation() {
    let server =
        MockChatServer::with_queue(vec![CannedResponse::status(200, r#"{"choices":[]}"#)]).await;
    let client = ChatClient::new(&completion_config(server.endpoint())).expect("client");

    let err = client
        .chat(request(None))
        .await
        .expect_err("empty choices should fail");

    assert_eq!(err.kind, CompletionErrorKind::ProtocolViolation);
    assert!(!err.retryable);
}

#[test]
fn client_requires_endpoint() {
    let err = match ChatClient::new(&completion_config("  ")) {
        Ok(_) => panic!("missing endpoint should fail"),
        Err(err) => err,
    };
    assert_eq!(err.kind, CompletionErrorKind::InvalidRequest);
}

#[test]
fn client_rejects_missing_env_credential() {
    let mut config = completion_config("http://127.0.0.1:9/v1");
    config.credential = CredentialRef::Env {
        var: "FLIPFLOP_FIXTURE_KEY_THAT_IS_NEVER_SET".to_string(),
    };
    let err = match ChatClient::new(&config) {
        Ok(_) => panic!("missing credential should fail"),
        Err(err) => err,
    };
    assert_eq!(err.kind, CompletionErrorKind::Authentication);
    assert!(!err.retryable);
}

#[test]
fn status_mapping_follows_http_semantics() {
    assert_eq!(
        map_http_error(401, "", None).kind,
        CompletionErrorKind::Authentication
    );
    assert_eq!(
        map_http_error(403, "", None).kind,
        CompletionErrorKind::Authorization
    );
    assert_eq!(
        map_http_error(408, "", None).kind,
        CompletionErrorKind::RateLimited
    );
    assert_eq!(
        map_http_error(404, "", None).kind,
        CompletionErrorKind::InvalidRequest
    );

    let hinted = map_http_error(429, "Please try again in 120ms.", None);
    assert_eq!(hinted.retry_after, Some(Duration::from_millis(120)));

    let long_body = "x".repeat(1_000);
    let truncated = map_http_error(500, &long_body, None);
    assert_eq!(
        truncated.message.len(),
        "backend returned status 500: ".len() + 240
    );
}
